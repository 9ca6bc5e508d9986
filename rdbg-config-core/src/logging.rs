use tracing_subscriber::EnvFilter;

use crate::config::value::LogLevel;

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber installed earlier (tests, embedding hosts) stays in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn init_for_level(level: LogLevel) {
    init_tracing(level.filter_directive());
}
