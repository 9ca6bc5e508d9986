use std::collections::{BTreeMap, HashMap};

use crate::config::hooks::ChangeHooks;
use crate::config::key::ConfigKey;
use crate::config::schema::entries;
use crate::config::snapshot::LaunchMode;
use crate::config::store::ConfigStore;
use crate::config::value::{RawConfig, RawValue};
use crate::error::Result;

/// Read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Raw key/value pairs and launch mode produced by the argument parser.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    values: Vec<(String, String)>,
    mode: Option<LaunchMode>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.push((key.into(), value.into()));
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn attach(mut self) -> Self {
        self.mode = Some(LaunchMode::Attach);
        self
    }

    pub fn set_mode(&mut self, mode: LaunchMode) {
        self.mode = Some(mode);
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode.unwrap_or_default()
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Raw values of every schema key whose environment variable is set.
/// An empty value still counts as set.
pub fn read_env(env: &impl EnvSource) -> RawConfig {
    entries()
        .filter_map(|entry| {
            env.var(entry.env_name)
                .map(|value| (entry.key, RawValue::Raw(value)))
        })
        .collect()
}

/// Environment first, CLI on top. Later CLI entries for the same key win.
pub fn merge_sources(env: &impl EnvSource, cli: &CliOverrides) -> Result<(RawConfig, LaunchMode)> {
    let mut merged = read_env(env);
    for (key, value) in cli.values() {
        let key = key.parse::<ConfigKey>()?;
        if let Some(previous) = merged.insert(key, RawValue::from(value)) {
            tracing::trace!(key = %key, ?previous, "command line overrides environment");
        }
    }
    Ok((merged, cli.mode()))
}

/// Builds the process's store from the environment and command line.
pub fn bootstrap(env: &impl EnvSource, cli: &CliOverrides, hooks: ChangeHooks) -> Result<ConfigStore> {
    let (initial, mode) = merge_sources(env, cli)?;
    tracing::debug!(keys = initial.len(), mode = %mode, "bootstrapping configuration");
    ConfigStore::init(initial, mode, hooks)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{merge_sources, read_env, CliOverrides};
    use crate::config::hooks::tests::Fixture;
    use crate::config::key::ConfigKey;
    use crate::config::snapshot::LaunchMode;
    use crate::config::store::ConfigStore;
    use crate::config::value::{ConfigValue, LogLevel, PathElement, RawValue};
    use crate::error::Error;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn reads_only_schema_variables() {
        let source = env(&[
            ("RUBY_DEBUG_LOG_LEVEL", "INFO"),
            ("RUBY_DEBUG_COOKIE", ""),
            ("RUBY_DEBUG_UNRELATED", "1"),
            ("PATH", "/usr/bin"),
        ]);

        let raw = read_env(&source);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.get(&ConfigKey::LogLevel), Some(&RawValue::from("INFO")));
        assert_eq!(raw.get(&ConfigKey::Cookie), Some(&RawValue::from("")));
    }

    #[test]
    fn command_line_wins_over_environment() {
        let source = env(&[
            ("RUBY_DEBUG_LOG_LEVEL", "INFO"),
            ("RUBY_DEBUG_SHOW_FRAMES", "4"),
        ]);
        let cli = CliOverrides::new().with("log_level", "ERROR");

        let (raw, mode) = merge_sources(&source, &cli).expect("merge");
        assert_eq!(raw.get(&ConfigKey::LogLevel), Some(&RawValue::from("ERROR")));
        assert_eq!(raw.get(&ConfigKey::ShowFrames), Some(&RawValue::from("4")));
        assert_eq!(mode, LaunchMode::Start);
    }

    #[test]
    fn nonstop_flag_wins_over_unset_or_false_environment() {
        for source in [env(&[]), env(&[("RUBY_DEBUG_NONSTOP", "false")])] {
            let fixture = Fixture::new();
            let cli = CliOverrides::new().with("nonstop", "1");

            let (raw, mode) = merge_sources(&source, &cli).expect("merge");
            let store = ConfigStore::build(raw, mode, fixture.hooks()).expect("store");

            assert_eq!(store.get(ConfigKey::Nonstop), Some(ConfigValue::Bool(true)));
        }
    }

    #[test]
    fn attach_flag_sets_mode() {
        let cli = CliOverrides::new().attach();
        let (raw, mode) = merge_sources(&env(&[]), &cli).expect("merge");
        assert!(raw.is_empty());
        assert_eq!(mode, LaunchMode::Attach);
    }

    #[test]
    fn unknown_command_line_key_is_rejected() {
        let cli = CliOverrides::new().with("colour", "true");
        let error = merge_sources(&env(&[]), &cli).expect_err("unknown key");
        assert!(matches!(error, Error::UnknownConfigKey(ref key) if key == "colour"));
    }

    #[test]
    fn environment_values_are_coerced_into_the_store() {
        let fixture = Fixture::new();
        let source = env(&[
            ("RUBY_DEBUG_LOG_LEVEL", "INFO"),
            ("RUBY_DEBUG_SKIP_PATH", "/vendor/:lib"),
            ("RUBY_DEBUG_NONSTOP", "T"),
        ]);
        let cli = CliOverrides::new().with("show_frames", "7");

        let (raw, mode) = merge_sources(&source, &cli).expect("merge");
        let store = ConfigStore::build(raw, mode, fixture.hooks()).expect("store");

        assert_eq!(store.get_log_level(), LogLevel::Info);
        assert!(store.get_bool(ConfigKey::Nonstop));
        assert_eq!(store.get_int(ConfigKey::ShowFrames), Some(7));
        assert_eq!(
            store.get_path(ConfigKey::SkipPath),
            vec![
                PathElement::pattern("vendor").expect("pattern"),
                PathElement::literal("lib"),
            ]
        );
    }

    #[test]
    fn invalid_environment_value_fails_bootstrap() {
        let fixture = Fixture::new();
        let source = env(&[("RUBY_DEBUG_LOG_LEVEL", "verbose")]);
        let (raw, mode) = merge_sources(&source, &CliOverrides::new()).expect("merge");

        let error = ConfigStore::build(raw, mode, fixture.hooks()).expect_err("bad level");
        assert!(matches!(error, Error::InvalidLogLevel(_)));
    }
}
