pub mod alloc_trace;
#[cfg(unix)]
pub mod sigdump;

pub use alloc_trace::{record_site, AllocationSiteTracing, AllocationTracer};
#[cfg(unix)]
pub use sigdump::{
    parse_signal, parse_signal_setting, NixSignalTrap, SignalTrap, Sigdump, TrapToken,
};
