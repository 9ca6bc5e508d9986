pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod session;

pub use config::{ConfigKey, ConfigSnapshot, ConfigStore, ConfigValue};
pub use error::{Error, Result};
pub use session::{DebugSession, SessionSlot};
