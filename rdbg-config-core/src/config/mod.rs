pub mod export;
pub mod hooks;
pub mod key;
pub mod loader;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod value;

pub use export::snapshot_to_env_map;
pub use hooks::ChangeHooks;
pub use key::ConfigKey;
pub use loader::{bootstrap, merge_sources, read_env, CliOverrides, EnvSource, ProcessEnv};
pub use schema::{describe, lookup, type_of, SchemaEntry, TypeTag};
pub use snapshot::{ConfigSnapshot, LaunchMode};
pub use store::ConfigStore;
pub use value::{coerce, coerce_str, stringify, ConfigValue, LogLevel, PathElement, RawConfig, RawValue};
