use thiserror::Error;

use crate::config::schema::TypeTag;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration store is already initialized in this process")]
    AlreadyInitialized,

    #[error("unknown configuration: {0}")]
    UnknownConfigKey(String),

    #[error("type mismatch for {key}: expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: TypeTag,
        actual: TypeTag,
    },

    #[error("unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error("invalid pattern '/{pattern}/': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown signal: {0}")]
    InvalidSignal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("signal handling failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
