//! Settings error types.

use thiserror::Error;

/// Result type for settings operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or persisting settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
