//! Sync error types.

use bookwise_config::ConfigError;
use bookwise_s3::ObjectStoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing notes.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync configuration error: {0}")]
    Config(String),

    #[error("a sync cycle is already in progress")]
    AlreadyInProgress,

    #[error(transparent)]
    Remote(#[from] ObjectStoreError),

    #[error("malformed remote note: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("settings error: {0}")]
    Settings(#[from] ConfigError),

    #[error("local store error: {0}")]
    LocalStore(String),

    #[error("note not found: {0}")]
    NoteNotFound(String),

    #[error("{0}")]
    ConnectionTest(String),
}
