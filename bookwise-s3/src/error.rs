//! Object store error types.

use thiserror::Error;

/// Result type for object store operations.
pub type S3Result<T> = Result<T, ObjectStoreError>;

/// Errors that can occur talking to the object store.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid object store configuration: {0}")]
    Config(String),

    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("malformed listing: {0}")]
    Parse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ObjectStoreError {
    /// Returns true if the request never produced an HTTP response.
    pub fn is_network(&self) -> bool {
        matches!(self, ObjectStoreError::Network(_))
    }

    /// Returns the HTTP status for transport and not-found errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ObjectStoreError::Transport { status, .. } => Some(*status),
            ObjectStoreError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for ObjectStoreError {
    fn from(err: quick_xml::Error) -> Self {
        ObjectStoreError::Parse(err.to_string())
    }
}
