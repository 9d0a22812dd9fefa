//! Queue error types.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid job key: {0}")]
    InvalidKey(String),

    #[error("Runner error: {0}")]
    Runner(String),

    #[error("Storage error: {0}")]
    Storage(#[from] themecut_storage::StorageError),
}

impl QueueError {
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    pub fn runner(err: impl std::fmt::Display) -> Self {
        Self::Runner(err.to_string())
    }
}
