//! Pipeline error types.

use thiserror::Error;

use themecut_queue::QueueError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by stage runs and pipeline submission.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error(transparent)]
    Media(#[from] themecut_media::MediaError),

    #[error(transparent)]
    Storage(#[from] themecut_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }
}

impl From<QueueError> for PipelineError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::InvalidKey(msg) => Self::InvalidInput(msg),
            QueueError::Runner(msg) => Self::ExecutionFailed(msg),
            QueueError::Storage(e) => Self::Storage(e),
        }
    }
}
