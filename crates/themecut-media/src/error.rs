use thiserror::Error;

/// Errors from the pure algorithm layer.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("clips span multiple embedding models: {0}")]
    MixedEmbeddingModels(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MediaError {
    pub fn empty_input(msg: impl Into<String>) -> Self {
        MediaError::EmptyInput(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        MediaError::InvalidConfig(msg.into())
    }
}
