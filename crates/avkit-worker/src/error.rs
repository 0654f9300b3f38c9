//! Worker error types.

use thiserror::Error;

use avkit_media::MediaError;
use avkit_models::ParamError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the error is the caller's fault rather than the system's.
    pub fn is_validation(&self) -> bool {
        matches!(self, WorkerError::InvalidJob(_) | WorkerError::Params(_))
    }
}
