//! Caller-facing error type

use crate::backend::BackendError;
use crate::transport::TransportError;

/// Result type alias using WorkbenchError
pub type Result<T> = std::result::Result<T, WorkbenchError>;

/// Errors surfaced by workbench operations
#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    /// Bad or missing input; never retried
    #[error("{0}")]
    Validation(String),

    /// The configured protocol cannot serve this operation
    #[error("{0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Every generation attempt failed
    #[error("{0}")]
    Generation(String),
}

impl WorkbenchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
