//! Storage gateway errors.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{name} not found in object storage")]
    NotFound { name: String },

    #[error("Invalid object name: {name:?}")]
    InvalidName { name: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} cancelled by shutdown")]
    Cancelled { operation: &'static str },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
