//! Error types for the object store gateway.

use thiserror::Error;

use crate::deadline::DeadlineExceeded;

/// Errors that can occur when uploading or downloading files.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// No object stored under the key
    #[error("Object '{0}' not found")]
    NotFound(String),

    /// Key, bucket or content type rejected before reaching the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The call did not finish before its deadline
    #[error("Object store call '{0}' exceeded its deadline")]
    Timeout(&'static str),

    /// Object store unreachable
    #[error("Object store connection error: {0}")]
    Connection(String),

    /// The store rejected or failed the request
    #[error("Object store request failed: {0}")]
    Request(String),
}

impl From<DeadlineExceeded> for ObjectStoreError {
    fn from(e: DeadlineExceeded) -> Self {
        Self::Timeout(e.0)
    }
}
