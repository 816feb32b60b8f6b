//! Storage error types.

use thiserror::Error;

/// Errors from a [`Store`](super::Store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
