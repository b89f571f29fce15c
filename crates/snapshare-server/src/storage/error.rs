//! Storage errors.

use thiserror::Error;

/// Errors from asset storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Name is not a plain file name
    #[error("invalid asset name: {0:?}")]
    InvalidName(String),

    /// An asset with this name already exists
    #[error("asset already exists: {0}")]
    AlreadyExists(String),

    /// Backend I/O failure
    #[error("storage I/O error: {0}")]
    Io(String),
}
