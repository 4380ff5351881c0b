//! Storage and archive errors.

use thiserror::Error;

/// Errors from the blob client or the archive codec.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("object store returned status {status} for {bucket}/{name}")]
    UnexpectedStatus {
        status: u16,
        bucket: String,
        name: String,
    },

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive entry '{0}' would extract outside the destination root")]
    PathEscape(String),
}

impl StorageError {
    /// Whether retrying the same operation might succeed. Path escapes and
    /// malformed archives never do; transient IO/network failures might.
    pub fn retryable(&self) -> bool {
        !matches!(self, StorageError::PathEscape(_) | StorageError::Zip(_))
    }
}
