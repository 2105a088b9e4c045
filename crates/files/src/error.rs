//! Upload error types.

use stash_core::FileDigest;
use stash_metadata::MetadataError;
use stash_storage::StorageError;
use thiserror::Error;

/// Errors returned by the upload write path.
///
/// Exactly one of these reaches the caller per failed upload: the root
/// cause. Failures of the compensating cleanup are logged, never returned.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request was rejected before any side effect.
    #[error("invalid upload request: {0}")]
    Validation(String),

    /// No storage path could be derived. Nothing was written.
    #[error("path allocation failed: {0}")]
    Allocation(String),

    /// Another writer already holds the allocated path.
    #[error("object already exists: {0}")]
    Conflict(String),

    /// Reading the body or writing the object failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Computed digest differs from the declared one.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    Integrity {
        expected: FileDigest,
        actual: FileDigest,
    },

    /// The document store rejected the metadata record.
    #[error("persistence error: {0}")]
    Persistence(#[from] MetadataError),

    /// Any other content-store failure.
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for UploadError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::AlreadyExists(key) => Self::Conflict(key),
            StorageError::Io(io) => Self::Io(io),
            other => Self::Storage(other),
        }
    }
}

/// Result type for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
