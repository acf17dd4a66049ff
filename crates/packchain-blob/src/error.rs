//! Error types for blob storage.

use packchain_core::PackKey;
use thiserror::Error;

/// Errors that can occur while storing or fetching packs.
#[derive(Debug, Error)]
pub enum BlobError {
    /// No blob is stored under the key.
    #[error("blob not found: {0}")]
    NotFound(PackKey),

    /// The key cannot be mapped to a storage location.
    #[error("invalid blob key: {0}")]
    InvalidKey(PackKey),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

impl BlobError {
    /// Whether the failure is a transport problem worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, BlobError::Io(_) | BlobError::ObjectStore(_))
    }
}

/// Result type for blob operations.
pub type Result<T> = std::result::Result<T, BlobError>;
