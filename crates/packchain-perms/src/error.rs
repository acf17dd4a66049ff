//! Error types for the permissions module.

use packchain_core::{Principal, RepoName};
use thiserror::Error;

/// Errors that can occur while sealing packs or handling repository secrets.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The ledger holds no wrapped secret for this principal.
    #[error("{principal} has no key grant on {repo}")]
    NoGrant { principal: Principal, repo: RepoName },

    /// Local key material needed for the operation is missing or does not match.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error, including a wrong secret or tampered ciphertext.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A key file could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] packchain_ledger::LedgerError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
