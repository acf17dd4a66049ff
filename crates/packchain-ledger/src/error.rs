//! Error types for the ledger module.

use packchain_core::{CoreError, Principal, RepoName, Role, ValidationError};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Repository has not been registered.
    #[error("repository {0} is not registered")]
    NotRegistered(RepoName),

    /// Repository name is already taken.
    #[error("repository {0} is already registered")]
    AlreadyRegistered(RepoName),

    /// Caller lacks the role required for the action.
    #[error("{principal} is not authorized to {action} on {repo}")]
    NotAuthorized {
        principal: Principal,
        repo: RepoName,
        action: &'static str,
    },

    /// A grant on a private repository arrived without a wrapped key.
    #[error("repository {0} is private: a wrapped key is required")]
    MissingKeyMaterial(RepoName),

    /// Removing this owner would leave the repository without one.
    #[error("cannot remove the last owner of {0}")]
    LastOwner(RepoName),

    /// The principal does not hold the role being removed.
    #[error("{principal} is not a {role} of {repo}")]
    NotAMember {
        principal: Principal,
        repo: RepoName,
        role: Role,
    },

    /// A push record or grant is inconsistent with the repository.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Name validation failed.
    #[error("invalid name: {0}")]
    InvalidName(#[from] ValidationError),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Decoding error for stored core values.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The ledger could not be reached or its worker failed.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Whether this is an authorization failure reported by the ledger.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            LedgerError::NotRegistered(_)
                | LedgerError::NotAuthorized { .. }
                | LedgerError::MissingKeyMaterial(_)
        )
    }

    /// Whether this failure is transient I/O rather than a rejection.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Database(_) | LedgerError::Unavailable(_))
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
