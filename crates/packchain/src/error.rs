//! Error types for the client.

use std::path::PathBuf;

use packchain_core::ValidationError;
use packchain_graph::GraphError;
use packchain_ledger::LedgerError;
use packchain_perms::PermsError;
use packchain_sync::{ErrorKind, SyncError};
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid name: {0}")]
    Validation(#[from] ValidationError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("key error: {0}")]
    Perms(#[from] PermsError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("working copy error: {0}")]
    Graph(#[from] GraphError),

    /// The operation needs a key pair and none is configured.
    #[error("no key pair configured for {0}")]
    NoKeyPair(String),

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Classification of the underlying failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Sync(e) => e.kind(),
            ClientError::Ledger(e) if e.is_authorization() => ErrorKind::Authorization,
            ClientError::Ledger(e) if e.is_transient() => ErrorKind::Transient,
            ClientError::Perms(PermsError::NoGrant { .. } | PermsError::KeyUnavailable(_))
            | ClientError::NoKeyPair(_) => ErrorKind::Authorization,
            ClientError::Perms(PermsError::Ledger(e)) if e.is_authorization() => {
                ErrorKind::Authorization
            }
            ClientError::Perms(PermsError::DecryptionError(_)) => ErrorKind::Integrity,
            ClientError::Graph(GraphError::CorruptPack(_) | GraphError::CorruptObject { .. }) => {
                ErrorKind::Integrity
            }
            ClientError::Io(_) => ErrorKind::Transient,
            _ => ErrorKind::Precondition,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
