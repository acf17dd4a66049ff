//! Error types for the sync engine.

use std::path::PathBuf;

use packchain_blob::BlobError;
use packchain_core::{ObjectId, RepoName, StreamRef, ValidationError};
use packchain_graph::GraphError;
use packchain_ledger::LedgerError;
use packchain_perms::PermsError;
use thiserror::Error;

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request cannot succeed as issued: unknown stream, destination
    /// already exists, invalid name.
    Precondition,
    /// The caller lacks a role or a key grant.
    Authorization,
    /// I/O or network trouble; retrying may succeed.
    Transient,
    /// Local history and the recorded head disagree.
    Ambiguous,
    /// Stored data is corrupt or cannot be decrypted.
    Integrity,
}

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("repository {0} is not registered")]
    NotRegistered(RepoName),

    /// The stream has no pushes to download.
    #[error("no pushes recorded for {0}")]
    StreamNotFound(StreamRef),

    /// Clone destination is already taken.
    #[error("path {0} already exists")]
    DestinationExists(PathBuf),

    /// Pull destination does not exist.
    #[error("path {0} does not exist")]
    DestinationMissing(PathBuf),

    /// The recorded head is not part of the local history.
    #[error("{stream} is at {recorded}, which is not in local history")]
    DivergedHistory { stream: StreamRef, recorded: ObjectId },

    /// A private repository was accessed without a local key pair.
    #[error("repository {0} is private and no key pair is configured")]
    MissingKeys(RepoName),

    /// The push chain references a push the ledger does not have.
    #[error("push chain of {stream} is broken at {at}")]
    BrokenChain { stream: StreamRef, at: ObjectId },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("key error: {0}")]
    Perms(#[from] PermsError),

    #[error("object graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("invalid name: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotRegistered(_)
            | SyncError::StreamNotFound(_)
            | SyncError::DestinationExists(_)
            | SyncError::DestinationMissing(_)
            | SyncError::Validation(_) => ErrorKind::Precondition,
            SyncError::DivergedHistory { .. } => ErrorKind::Ambiguous,
            SyncError::MissingKeys(_) => ErrorKind::Authorization,
            SyncError::BrokenChain { .. } => ErrorKind::Integrity,
            SyncError::Ledger(e) => ledger_kind(e),
            SyncError::Blob(e) => match e {
                BlobError::NotFound(_) | BlobError::InvalidKey(_) => ErrorKind::Integrity,
                BlobError::Io(_) | BlobError::ObjectStore(_) => ErrorKind::Transient,
            },
            SyncError::Perms(e) => match e {
                PermsError::NoGrant { .. } | PermsError::KeyUnavailable(_) => {
                    ErrorKind::Authorization
                }
                PermsError::Ledger(e) => ledger_kind(e),
                PermsError::Io(_) => ErrorKind::Transient,
                _ => ErrorKind::Integrity,
            },
            SyncError::Graph(e) => match e {
                GraphError::CorruptPack(_)
                | GraphError::CorruptObject { .. }
                | GraphError::WrongKind { .. } => ErrorKind::Integrity,
                GraphError::Io(_) => ErrorKind::Transient,
                _ => ErrorKind::Precondition,
            },
            SyncError::Io(_) => ErrorKind::Transient,
        }
    }
}

fn ledger_kind(e: &LedgerError) -> ErrorKind {
    if e.is_authorization() {
        ErrorKind::Authorization
    } else if e.is_transient() {
        ErrorKind::Transient
    } else {
        ErrorKind::Precondition
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use packchain_core::{PackKey, Tag};

    fn stream() -> StreamRef {
        StreamRef::new(RepoName::new("r").unwrap(), Tag::new("t").unwrap())
    }

    #[test]
    fn test_kinds() {
        let diverged = SyncError::DivergedHistory {
            stream: stream(),
            recorded: ObjectId::from_bytes([0; 32]),
        };
        assert_eq!(diverged.kind(), ErrorKind::Ambiguous);
        assert_eq!(
            SyncError::from(GraphError::CorruptPack("x".into())).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            SyncError::from(BlobError::NotFound(PackKey::new("k"))).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            SyncError::from(PermsError::NoGrant {
                principal: "p".into(),
                repo: RepoName::new("r").unwrap()
            })
            .kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            SyncError::from(LedgerError::Unavailable("down".into())).kind(),
            ErrorKind::Transient
        );
        assert_eq!(SyncError::StreamNotFound(stream()).kind(), ErrorKind::Precondition);
    }
}
