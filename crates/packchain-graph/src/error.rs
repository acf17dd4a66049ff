//! Error types for the object graph.

use std::path::PathBuf;

use packchain_core::{CoreError, ObjectId};
use thiserror::Error;

/// Errors that can occur while reading or writing the local object graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Object is not present in local storage.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Reference does not resolve to a commit.
    #[error("unknown reference: {0}")]
    UnknownRef(String),

    /// Object exists but is not of the expected kind.
    #[error("object {id} is a {actual}, expected a {expected}")]
    WrongKind {
        id: ObjectId,
        expected: &'static str,
        actual: &'static str,
    },

    /// A pack failed to decode or an object in it does not match its id.
    #[error("corrupt pack: {0}")]
    CorruptPack(String),

    /// A stored object could not be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// Path holds no working copy.
    #[error("not a working copy: {0}")]
    NotAWorkingCopy(PathBuf),

    /// A working copy already exists at the path.
    #[error("working copy already exists: {0}")]
    AlreadyExists(PathBuf),

    /// A tree entry or ref name cannot be mapped to a path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for object graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
