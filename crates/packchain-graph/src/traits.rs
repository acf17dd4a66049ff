//! The object graph contracts the sync engine depends on.

use std::path::Path;

use async_trait::async_trait;
use packchain_core::ObjectId;

use crate::error::Result;
use crate::object::{CommitEntry, GraphObject};

/// Summary of an ingested pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexReport {
    /// Objects in the pack.
    pub objects: usize,
    /// Objects that were not already present locally.
    pub new_objects: usize,
}

/// A content-addressed store of commits, trees and blobs plus named refs.
#[async_trait]
pub trait ObjectGraph: Send + Sync {
    /// Resolve `HEAD`, a branch name, `refs/heads/<name>` or a hex id.
    ///
    /// Returns `Ok(None)` for a branch that has no commits yet.
    async fn resolve_ref(&self, reference: &str) -> Result<Option<ObjectId>>;

    /// Every commit reachable from `reference`, oldest first.
    ///
    /// Parents always precede their children; an unborn branch yields an
    /// empty history.
    async fn history_from(&self, reference: &str) -> Result<Vec<CommitEntry>>;

    async fn read_object(&self, id: &ObjectId) -> Result<GraphObject>;

    async fn has_object(&self, id: &ObjectId) -> Result<bool>;

    /// Point `name` at `id`, creating or overwriting the ref.
    async fn write_ref(&self, name: &str, id: &ObjectId) -> Result<()>;

    /// Make the working tree match the commit `reference` points at.
    async fn checkout(&self, reference: &str) -> Result<()>;

    /// Encode the given objects as a pack.
    async fn build_pack(&self, ids: &[ObjectId]) -> Result<Vec<u8>>;

    /// Verify a pack and add its objects to local storage.
    async fn index_pack(&self, pack: &[u8]) -> Result<IndexReport>;
}

/// An object graph rooted at a directory on disk.
#[async_trait]
pub trait WorkingCopy: ObjectGraph + Sized {
    /// Whether `path` already holds a working copy, bare or not.
    fn contains_working_copy(path: &Path) -> bool;

    /// Create an empty working copy at `path`.
    async fn init(path: &Path) -> Result<Self>;

    /// Open the working copy at `path`.
    async fn open(path: &Path) -> Result<Self>;
}
