//! Test fixtures and helpers.
//!
//! Scratch directories, identities and canned histories for integration tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use packchain_core::{BlobStoreConfig, ObjectId, Principal};
use packchain_graph::{FsObjectGraph, GraphError, TreeEntry, WorkingCopy};
use packchain_ledger::MemoryLedger;
use packchain_perms::{KeyPair, X25519PublicKey, X25519StaticSecret};
use tempfile::TempDir;

/// A principal with its key pair.
#[derive(Clone)]
pub struct Identity {
    pub principal: Principal,
    pub keys: KeyPair,
}

impl Identity {
    /// Identity with a random key pair.
    pub fn new(name: &str) -> Self {
        Self {
            principal: Principal::from(name),
            keys: KeyPair::generate(),
        }
    }

    /// Identity with a deterministic key pair.
    pub fn with_seed(name: &str, seed: [u8; 32]) -> Self {
        Self {
            principal: Principal::from(name),
            keys: KeyPair::from_secret(X25519StaticSecret::from_bytes(seed)),
        }
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.keys.public_key()
    }
}

/// Deterministic identities for multi-party tests, one per name.
///
/// Each seed is the BLAKE3 hash of the name, so distinct names give distinct
/// key pairs after scalar clamping.
pub fn multi_party(names: &[&str]) -> Vec<Identity> {
    names
        .iter()
        .map(|name| Identity::with_seed(name, *blake3::hash(name.as_bytes()).as_bytes()))
        .collect()
}

/// A temporary directory holding a local blob store and working copies,
/// plus an in-memory ledger.
pub struct Scratch {
    dir: TempDir,
    pub ledger: Arc<MemoryLedger>,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create scratch directory"),
            ledger: Arc::new(MemoryLedger::new()),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.dir.path().join("blobs")
    }

    /// Local blob store inside the scratch directory.
    pub fn blob_store(&self) -> BlobStoreConfig {
        BlobStoreConfig::Local {
            path: self.blob_dir(),
        }
    }

    /// Number of packs in the local blob store.
    pub fn blob_count(&self) -> usize {
        std::fs::read_dir(self.blob_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
                    .count()
            })
            .unwrap_or(0)
    }

    /// A path inside the scratch directory that does not exist yet.
    pub fn dest(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// A fresh working copy at `name`.
    pub async fn working_copy(&self, name: &str) -> FsObjectGraph {
        FsObjectGraph::init(&self.dest(name))
            .await
            .expect("failed to init working copy")
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a snapshot from `(path, content)` pairs.
pub fn snapshot(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<u8>> {
    pairs
        .iter()
        .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
        .collect()
}

/// Commit `count` revisions on top of HEAD. Revision `i` rewrites `README`
/// and adds `notes/rev-<i>.txt`. Returns the commit ids, oldest first.
pub async fn linear_history(
    graph: &FsObjectGraph,
    count: usize,
) -> Result<Vec<ObjectId>, GraphError> {
    let mut files = BTreeMap::new();
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        files.insert("README".to_string(), format!("revision {}\n", i).into_bytes());
        files.insert(format!("notes/rev-{}.txt", i), format!("note {}\n", i).into_bytes());
        ids.push(graph.commit(&files, format!("revision {}", i)).await?);
    }
    Ok(ids)
}

/// Ids of the commits written by [`merge_history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeHistory {
    pub base: ObjectId,
    pub left: ObjectId,
    pub right: ObjectId,
    pub merge: ObjectId,
}

/// A diamond: `base`, two children `left` and `right`, and `merge` with both
/// as parents. HEAD ends at `merge`.
pub async fn merge_history(graph: &FsObjectGraph) -> Result<MergeHistory, GraphError> {
    let base = graph.commit(&snapshot(&[("shared", "base")]), "base").await?;
    let left = graph
        .commit(&snapshot(&[("shared", "base"), ("left", "l")]), "left")
        .await?;

    let shared = graph.write_blob("base").await?;
    let left_blob = graph.write_blob("l").await?;
    let right_blob = graph.write_blob("r").await?;

    let right_tree = graph
        .write_tree(vec![
            TreeEntry::file("shared", shared),
            TreeEntry::file("right", right_blob),
        ])
        .await?;
    let right = graph.commit_tree(right_tree, vec![base], "right").await?;

    let merge_tree = graph
        .write_tree(vec![
            TreeEntry::file("shared", shared),
            TreeEntry::file("left", left_blob),
            TreeEntry::file("right", right_blob),
        ])
        .await?;
    let merge = graph
        .commit_tree(merge_tree, vec![left, right], "merge")
        .await?;
    graph.advance_head(&merge).await?;

    Ok(MergeHistory {
        base,
        left,
        right,
        merge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use packchain_graph::ObjectGraph;

    #[tokio::test]
    async fn test_linear_history() {
        let scratch = Scratch::new();
        let graph = scratch.working_copy("repo").await;
        let ids = linear_history(&graph, 3).await.unwrap();

        let history: Vec<_> = graph
            .history_from("HEAD")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(history, ids);
    }

    #[tokio::test]
    async fn test_merge_history_contains_both_parents() {
        let scratch = Scratch::new();
        let graph = scratch.working_copy("repo").await;
        let ids = merge_history(&graph).await.unwrap();

        let history = graph.history_from("HEAD").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history.last().unwrap().id, ids.merge);
        assert_eq!(history.last().unwrap().commit.parents, vec![ids.left, ids.right]);
    }

    #[test]
    fn test_multi_party_identities_differ() {
        let parties = multi_party(&["alice", "bob", "carol"]);
        assert_ne!(parties[0].public_key(), parties[1].public_key());
        assert_ne!(parties[1].public_key(), parties[2].public_key());
        assert_eq!(parties[2].principal, Principal::from("carol"));
    }

    #[test]
    fn test_multi_party_is_deterministic_and_scales() {
        let names: Vec<String> = (0..300).map(|i| format!("party-{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let parties = multi_party(&refs);

        let keys: std::collections::BTreeSet<_> =
            parties.iter().map(|p| *p.public_key().as_bytes()).collect();
        assert_eq!(keys.len(), 300);

        let again = multi_party(&["party-7"]);
        assert_eq!(again[0].public_key(), parties[7].public_key());
    }
}
