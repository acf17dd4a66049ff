//! Choosing the objects that go into a pack.

use std::collections::HashSet;

use packchain_core::ObjectId;
use packchain_graph::{CommitEntry, GraphError, GraphObject, ObjectGraph};

use crate::error::Result;

/// The objects one push uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackPlan {
    /// Newest commit of the delta; becomes the push record's head.
    pub head: ObjectId,
    /// Delta commits, oldest first.
    pub commits: Vec<ObjectId>,
    /// Every object to pack, each listed once.
    pub objects: Vec<ObjectId>,
}

/// Plan a pack for `delta`: each commit plus its complete tree.
///
/// Returns `None` for an empty delta.
pub async fn plan_pack<G: ObjectGraph + ?Sized>(
    graph: &G,
    delta: &[CommitEntry],
) -> Result<Option<PackPlan>> {
    let Some(last) = delta.last() else {
        return Ok(None);
    };

    let mut seen = HashSet::new();
    let mut objects = Vec::new();

    for entry in delta {
        if seen.insert(entry.id) {
            objects.push(entry.id);
        }

        let mut trees = vec![entry.commit.tree];
        while let Some(tree_id) = trees.pop() {
            if !seen.insert(tree_id) {
                continue;
            }
            objects.push(tree_id);

            let tree = match graph.read_object(&tree_id).await? {
                GraphObject::Tree(tree) => tree,
                other => {
                    return Err(GraphError::WrongKind {
                        id: tree_id,
                        expected: "tree",
                        actual: other.kind(),
                    }
                    .into())
                }
            };
            for child in tree.entries() {
                if child.mode.is_directory() {
                    trees.push(child.id);
                } else if seen.insert(child.id) {
                    objects.push(child.id);
                }
            }
        }
    }

    Ok(Some(PackPlan {
        head: last.id,
        commits: delta.iter().map(|entry| entry.id).collect(),
        objects,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use packchain_graph::{FsObjectGraph, WorkingCopy};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn files(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn test_plan_lists_shared_objects_once() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();
        graph
            .commit(&files(&[("same.txt", "s"), ("dir/a", "1")]), "one")
            .await
            .unwrap();
        graph
            .commit(&files(&[("same.txt", "s"), ("dir/a", "2")]), "two")
            .await
            .unwrap();

        let history = graph.history_from("HEAD").await.unwrap();
        let plan = plan_pack(&graph, &history).await.unwrap().unwrap();

        // 2 commits, 2 root trees, 2 dir trees, blobs: s, 1, 2.
        assert_eq!(plan.commits.len(), 2);
        assert_eq!(plan.objects.len(), 9);
        assert_eq!(plan.head, history[1].id);
        let unique: HashSet<_> = plan.objects.iter().collect();
        assert_eq!(unique.len(), plan.objects.len());
    }

    #[tokio::test]
    async fn test_empty_delta_has_no_plan() {
        let dir = tempdir().unwrap();
        let graph = FsObjectGraph::init(dir.path()).await.unwrap();
        assert!(plan_pack(&graph, &[]).await.unwrap().is_none());
    }
}
