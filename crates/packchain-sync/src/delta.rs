//! Which local commits a push still has to carry.

use std::collections::{HashMap, HashSet};

use packchain_core::ObjectId;
use packchain_graph::CommitEntry;

/// Commits of `history` that are not already covered by `recorded`.
///
/// `history` is oldest-first and closed under parents. A commit is covered
/// when it is `recorded` or one of its ancestors; on a linear history that is
/// exactly the commits strictly after `recorded`.
///
/// Returns `None` when `recorded` is not in `history` at all.
pub fn commits_after(history: Vec<CommitEntry>, recorded: Option<&ObjectId>) -> Option<Vec<CommitEntry>> {
    let Some(recorded) = recorded else {
        return Some(history);
    };

    let parents: HashMap<ObjectId, &[ObjectId]> = history
        .iter()
        .map(|entry| (entry.id, entry.commit.parents.as_slice()))
        .collect();
    if !parents.contains_key(recorded) {
        return None;
    }

    let mut covered = HashSet::new();
    let mut pending = vec![*recorded];
    while let Some(id) = pending.pop() {
        if covered.insert(id) {
            if let Some(ps) = parents.get(&id) {
                pending.extend(ps.iter().copied());
            }
        }
    }

    Some(
        history
            .into_iter()
            .filter(|entry| !covered.contains(&entry.id))
            .collect(),
    )
}
