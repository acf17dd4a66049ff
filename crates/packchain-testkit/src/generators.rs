//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use packchain_core::{ObjectId, RepoName, StreamRef, Tag};

/// A name accepted as a repository name or tag.
pub fn valid_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_.-]{0,23}"
}

/// A name containing the stream separator.
pub fn name_with_separator() -> impl Strategy<Value = String> {
    ("[a-z0-9]{0,8}", "[a-z0-9]{0,8}").prop_map(|(a, b)| format!("{}:{}", a, b))
}

pub fn stream_ref() -> impl Strategy<Value = StreamRef> {
    (valid_name(), valid_name()).prop_map(|(repo, tag)| {
        StreamRef::new(
            RepoName::new(repo).expect("generated repo name is valid"),
            Tag::new(tag).expect("generated tag is valid"),
        )
    })
}

pub fn object_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; 32]>().prop_map(ObjectId::from_bytes)
}

/// A working tree snapshot. File names end in `.txt` and directory names
/// never do, so no path is both a file and a directory.
pub fn snapshot(max_files: usize) -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        "([a-z]{1,6}/){0,2}[a-z]{1,6}\\.txt",
        prop::collection::vec(any::<u8>(), 0..=64),
        1..=max_files,
    )
}
