//! # Packchain Graph
//!
//! The local object graph: content-addressed commits, trees and blobs, named
//! refs, pack encoding and checkout.
//!
//! The sync engine only sees the [`ObjectGraph`] and [`WorkingCopy`] traits.
//! [`FsObjectGraph`] is the filesystem implementation and also carries the
//! authoring helpers (`write_blob`, `write_tree`, `commit`) used to build
//! history locally.
//!
//! ## Object Ids
//!
//! Every object is identified by the BLAKE3 hash of its single canonical
//! encoding (see [`object`]). Packs carry `(id, bytes)` pairs and are verified
//! object by object when indexed, so a corrupt or tampered pack is rejected
//! before anything is written.

pub mod error;
pub mod fs;
pub mod object;
pub mod pack;
pub mod traits;

pub use error::{GraphError, Result};
pub use fs::{FsObjectGraph, DEFAULT_BRANCH, METADATA_DIR};
pub use object::{object_id, Commit, CommitEntry, EntryMode, GraphObject, Tree, TreeEntry};
pub use pack::{Pack, PACK_VERSION};
pub use traits::{IndexReport, ObjectGraph, WorkingCopy};
