//! # Packchain Core
//!
//! Pure primitives shared by every packchain component: content ids, stream
//! names, and the small records the ledger keeps about repositories and pushes.
//!
//! This crate contains no I/O. Nothing here knows how a ledger, a blob store or
//! an object graph is reached; it only fixes the vocabulary they exchange.
//!
//! ## Key Types
//!
//! - [`ObjectId`] - Content id of a commit, tree or blob (BLAKE3)
//! - [`PackKey`] - Blob-store key of an uploaded pack
//! - [`StreamRef`] - A `(repo, tag)` pair, written externally as `repo:tag`
//! - [`PushRecord`] - One synchronization point in a stream's linked history
//! - [`RepoRecord`] - Registration data for a repository
//! - [`BlobStoreConfig`] - Tagged description of where pack bytes live
//!
//! ## Naming
//!
//! The stream separator `:` is forbidden inside repository names and tags.
//! [`RepoName`] and [`Tag`] can only be constructed through validation, so a
//! value of either type is always safe to hand to the ledger.

pub mod blobstore;
pub mod error;
pub mod names;
pub mod records;
pub mod types;

pub use blobstore::BlobStoreConfig;
pub use error::{CoreError, ValidationError};
pub use names::{validate_name, RepoName, StreamRef, Tag, STREAM_SEPARATOR};
pub use records::{EnvelopeFormat, EnvelopeMeta, PushRecord, RepoRecord, Role, WrappedKeyRecord};
pub use types::{ObjectId, PackKey, Principal};
