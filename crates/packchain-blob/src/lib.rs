//! # Packchain Blob
//!
//! Storage for encoded pack bytes, addressed by [`PackKey`](packchain_core::PackKey).
//!
//! A repository's registration names its blob store; [`open_blob_store`] turns
//! that description into a live [`BlobStore`]:
//!
//! - [`LocalBlobStore`] - One file per key under a directory
//! - [`ObjectBlobStore`] - Any `object_store` backend, S3 in production
//! - [`StubBlobStore`] - Discards writes, reads back empty bytes
//!
//! Keys are content-addressed, so `put` of an existing key is a no-op and
//! concurrent writers of the same key cannot conflict.

pub mod error;
pub mod local;
pub mod object;
pub mod open;
pub mod stub;
pub mod traits;

pub use error::{BlobError, Result};
pub use local::LocalBlobStore;
pub use object::ObjectBlobStore;
pub use open::open_blob_store;
pub use stub::StubBlobStore;
pub use traits::BlobStore;
