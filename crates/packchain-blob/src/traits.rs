//! The blob store contract.

use async_trait::async_trait;
use bytes::Bytes;
use packchain_core::PackKey;

use crate::error::{BlobError, Result};

/// Key/value storage for pack bytes.
///
/// Writes are idempotent: a second `put` of the same key succeeds without
/// changing the stored bytes. A `get` of a key that was never written fails
/// with [`BlobError::NotFound`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &PackKey, bytes: Bytes) -> Result<()>;

    async fn get(&self, key: &PackKey) -> Result<Bytes>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Reject keys that could escape a flat namespace.
pub(crate) fn check_key(key: &PackKey) -> Result<()> {
    let raw = key.as_str();
    let flat = !raw.is_empty()
        && raw != "."
        && raw != ".."
        && !raw.contains(['/', '\\'])
        && !raw.chars().any(char::is_control);
    if flat {
        Ok(())
    } else {
        Err(BlobError::InvalidKey(key.clone()))
    }
}
