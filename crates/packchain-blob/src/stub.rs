//! A blob store that stores nothing.

use async_trait::async_trait;
use bytes::Bytes;
use packchain_core::PackKey;
use tracing::trace;

use crate::error::Result;
use crate::traits::BlobStore;

/// Discards every write; every read returns empty bytes.
///
/// Lets push mechanics run end to end without persisting payloads. Data pushed
/// through it cannot be cloned back.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubBlobStore;

#[async_trait]
impl BlobStore for StubBlobStore {
    async fn put(&self, key: &PackKey, bytes: Bytes) -> Result<()> {
        trace!(key = %key, bytes = bytes.len(), "stub store discarded blob");
        Ok(())
    }

    async fn get(&self, _key: &PackKey) -> Result<Bytes> {
        Ok(Bytes::new())
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_back_empty() {
        let key = PackKey::new("k");
        StubBlobStore.put(&key, Bytes::from_static(b"data")).await.unwrap();
        assert!(StubBlobStore.get(&key).await.unwrap().is_empty());
    }
}
