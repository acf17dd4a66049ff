//! Opening a blob store from its registered description.

use std::sync::Arc;

use packchain_core::BlobStoreConfig;
use tracing::debug;

use crate::error::Result;
use crate::local::LocalBlobStore;
use crate::object::ObjectBlobStore;
use crate::stub::StubBlobStore;
use crate::traits::BlobStore;

/// Build the blob store a repository registration points at.
///
/// S3 credentials come from the environment, never from `config`.
pub fn open_blob_store(config: &BlobStoreConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config {
        BlobStoreConfig::Local { path } => Arc::new(LocalBlobStore::new(path.clone())),
        BlobStoreConfig::S3 { bucket, prefix } => {
            Arc::new(ObjectBlobStore::s3(bucket, prefix.as_deref())?)
        }
        BlobStoreConfig::Stub => Arc::new(StubBlobStore),
    };
    debug!(store = %store.describe(), "opened blob store");
    Ok(store)
}
