//! Blob store over any `object_store` backend.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode};
use packchain_core::PackKey;
use tracing::debug;

use crate::error::{BlobError, Result};
use crate::traits::{check_key, BlobStore};

/// Objects named `<prefix>/<key>` in an object store.
#[derive(Debug, Clone)]
pub struct ObjectBlobStore {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
    label: String,
}

impl ObjectBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<&str>, label: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.map(Path::from).unwrap_or_default(),
            label: label.into(),
        }
    }

    /// An S3 bucket, with region and credentials taken from the `AWS_*`
    /// environment variables.
    pub fn s3(bucket: &str, prefix: Option<&str>) -> Result<Self> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self::new(Arc::new(store), prefix, format!("s3://{}", bucket)))
    }

    fn path_for(&self, key: &PackKey) -> Result<Path> {
        check_key(key)?;
        Ok(self.prefix.child(key.as_str()))
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put(&self, key: &PackKey, bytes: Bytes) -> Result<()> {
        let path = self.path_for(key)?;
        let len = bytes.len();
        match self
            .store
            .put_opts(&path, bytes.into(), PutMode::Create.into())
            .await
        {
            Ok(_) => {
                debug!(key = %key, bytes = len, store = %self.label, "stored blob");
                Ok(())
            }
            Err(object_store::Error::AlreadyExists { .. }) => {
                debug!(key = %key, "blob already stored");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, key: &PackKey) -> Result<Bytes> {
        let path = self.path_for(key)?;
        match self.store.get(&path).await {
            Ok(object) => Ok(object.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(BlobError::NotFound(key.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
