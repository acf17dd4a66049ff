//! Blob store backed by a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use packchain_core::PackKey;
use tokio::fs;
use tracing::debug;

use crate::error::{BlobError, Result};
use crate::traits::{check_key, BlobStore};

/// One file per key under `root`.
///
/// Writes land in a temporary sibling first and are renamed into place, so a
/// reader never observes a partially written pack.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &PackKey) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key.as_str()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &PackKey, bytes: Bytes) -> Result<()> {
        let path = self.path_for(key)?;
        if fs::try_exists(&path).await? {
            debug!(key = %key, "blob already stored");
            return Ok(());
        }

        fs::create_dir_all(&self.root).await?;
        let staging = self
            .root
            .join(format!(".{}.{}.tmp", key.as_str(), std::process::id()));
        fs::write(&staging, &bytes).await?;
        fs::rename(&staging, &path).await?;

        debug!(key = %key, bytes = bytes.len(), root = %self.root.display(), "stored blob");
        Ok(())
    }

    async fn get(&self, key: &PackKey) -> Result<Bytes> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(key.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}
