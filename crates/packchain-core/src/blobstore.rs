//! Description of a repository's blob store.
//!
//! This value is written publicly to the ledger at registration time, so it
//! must never carry credentials. Object-storage credentials are resolved from
//! the environment by whoever opens the store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CoreError;

/// Where the pack bytes for a repository live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlobStoreConfig {
    /// Files in a local directory, one file per key.
    #[serde(alias = "tmpfile")]
    Local { path: PathBuf },

    /// An object-storage bucket.
    S3 {
        bucket: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },

    /// Discards writes and reads back empty content. For exercising push
    /// mechanics without persisting payloads.
    Stub,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        BlobStoreConfig::Local {
            path: PathBuf::from("tmp/blobs"),
        }
    }
}

impl BlobStoreConfig {
    /// Encode as the JSON document stored in the repo record.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("blob store config is always serializable")
    }

    /// Decode from the JSON document stored in the repo record.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidBlobStore(e.to_string()))
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, BlobStoreConfig::Stub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_local_tmp_blobs() {
        let config = BlobStoreConfig::default();
        assert_eq!(config.to_json(), r#"{"type":"local","path":"tmp/blobs"}"#);
    }

    #[test]
    fn test_tmpfile_alias_accepted() {
        let config = BlobStoreConfig::from_json(r#"{"type":"tmpfile","path":"tmp/blobs"}"#).unwrap();
        assert_eq!(config, BlobStoreConfig::default());
    }

    #[test]
    fn test_s3_without_prefix() {
        let config = BlobStoreConfig::from_json(r#"{"type":"s3","bucket":"my-s3-bucket"}"#).unwrap();
        assert_eq!(
            config,
            BlobStoreConfig::S3 {
                bucket: "my-s3-bucket".into(),
                prefix: None
            }
        );
        assert_eq!(config.to_json(), r#"{"type":"s3","bucket":"my-s3-bucket"}"#);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = BlobStoreConfig::from_json(r#"{"type":"ftp"}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidBlobStore(_)));
    }
}
