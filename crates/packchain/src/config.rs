//! Client configuration, read from TOML.
//!
//! ```toml
//! principal = "alice"
//! key_path = "keys/alice"
//! ledger_path = "packchain.db"
//!
//! [blob_store]
//! type = "local"
//! path = "tmp/blobs"
//!
//! [sync]
//! primary_branch = "master"
//! ```

use std::path::{Path, PathBuf};

use packchain_core::{BlobStoreConfig, Principal};
use packchain_sync::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Default location of the SQLite ledger.
pub const DEFAULT_LEDGER_PATH: &str = "packchain.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ledger address the client acts as.
    pub principal: Principal,

    /// Secret key file; its public half is `<key_path>.pub`.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// SQLite ledger used by [`crate::Client::open`].
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Blob store recorded for repositories this client registers.
    #[serde(default)]
    pub blob_store: BlobStoreConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_PATH)
}

impl ClientConfig {
    /// Configuration with defaults for everything but the principal.
    pub fn new(principal: impl Into<Principal>) -> Self {
        Self {
            principal: principal.into(),
            key_path: None,
            ledger_path: default_ledger_path(),
            blob_store: BlobStoreConfig::default(),
            sync: SyncConfig::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| ClientError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
