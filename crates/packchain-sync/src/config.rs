//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Knobs for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Branch a downloaded head is written to and checked out from.
    pub primary_branch: String,
    /// Reference whose history is pushed.
    pub source_ref: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            primary_branch: "master".to_string(),
            source_ref: "HEAD".to_string(),
        }
    }
}
