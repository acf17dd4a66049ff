//! The client: one principal's view of a ledger.
//!
//! Bundles the principal, its optional key pair, the ledger and a sync engine
//! behind string-addressed operations (`"repo"`, `"repo:tag"`).

use std::path::Path;
use std::sync::Arc;

use packchain_core::{ObjectId, Principal, RepoName, Role, StreamRef};
use packchain_graph::{FsObjectGraph, WorkingCopy};
use packchain_ledger::{Ledger, SqliteLedger};
use packchain_perms::{KeyCustodian, KeyPair, X25519PublicKey};
use packchain_sync::{PushOutcome, SyncEngine};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Generate a key pair and save it at `path` (secret) and `path.pub` (public).
///
/// A principal runs this once before it can be granted access to a private
/// repository.
pub fn generate_keys(path: impl AsRef<Path>) -> Result<KeyPair> {
    let keys = KeyPair::generate();
    keys.save(path.as_ref())?;
    info!(path = %path.as_ref().display(), "generated key pair");
    Ok(keys)
}

pub struct Client<L> {
    config: ClientConfig,
    ledger: Arc<L>,
    custodian: KeyCustodian<L>,
    engine: SyncEngine<L>,
    keys: Option<KeyPair>,
}

impl Client<SqliteLedger> {
    /// Client over the SQLite ledger at `config.ledger_path`.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let ledger = Arc::new(SqliteLedger::open(&config.ledger_path)?);
        Self::new(ledger, config)
    }
}

impl<L: Ledger> Client<L> {
    /// Build a client. The key pair is loaded from `config.key_path` when set.
    pub fn new(ledger: Arc<L>, config: ClientConfig) -> Result<Self> {
        let keys = config.key_path.as_ref().map(KeyPair::load).transpose()?;
        Ok(Self::assemble(ledger, config, keys))
    }

    /// Replace the client's key pair.
    pub fn with_keys(self, keys: KeyPair) -> Self {
        Self::assemble(self.ledger, self.config, Some(keys))
    }

    fn assemble(ledger: Arc<L>, config: ClientConfig, keys: Option<KeyPair>) -> Self {
        let mut engine = SyncEngine::new(ledger.clone(), config.principal.clone(), config.sync.clone());
        if let Some(keys) = &keys {
            engine = engine.with_keys(keys.clone());
        }
        Self {
            custodian: KeyCustodian::new(ledger.clone()),
            config,
            ledger,
            engine,
            keys,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.config.principal
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn engine(&self) -> &SyncEngine<L> {
        &self.engine
    }

    pub fn public_key(&self) -> Option<X25519PublicKey> {
        self.keys.as_ref().map(KeyPair::public_key)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration & Membership
    // ─────────────────────────────────────────────────────────────────────────

    /// Register `repo` with the configured blob store; the caller becomes its
    /// first owner. A private repository needs the client's key pair.
    pub async fn register(&self, repo: &str, private: bool) -> Result<RepoName> {
        let name = RepoName::new(repo)?;
        if private {
            let keys = self.require_keys()?;
            self.custodian
                .register_private(self.principal(), keys, &name, &self.config.blob_store)
                .await?;
        } else {
            self.ledger
                .register(self.principal(), &name, &self.config.blob_store, None)
                .await?;
            info!(repo = %name, owner = %self.principal(), "registered repository");
        }
        Ok(name)
    }

    pub async fn add_owner(
        &self,
        repo: &str,
        member: &Principal,
        member_public: Option<&X25519PublicKey>,
    ) -> Result<()> {
        self.grant(repo, Role::Owner, member, member_public).await
    }

    pub async fn add_writer(
        &self,
        repo: &str,
        member: &Principal,
        member_public: Option<&X25519PublicKey>,
    ) -> Result<()> {
        self.grant(repo, Role::Writer, member, member_public).await
    }

    pub async fn add_reader(
        &self,
        repo: &str,
        member: &Principal,
        member_public: Option<&X25519PublicKey>,
    ) -> Result<()> {
        self.grant(repo, Role::Reader, member, member_public).await
    }

    pub async fn remove_owner(&self, repo: &str, member: &Principal) -> Result<()> {
        self.revoke(repo, Role::Owner, member).await
    }

    pub async fn remove_writer(&self, repo: &str, member: &Principal) -> Result<()> {
        self.revoke(repo, Role::Writer, member).await
    }

    pub async fn remove_reader(&self, repo: &str, member: &Principal) -> Result<()> {
        self.revoke(repo, Role::Reader, member).await
    }

    pub async fn members(&self, repo: &str, role: Role) -> Result<Vec<Principal>> {
        Ok(self.ledger.members(&RepoName::new(repo)?, role).await?)
    }

    async fn grant(
        &self,
        repo: &str,
        role: Role,
        member: &Principal,
        member_public: Option<&X25519PublicKey>,
    ) -> Result<()> {
        let name = RepoName::new(repo)?;
        self.custodian
            .grant(
                self.principal(),
                self.keys.as_ref(),
                &name,
                role,
                member,
                member_public,
            )
            .await?;
        Ok(())
    }

    async fn revoke(&self, repo: &str, role: Role, member: &Principal) -> Result<()> {
        let name = RepoName::new(repo)?;
        self.custodian
            .revoke(self.principal(), &name, role, member)
            .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Current head of `stream` (`repo:tag`).
    pub async fn head(&self, stream: &str) -> Result<Option<ObjectId>> {
        Ok(self.engine.head(&StreamRef::parse(stream)?).await?)
    }

    /// Push the working copy at `path` to `stream`.
    pub async fn push(&self, path: impl AsRef<Path>, stream: &str) -> Result<PushOutcome> {
        let stream = StreamRef::parse(stream)?;
        let graph = FsObjectGraph::open(path.as_ref()).await?;
        Ok(self.engine.push(&graph, &stream).await?)
    }

    /// Clone `stream` into `dest`, which must not exist yet.
    pub async fn clone(&self, stream: &str, dest: impl AsRef<Path>) -> Result<FsObjectGraph> {
        let stream = StreamRef::parse(stream)?;
        Ok(self.engine.clone(&stream, dest.as_ref()).await?)
    }

    /// Update the existing working copy at `dest` from `stream`.
    pub async fn pull(&self, stream: &str, dest: impl AsRef<Path>) -> Result<FsObjectGraph> {
        let stream = StreamRef::parse(stream)?;
        Ok(self.engine.pull(&stream, dest.as_ref()).await?)
    }

    fn require_keys(&self) -> Result<&KeyPair> {
        self.keys
            .as_ref()
            .ok_or_else(|| ClientError::NoKeyPair(self.principal().to_string()))
    }
}
