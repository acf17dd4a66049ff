//! Push, clone and pull of ledger-recorded streams.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use packchain_blob::open_blob_store;
use packchain_core::{ObjectId, PackKey, Principal, PushRecord, RepoRecord, StreamRef};
use packchain_graph::{ObjectGraph, WorkingCopy};
use packchain_ledger::{Ledger, LedgerError};
use packchain_perms::{open, EncryptionKey, Envelope, KeyCustodian, KeyPair};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::delta::commits_after;
use crate::error::{Result, SyncError};
use crate::plan::plan_pack;

/// What a push did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Local history holds nothing the stream does not already have.
    NothingToPush { head: Option<ObjectId> },
    Pushed(PushReport),
}

impl PushOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, PushOutcome::Pushed(_))
    }

    /// Stream head after the push.
    pub fn head(&self) -> Option<ObjectId> {
        match self {
            PushOutcome::NothingToPush { head } => *head,
            PushOutcome::Pushed(report) => Some(report.head),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub stream: StreamRef,
    pub head: ObjectId,
    pub pack_key: PackKey,
    pub previous_head: Option<ObjectId>,
    /// Commits carried by the pack.
    pub commits: usize,
    /// Objects carried by the pack, commits included.
    pub objects: usize,
    /// Size of the uploaded pack, sealed if the repository is private.
    pub bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub head: Option<ObjectId>,
    /// Packs fetched while walking the push chain.
    pub packs: usize,
    pub objects: usize,
    /// Objects that were not stored locally before.
    pub new_objects: usize,
}

/// Synchronizes working copies with streams recorded in a ledger.
///
/// One engine acts for one principal. Every operation runs its steps in
/// sequence; no state is kept between calls.
pub struct SyncEngine<L> {
    ledger: Arc<L>,
    custodian: KeyCustodian<L>,
    principal: Principal,
    keys: Option<KeyPair>,
    config: SyncConfig,
}

impl<L: Ledger> SyncEngine<L> {
    pub fn new(ledger: Arc<L>, principal: Principal, config: SyncConfig) -> Self {
        Self {
            custodian: KeyCustodian::new(ledger.clone()),
            ledger,
            principal,
            keys: None,
            config,
        }
    }

    /// Key pair used to resolve secrets of private repositories.
    pub fn with_keys(mut self, keys: KeyPair) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current head of `stream`, `None` before the first push.
    pub async fn head(&self, stream: &StreamRef) -> Result<Option<ObjectId>> {
        self.require_repo(stream).await?;
        Ok(self.ledger.head(&stream.repo, &stream.tag).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Push
    // ─────────────────────────────────────────────────────────────────────────

    /// Push the commits of `graph` that `stream` does not have yet.
    pub async fn push<G: ObjectGraph + ?Sized>(
        &self,
        graph: &G,
        stream: &StreamRef,
    ) -> Result<PushOutcome> {
        let repo = self.require_repo(stream).await?;
        if !repo.can_push(&self.principal) {
            return Err(LedgerError::NotAuthorized {
                principal: self.principal.clone(),
                repo: repo.name.clone(),
                action: "push",
            }
            .into());
        }
        let secret = self.secret_for(&repo).await?;

        let recorded = self.ledger.head(&stream.repo, &stream.tag).await?;
        let history = graph.history_from(&self.config.source_ref).await?;
        let delta = match (commits_after(history, recorded.as_ref()), recorded) {
            (Some(delta), _) => delta,
            (None, Some(recorded)) => {
                return Err(SyncError::DivergedHistory {
                    stream: stream.clone(),
                    recorded,
                })
            }
            (None, None) => Vec::new(),
        };

        let Some(plan) = plan_pack(graph, &delta).await? else {
            debug!(stream = %stream, "nothing to push");
            return Ok(PushOutcome::NothingToPush { head: recorded });
        };

        let pack = graph.build_pack(&plan.objects).await?;
        let (body, envelope) = match &secret {
            Some(secret) => {
                let sealed = Envelope::encrypt(&pack, secret)?;
                (sealed.to_bytes(), Some(sealed.meta()))
            }
            None => (pack, None),
        };

        let pack_key = PackKey::for_bytes(&body);
        let size = body.len();
        let store = open_blob_store(&repo.blob_store)?;
        store.put(&pack_key, Bytes::from(body)).await?;
        debug!(stream = %stream, key = %pack_key, bytes = size, store = %store.describe(), "uploaded pack");

        let record = PushRecord {
            tag: stream.tag.clone(),
            head: plan.head,
            pack_key: pack_key.clone(),
            previous_head: recorded,
            envelope,
        };
        if let Err(e) = self
            .ledger
            .append_push(&self.principal, &stream.repo, &record)
            .await
        {
            warn!(stream = %stream, key = %pack_key, error = %e, "push not recorded, uploaded pack is orphaned");
            return Err(e.into());
        }

        info!(
            stream = %stream,
            head = %plan.head.short_hex(),
            commits = plan.commits.len(),
            objects = plan.objects.len(),
            "pushed"
        );
        Ok(PushOutcome::Pushed(PushReport {
            stream: stream.clone(),
            head: plan.head,
            pack_key,
            previous_head: recorded,
            commits: plan.commits.len(),
            objects: plan.objects.len(),
            bytes: size,
        }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Download
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch every pack of `stream` into `graph`, then check out its head on
    /// the primary branch.
    pub async fn download_push<G: ObjectGraph + ?Sized>(
        &self,
        graph: &G,
        stream: &StreamRef,
    ) -> Result<DownloadReport> {
        let repo = self.require_repo(stream).await?;
        let head = self
            .ledger
            .head(&stream.repo, &stream.tag)
            .await?
            .ok_or_else(|| SyncError::StreamNotFound(stream.clone()))?;
        let secret = self.secret_for(&repo).await?;
        let store = open_blob_store(&repo.blob_store)?;

        let mut report = DownloadReport {
            head: Some(head),
            ..DownloadReport::default()
        };
        let mut visited = HashSet::new();
        let mut next = Some(head);

        while let Some(at) = next {
            if !visited.insert(at) {
                return Err(SyncError::BrokenChain {
                    stream: stream.clone(),
                    at,
                });
            }
            let record = self
                .ledger
                .push_record(&stream.repo, &stream.tag, &at)
                .await?
                .ok_or_else(|| SyncError::BrokenChain {
                    stream: stream.clone(),
                    at,
                })?;

            let fetched = store.get(&record.pack_key).await?;
            let pack = match (&record.envelope, &secret) {
                (None, _) => fetched.to_vec(),
                (Some(_), Some(secret)) => open(&fetched, secret)?,
                (Some(_), None) => return Err(SyncError::MissingKeys(stream.repo.clone())),
            };

            let indexed = graph.index_pack(&pack).await?;
            report.packs += 1;
            report.objects += indexed.objects;
            report.new_objects += indexed.new_objects;
            debug!(stream = %stream, head = %at.short_hex(), key = %record.pack_key, objects = indexed.objects, "indexed push");

            next = record.previous_head;
        }

        graph.write_ref(&self.config.primary_branch, &head).await?;
        graph.checkout(&self.config.primary_branch).await?;

        info!(stream = %stream, head = %head.short_hex(), packs = report.packs, "downloaded");
        Ok(report)
    }

    /// Create a working copy of `stream` at `dest`, which must not exist.
    ///
    /// A failed clone removes `dest` again.
    pub async fn clone<W: WorkingCopy>(&self, stream: &StreamRef, dest: &Path) -> Result<W> {
        if fs::try_exists(dest).await? {
            return Err(SyncError::DestinationExists(dest.to_path_buf()));
        }
        fs::create_dir_all(dest).await?;

        let result = async {
            let graph = W::init(dest).await?;
            self.download_push(&graph, stream).await?;
            Ok::<_, SyncError>(graph)
        }
        .await;

        if result.is_err() {
            if let Err(e) = fs::remove_dir_all(dest).await {
                warn!(path = %dest.display(), error = %e, "failed to remove partial clone");
            }
        } else {
            info!(stream = %stream, path = %dest.display(), "cloned");
        }
        result
    }

    /// Bring the existing working copy at `dest` up to date with `stream`.
    pub async fn pull<W: WorkingCopy>(&self, stream: &StreamRef, dest: &Path) -> Result<W> {
        if !fs::try_exists(dest).await? {
            return Err(SyncError::DestinationMissing(dest.to_path_buf()));
        }
        let graph = W::open(dest).await?;
        self.download_push(&graph, stream).await?;
        Ok(graph)
    }

    async fn require_repo(&self, stream: &StreamRef) -> Result<RepoRecord> {
        self.ledger
            .repo(&stream.repo)
            .await?
            .ok_or_else(|| SyncError::NotRegistered(stream.repo.clone()))
    }

    async fn secret_for(&self, repo: &RepoRecord) -> Result<Option<EncryptionKey>> {
        if !repo.private {
            return Ok(None);
        }
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| SyncError::MissingKeys(repo.name.clone()))?;
        let secret = self
            .custodian
            .resolve_secret(&repo.name, &self.principal, keys)
            .await?;
        Ok(Some(secret))
    }
}
