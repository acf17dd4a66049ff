//! In-memory implementation of the Ledger trait.
//!
//! Same rules as the SQLite backend, no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use packchain_core::{
    BlobStoreConfig, ObjectId, Principal, PushRecord, RepoName, RepoRecord, Role, Tag,
    WrappedKeyRecord,
};

use crate::error::{LedgerError, Result};
use crate::policy;
use crate::traits::Ledger;

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

#[derive(Default)]
struct MemoryLedgerInner {
    repos: HashMap<RepoName, RepoRecord>,

    /// Current head per stream.
    heads: HashMap<(RepoName, Tag), ObjectId>,

    /// Push records by (repo, tag, head).
    pushes: HashMap<(RepoName, Tag, ObjectId), PushRecord>,

    /// Append order per stream, oldest first.
    log: HashMap<(RepoName, Tag), Vec<ObjectId>>,

    wrapped: HashMap<(RepoName, Principal), WrappedKeyRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner::default()),
        }
    }

    /// Every push record of a stream, in append order.
    pub fn push_records(&self, name: &RepoName, tag: &Tag) -> Result<Vec<PushRecord>> {
        let inner = self.read()?;
        let key = (name.clone(), tag.clone());
        Ok(inner
            .log
            .get(&key)
            .map(|heads| {
                heads
                    .iter()
                    .filter_map(|head| inner.pushes.get(&(name.clone(), tag.clone(), *head)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryLedgerInner>> {
        self.inner
            .read()
            .map_err(|e| LedgerError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryLedgerInner>> {
        self.inner
            .write()
            .map_err(|e| LedgerError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerInner {
    fn repo(&self, name: &RepoName) -> Result<&RepoRecord> {
        self.repos
            .get(name)
            .ok_or_else(|| LedgerError::NotRegistered(name.clone()))
    }

    fn repo_mut(&mut self, name: &RepoName) -> Result<&mut RepoRecord> {
        self.repos
            .get_mut(name)
            .ok_or_else(|| LedgerError::NotRegistered(name.clone()))
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn register(
        &self,
        caller: &Principal,
        name: &RepoName,
        blob_store: &BlobStoreConfig,
        privacy: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        policy::check_register(caller, name, privacy.as_ref())?;

        let mut inner = self.write()?;
        if inner.repos.contains_key(name) {
            return Err(LedgerError::AlreadyRegistered(name.clone()));
        }

        let record = RepoRecord::new(
            name.clone(),
            blob_store.clone(),
            privacy.is_some(),
            caller.clone(),
        );
        inner.repos.insert(name.clone(), record);
        if let Some(wrapped) = privacy {
            inner.wrapped.insert((name.clone(), caller.clone()), wrapped);
        }

        debug!(repo = %name, owner = %caller, "registered repository");
        Ok(())
    }

    async fn repo(&self, name: &RepoName) -> Result<Option<RepoRecord>> {
        Ok(self.read()?.repos.get(name).cloned())
    }

    async fn is_private(&self, name: &RepoName) -> Result<bool> {
        Ok(self.read()?.repo(name)?.private)
    }

    async fn head(&self, name: &RepoName, tag: &Tag) -> Result<Option<ObjectId>> {
        let inner = self.read()?;
        inner.repo(name)?;
        Ok(inner.heads.get(&(name.clone(), tag.clone())).copied())
    }

    async fn push_record(
        &self,
        name: &RepoName,
        tag: &Tag,
        head: &ObjectId,
    ) -> Result<Option<PushRecord>> {
        let inner = self.read()?;
        inner.repo(name)?;
        Ok(inner
            .pushes
            .get(&(name.clone(), tag.clone(), *head))
            .cloned())
    }

    async fn append_push(
        &self,
        caller: &Principal,
        name: &RepoName,
        record: &PushRecord,
    ) -> Result<()> {
        let mut inner = self.write()?;
        policy::check_push(inner.repo(name)?, caller, record)?;

        let key = (name.clone(), record.tag.clone(), record.head);
        if inner.pushes.contains_key(&key) {
            return Err(LedgerError::InvalidRecord(format!(
                "{}:{} already recorded a push at {}",
                name,
                record.tag,
                record.head.short_hex()
            )));
        }

        inner.pushes.insert(key, record.clone());
        inner
            .log
            .entry((name.clone(), record.tag.clone()))
            .or_default()
            .push(record.head);
        inner
            .heads
            .insert((name.clone(), record.tag.clone()), record.head);

        debug!(repo = %name, tag = %record.tag, head = %record.head.short_hex(), "appended push");
        Ok(())
    }

    async fn add_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
        wrapped: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        let mut inner = self.write()?;
        policy::check_grant(inner.repo(name)?, caller, member, wrapped.as_ref())?;

        inner.repo_mut(name)?.members_mut(role).insert(member.clone());
        if let Some(wrapped) = wrapped {
            inner.wrapped.insert((name.clone(), member.clone()), wrapped);
        }

        debug!(repo = %name, member = %member, role = %role, "granted role");
        Ok(())
    }

    async fn remove_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
    ) -> Result<()> {
        let mut inner = self.write()?;
        policy::check_revoke(inner.repo(name)?, caller, role, member)?;

        let repo = inner.repo_mut(name)?;
        repo.members_mut(role).remove(member);
        let still_member = repo.is_member(member);
        if !still_member {
            inner.wrapped.remove(&(name.clone(), member.clone()));
        }

        debug!(repo = %name, member = %member, role = %role, "revoked role");
        Ok(())
    }

    async fn members(&self, name: &RepoName, role: Role) -> Result<Vec<Principal>> {
        let inner = self.read()?;
        Ok(inner.repo(name)?.members(role).iter().cloned().collect())
    }

    async fn wrapped_secret_for(
        &self,
        name: &RepoName,
        principal: &Principal,
    ) -> Result<Option<WrappedKeyRecord>> {
        let inner = self.read()?;
        inner.repo(name)?;
        Ok(inner
            .wrapped
            .get(&(name.clone(), principal.clone()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LedgerExt;
    use packchain_core::PackKey;

    fn alice() -> Principal {
        Principal::from("alice")
    }

    fn repo() -> RepoName {
        RepoName::new("repo").unwrap()
    }

    fn master() -> Tag {
        Tag::new("master").unwrap()
    }

    fn push(head: u8, previous: Option<u8>) -> PushRecord {
        PushRecord {
            tag: master(),
            head: ObjectId::from_bytes([head; 32]),
            pack_key: PackKey::new(format!("pack-{}", head)),
            previous_head: previous.map(|p| ObjectId::from_bytes([p; 32])),
            envelope: None,
        }
    }

    async fn registered() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger
            .register(&alice(), &repo(), &BlobStoreConfig::Stub, None)
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_head_absent_then_advances() {
        let ledger = registered().await;
        assert_eq!(ledger.head(&repo(), &master()).await.unwrap(), None);

        ledger.append_push(&alice(), &repo(), &push(1, None)).await.unwrap();
        ledger.append_push(&alice(), &repo(), &push(2, Some(1))).await.unwrap();

        assert_eq!(
            ledger.head(&repo(), &master()).await.unwrap(),
            Some(ObjectId::from_bytes([2; 32]))
        );
        assert_eq!(
            ledger
                .previous_head(&repo(), &master(), &ObjectId::from_bytes([2; 32]))
                .await
                .unwrap(),
            Some(ObjectId::from_bytes([1; 32]))
        );
        assert_eq!(ledger.push_records(&repo(), &master()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_head_of_unknown_repo_fails() {
        let ledger = MemoryLedger::new();
        let err = ledger.head(&repo(), &master()).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn test_double_registration_rejected() {
        let ledger = registered().await;
        let err = ledger
            .register(&Principal::from("bob"), &repo(), &BlobStoreConfig::Stub, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_tags_are_independent() {
        let ledger = registered().await;
        ledger.append_push(&alice(), &repo(), &push(1, None)).await.unwrap();

        let mut other = push(1, None);
        other.tag = Tag::new("staging").unwrap();
        ledger.append_push(&alice(), &repo(), &other).await.unwrap();

        assert_eq!(
            ledger.head(&repo(), &Tag::new("staging").unwrap()).await.unwrap(),
            Some(ObjectId::from_bytes([1; 32]))
        );
    }

    #[tokio::test]
    async fn test_writer_pushes_after_grant() {
        let ledger = registered().await;
        let bob = Principal::from("bob");

        let err = ledger.append_push(&bob, &repo(), &push(1, None)).await.unwrap_err();
        assert!(err.is_authorization());

        ledger.add_writer(&alice(), &repo(), &bob, None).await.unwrap();
        ledger.append_push(&bob, &repo(), &push(1, None)).await.unwrap();

        ledger.remove_writer(&alice(), &repo(), &bob).await.unwrap();
        assert!(ledger.members(&repo(), Role::Writer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revocation_drops_wrapped_key() {
        let ledger = MemoryLedger::new();
        let wrapped = |p: &str| WrappedKeyRecord {
            principal: Principal::from(p),
            public_key: [0u8; 32],
            encrypted_secret: vec![9; 8],
        };
        ledger
            .register(&alice(), &repo(), &BlobStoreConfig::Stub, Some(wrapped("alice")))
            .await
            .unwrap();

        let bob = Principal::from("bob");
        ledger.add_reader(&alice(), &repo(), &bob, Some(wrapped("bob"))).await.unwrap();
        ledger.add_writer(&alice(), &repo(), &bob, Some(wrapped("bob"))).await.unwrap();

        ledger.remove_reader(&alice(), &repo(), &bob).await.unwrap();
        assert!(ledger.wrapped_secret_for(&repo(), &bob).await.unwrap().is_some());

        ledger.remove_writer(&alice(), &repo(), &bob).await.unwrap();
        assert!(ledger.wrapped_secret_for(&repo(), &bob).await.unwrap().is_none());
        assert!(ledger.wrapped_secret_for(&repo(), &alice()).await.unwrap().is_some());
    }
}
