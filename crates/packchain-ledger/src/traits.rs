//! Ledger trait: the collaborator contract the sync engine talks to.
//!
//! Implementations enforce registration, membership and privacy; the engine
//! only reacts to the errors they report.

use async_trait::async_trait;
use packchain_core::{
    BlobStoreConfig, ObjectId, PackKey, Principal, PushRecord, RepoName, RepoRecord, Role, Tag,
    WrappedKeyRecord,
};

use crate::error::{LedgerError, Result};

/// The Ledger trait: linearizable read/append of small records.
///
/// # Design Notes
///
/// - Push records are addressed by `(repo, tag, head)`. Tags are independent,
///   so two streams of one repository may record the same head without clashing.
/// - `head` on an unknown repository fails with `NotRegistered`; on a known
///   repository with no pushes it returns `Ok(None)`.
/// - Every method that changes state takes the caller's principal, standing in
///   for the sender of a ledger transaction.
#[async_trait]
pub trait Ledger: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a repository with `caller` as its first owner.
    ///
    /// Passing `privacy` marks the repository private; the record must be the
    /// caller's own wrapped copy of the fresh secret.
    async fn register(
        &self,
        caller: &Principal,
        name: &RepoName,
        blob_store: &BlobStoreConfig,
        privacy: Option<WrappedKeyRecord>,
    ) -> Result<()>;

    /// Read a repository's registration.
    async fn repo(&self, name: &RepoName) -> Result<Option<RepoRecord>>;

    /// Whether the repository was registered private.
    async fn is_private(&self, name: &RepoName) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Push Records
    // ─────────────────────────────────────────────────────────────────────────

    /// The head of the stream's most recent push.
    async fn head(&self, name: &RepoName, tag: &Tag) -> Result<Option<ObjectId>>;

    /// The push record a stream recorded for `head`.
    async fn push_record(
        &self,
        name: &RepoName,
        tag: &Tag,
        head: &ObjectId,
    ) -> Result<Option<PushRecord>>;

    /// Append a push record and advance the stream head to `record.head`.
    async fn append_push(
        &self,
        caller: &Principal,
        name: &RepoName,
        record: &PushRecord,
    ) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Membership
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `role` to `member`. Private repositories require `wrapped`.
    async fn add_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
        wrapped: Option<WrappedKeyRecord>,
    ) -> Result<()>;

    /// Revoke `role` from `member`.
    ///
    /// When the member is left with no role, its wrapped key record is
    /// dropped. The repository secret itself is not rotated.
    async fn remove_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
    ) -> Result<()>;

    /// List the principals holding `role`.
    async fn members(&self, name: &RepoName, role: Role) -> Result<Vec<Principal>>;

    /// The principal's wrapped copy of the repository secret, if granted.
    async fn wrapped_secret_for(
        &self,
        name: &RepoName,
        principal: &Principal,
    ) -> Result<Option<WrappedKeyRecord>>;
}

/// Named convenience operations over any [`Ledger`].
#[async_trait]
pub trait LedgerExt: Ledger {
    /// The pack key recorded for the push whose head is `sha`.
    async fn pack_key_for(&self, name: &RepoName, tag: &Tag, sha: &ObjectId) -> Result<PackKey> {
        self.push_record(name, tag, sha)
            .await?
            .map(|record| record.pack_key)
            .ok_or_else(|| missing_push(name, tag, sha))
    }

    /// The head of the push preceding the one whose head is `sha`.
    async fn previous_head(
        &self,
        name: &RepoName,
        tag: &Tag,
        sha: &ObjectId,
    ) -> Result<Option<ObjectId>> {
        self.push_record(name, tag, sha)
            .await?
            .map(|record| record.previous_head)
            .ok_or_else(|| missing_push(name, tag, sha))
    }

    async fn add_owner(
        &self,
        caller: &Principal,
        name: &RepoName,
        owner: &Principal,
        wrapped: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        self.add_member(caller, name, Role::Owner, owner, wrapped).await
    }

    async fn remove_owner(&self, caller: &Principal, name: &RepoName, owner: &Principal) -> Result<()> {
        self.remove_member(caller, name, Role::Owner, owner).await
    }

    async fn add_writer(
        &self,
        caller: &Principal,
        name: &RepoName,
        writer: &Principal,
        wrapped: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        self.add_member(caller, name, Role::Writer, writer, wrapped).await
    }

    async fn remove_writer(&self, caller: &Principal, name: &RepoName, writer: &Principal) -> Result<()> {
        self.remove_member(caller, name, Role::Writer, writer).await
    }

    async fn add_reader(
        &self,
        caller: &Principal,
        name: &RepoName,
        reader: &Principal,
        wrapped: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        self.add_member(caller, name, Role::Reader, reader, wrapped).await
    }

    async fn remove_reader(&self, caller: &Principal, name: &RepoName, reader: &Principal) -> Result<()> {
        self.remove_member(caller, name, Role::Reader, reader).await
    }
}

impl<L: Ledger + ?Sized> LedgerExt for L {}

fn missing_push(name: &RepoName, tag: &Tag, sha: &ObjectId) -> LedgerError {
    LedgerError::InvalidData(format!(
        "no push record for {}:{} at {}",
        name,
        tag,
        sha.short_hex()
    ))
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for std::sync::Arc<L> {
    async fn register(
        &self,
        caller: &Principal,
        name: &RepoName,
        blob_store: &BlobStoreConfig,
        privacy: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        (**self).register(caller, name, blob_store, privacy).await
    }

    async fn repo(&self, name: &RepoName) -> Result<Option<RepoRecord>> {
        (**self).repo(name).await
    }

    async fn is_private(&self, name: &RepoName) -> Result<bool> {
        (**self).is_private(name).await
    }

    async fn head(&self, name: &RepoName, tag: &Tag) -> Result<Option<ObjectId>> {
        (**self).head(name, tag).await
    }

    async fn push_record(
        &self,
        name: &RepoName,
        tag: &Tag,
        head: &ObjectId,
    ) -> Result<Option<PushRecord>> {
        (**self).push_record(name, tag, head).await
    }

    async fn append_push(
        &self,
        caller: &Principal,
        name: &RepoName,
        record: &PushRecord,
    ) -> Result<()> {
        (**self).append_push(caller, name, record).await
    }

    async fn add_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
        wrapped: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        (**self).add_member(caller, name, role, member, wrapped).await
    }

    async fn remove_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
    ) -> Result<()> {
        (**self).remove_member(caller, name, role, member).await
    }

    async fn members(&self, name: &RepoName, role: Role) -> Result<Vec<Principal>> {
        (**self).members(name, role).await
    }

    async fn wrapped_secret_for(
        &self,
        name: &RepoName,
        principal: &Principal,
    ) -> Result<Option<WrappedKeyRecord>> {
        (**self).wrapped_secret_for(name, principal).await
    }
}
