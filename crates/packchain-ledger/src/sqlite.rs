//! SQLite implementation of the Ledger trait.
//!
//! A single-node development ledger. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use packchain_core::{
    BlobStoreConfig, EnvelopeFormat, EnvelopeMeta, ObjectId, PackKey, Principal, PushRecord,
    RepoName, RepoRecord, Role, Tag, WrappedKeyRecord,
};

use crate::error::{LedgerError, Result};
use crate::migration::{self, now_millis};
use crate::policy;
use crate::traits::Ledger;

/// SQLite-backed ledger.
///
/// Thread-safe via internal Mutex. Every call runs on the blocking pool.
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open a ledger database at the given path, creating and migrating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory ledger. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| LedgerError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| LedgerError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn load_repo(conn: &Connection, name: &RepoName) -> Result<Option<RepoRecord>> {
    let row: Option<(bool, String)> = conn
        .query_row(
            "SELECT private, blob_store FROM repos WHERE name = ?1",
            params![name.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((private, blob_store)) = row else {
        return Ok(None);
    };

    let mut record = RepoRecord {
        name: name.clone(),
        private,
        blob_store: BlobStoreConfig::from_json(&blob_store)?,
        owners: Default::default(),
        writers: Default::default(),
        readers: Default::default(),
    };

    let mut stmt = conn.prepare("SELECT role, principal FROM members WHERE repo = ?1")?;
    let rows = stmt
        .query_map(params![name.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for (role, principal) in rows {
        let role = Role::from_str_opt(&role)
            .ok_or_else(|| LedgerError::InvalidData(format!("unknown role: {}", role)))?;
        record.members_mut(role).insert(Principal::new(principal));
    }

    Ok(Some(record))
}

fn require_repo(conn: &Connection, name: &RepoName) -> Result<RepoRecord> {
    load_repo(conn, name)?.ok_or_else(|| LedgerError::NotRegistered(name.clone()))
}

fn require_registered(conn: &Connection, name: &RepoName) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM repos WHERE name = ?1)",
        params![name.as_str()],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(LedgerError::NotRegistered(name.clone()))
    }
}

fn object_id(bytes: Vec<u8>) -> Result<ObjectId> {
    Ok(ObjectId::try_from(bytes.as_slice())?)
}

fn upsert_wrapped(tx: &Transaction<'_>, name: &RepoName, wrapped: &WrappedKeyRecord) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO wrapped_keys (repo, principal, public_key, encrypted_secret)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            name.as_str(),
            wrapped.principal.as_str(),
            wrapped.public_key.as_slice(),
            wrapped.encrypted_secret,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn register(
        &self,
        caller: &Principal,
        name: &RepoName,
        blob_store: &BlobStoreConfig,
        privacy: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        policy::check_register(caller, name, privacy.as_ref())?;

        let caller = caller.clone();
        let name = name.clone();
        let blob_store = blob_store.to_json();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            if load_repo(&tx, &name)?.is_some() {
                return Err(LedgerError::AlreadyRegistered(name));
            }

            tx.execute(
                "INSERT INTO repos (name, private, blob_store, registered_at) VALUES (?1, ?2, ?3, ?4)",
                params![name.as_str(), privacy.is_some(), blob_store, now_millis()],
            )?;
            tx.execute(
                "INSERT INTO members (repo, role, principal) VALUES (?1, ?2, ?3)",
                params![name.as_str(), Role::Owner.as_str(), caller.as_str()],
            )?;
            if let Some(wrapped) = &privacy {
                upsert_wrapped(&tx, &name, wrapped)?;
            }
            tx.commit()?;

            debug!(repo = %name, owner = %caller, "registered repository");
            Ok(())
        })
        .await
    }

    async fn repo(&self, name: &RepoName) -> Result<Option<RepoRecord>> {
        let name = name.clone();
        self.run(move |conn| load_repo(conn, &name)).await
    }

    async fn is_private(&self, name: &RepoName) -> Result<bool> {
        let name = name.clone();
        self.run(move |conn| {
            conn.query_row(
                "SELECT private FROM repos WHERE name = ?1",
                params![name.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| LedgerError::NotRegistered(name.clone()))
        })
        .await
    }

    async fn head(&self, name: &RepoName, tag: &Tag) -> Result<Option<ObjectId>> {
        let name = name.clone();
        let tag = tag.clone();
        self.run(move |conn| {
            require_registered(conn, &name)?;
            let head: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT head FROM heads WHERE repo = ?1 AND tag = ?2",
                    params![name.as_str(), tag.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            head.map(object_id).transpose()
        })
        .await
    }

    async fn push_record(
        &self,
        name: &RepoName,
        tag: &Tag,
        head: &ObjectId,
    ) -> Result<Option<PushRecord>> {
        let name = name.clone();
        let tag = tag.clone();
        let head = *head;
        self.run(move |conn| {
            require_registered(conn, &name)?;
            let row: Option<(String, Option<Vec<u8>>, Option<u8>)> = conn
                .query_row(
                    "SELECT pack_key, previous_head, envelope FROM pushes
                     WHERE repo = ?1 AND tag = ?2 AND head = ?3",
                    params![name.as_str(), tag.as_str(), head.as_bytes().as_slice()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((pack_key, previous_head, envelope)) = row else {
                return Ok(None);
            };

            let envelope = envelope
                .map(|format| {
                    EnvelopeFormat::from_u8(format)
                        .map(|format| EnvelopeMeta { format })
                        .ok_or_else(|| {
                            LedgerError::InvalidData(format!("unknown envelope format: {}", format))
                        })
                })
                .transpose()?;

            Ok(Some(PushRecord {
                tag,
                head,
                pack_key: PackKey::new(pack_key),
                previous_head: previous_head.map(object_id).transpose()?,
                envelope,
            }))
        })
        .await
    }

    async fn append_push(
        &self,
        caller: &Principal,
        name: &RepoName,
        record: &PushRecord,
    ) -> Result<()> {
        let caller = caller.clone();
        let name = name.clone();
        let record = record.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            policy::check_push(&require_repo(&tx, &name)?, &caller, &record)?;

            let now = now_millis();
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO pushes
                    (repo, tag, head, pack_key, previous_head, envelope, pushed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    name.as_str(),
                    record.tag.as_str(),
                    record.head.as_bytes().as_slice(),
                    record.pack_key.as_str(),
                    record.previous_head.as_ref().map(|id| id.as_bytes().to_vec()),
                    record.envelope.map(|meta| meta.format.to_u8()),
                    now,
                ],
            )?;
            if inserted == 0 {
                return Err(LedgerError::InvalidRecord(format!(
                    "{}:{} already recorded a push at {}",
                    name,
                    record.tag,
                    record.head.short_hex()
                )));
            }

            tx.execute(
                "INSERT OR REPLACE INTO heads (repo, tag, head, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    name.as_str(),
                    record.tag.as_str(),
                    record.head.as_bytes().as_slice(),
                    now
                ],
            )?;
            tx.commit()?;

            debug!(repo = %name, tag = %record.tag, head = %record.head.short_hex(), "appended push");
            Ok(())
        })
        .await
    }

    async fn add_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
        wrapped: Option<WrappedKeyRecord>,
    ) -> Result<()> {
        let caller = caller.clone();
        let name = name.clone();
        let member = member.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            policy::check_grant(&require_repo(&tx, &name)?, &caller, &member, wrapped.as_ref())?;

            tx.execute(
                "INSERT OR IGNORE INTO members (repo, role, principal) VALUES (?1, ?2, ?3)",
                params![name.as_str(), role.as_str(), member.as_str()],
            )?;
            if let Some(wrapped) = &wrapped {
                upsert_wrapped(&tx, &name, wrapped)?;
            }
            tx.commit()?;

            debug!(repo = %name, member = %member, role = %role, "granted role");
            Ok(())
        })
        .await
    }

    async fn remove_member(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
    ) -> Result<()> {
        let caller = caller.clone();
        let name = name.clone();
        let member = member.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            policy::check_revoke(&require_repo(&tx, &name)?, &caller, role, &member)?;

            tx.execute(
                "DELETE FROM members WHERE repo = ?1 AND role = ?2 AND principal = ?3",
                params![name.as_str(), role.as_str(), member.as_str()],
            )?;
            tx.execute(
                "DELETE FROM wrapped_keys WHERE repo = ?1 AND principal = ?2
                 AND NOT EXISTS (SELECT 1 FROM members WHERE repo = ?1 AND principal = ?2)",
                params![name.as_str(), member.as_str()],
            )?;
            tx.commit()?;

            debug!(repo = %name, member = %member, role = %role, "revoked role");
            Ok(())
        })
        .await
    }

    async fn members(&self, name: &RepoName, role: Role) -> Result<Vec<Principal>> {
        let name = name.clone();
        self.run(move |conn| {
            require_registered(conn, &name)?;
            let mut stmt = conn.prepare(
                "SELECT principal FROM members WHERE repo = ?1 AND role = ?2 ORDER BY principal",
            )?;
            let members = stmt
                .query_map(params![name.as_str(), role.as_str()], |row| {
                    row.get::<_, String>(0)
                })?
                .map(|principal| principal.map(Principal::new))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(members)
        })
        .await
    }

    async fn wrapped_secret_for(
        &self,
        name: &RepoName,
        principal: &Principal,
    ) -> Result<Option<WrappedKeyRecord>> {
        let name = name.clone();
        let principal = principal.clone();
        self.run(move |conn| {
            require_registered(conn, &name)?;
            let row: Option<(Vec<u8>, Vec<u8>)> = conn
                .query_row(
                    "SELECT public_key, encrypted_secret FROM wrapped_keys
                     WHERE repo = ?1 AND principal = ?2",
                    params![name.as_str(), principal.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            row.map(|(public_key, encrypted_secret)| -> Result<WrappedKeyRecord> {
                let public_key: [u8; 32] = public_key.try_into().map_err(|bytes: Vec<u8>| {
                    LedgerError::InvalidData(format!(
                        "public key must be 32 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                Ok(WrappedKeyRecord {
                    principal,
                    public_key,
                    encrypted_secret,
                })
            })
            .transpose()
        })
        .await
    }
}
