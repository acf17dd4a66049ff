//! Records the ledger keeps about repositories, pushes and key grants.
//!
//! The ledger never stores object bytes. What it holds is small: a repository's
//! registration, one [`PushRecord`] per synchronization point, and for private
//! repositories one [`WrappedKeyRecord`] per authorized principal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::blobstore::BlobStoreConfig;
use crate::names::{RepoName, Tag};
use crate::types::{ObjectId, PackKey, Principal};

/// A membership role on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages membership in every role; may push.
    Owner,
    /// May push.
    Writer,
    /// May read a private repository's content.
    Reader,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Owner, Role::Writer, Role::Reader];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Writer => "writer",
            Role::Reader => "reader",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Role::Owner),
            "writer" => Some(Role::Writer),
            "reader" => Some(Role::Reader),
            _ => None,
        }
    }

    /// Whether this role permits appending push records.
    pub fn can_push(&self) -> bool {
        matches!(self, Role::Owner | Role::Writer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope format identifier recorded with a sealed pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EnvelopeFormat {
    /// ChaCha20-Poly1305, 256-bit key, random 96-bit nonce per envelope.
    ChaCha20Poly1305 = 1,
}

impl EnvelopeFormat {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(EnvelopeFormat::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// Describes how a pack was sealed, so readers know how to open it.
///
/// Absent on pushes to public repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub format: EnvelopeFormat,
}

/// One synchronization point of a stream.
///
/// Pushes for a stream form a singly linked list, newest-first, keyed by
/// `head`; following `previous_head` reconstructs the full history. A record
/// is created exactly once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRecord {
    /// The stream tag this push belongs to.
    pub tag: Tag,
    /// Content id of the newest commit included in the pack.
    pub head: ObjectId,
    /// Blob-store key of the pack produced by this push.
    pub pack_key: PackKey,
    /// `head` of the preceding push for the same stream, `None` for the first.
    pub previous_head: Option<ObjectId>,
    /// Envelope used to seal the pack, if the repository is private.
    pub envelope: Option<EnvelopeMeta>,
}

impl PushRecord {
    pub fn is_first(&self) -> bool {
        self.previous_head.is_none()
    }
}

/// Registration data for a repository.
///
/// `blob_store` is fixed at registration and is the only source a reader has
/// for where pack bytes are fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub name: RepoName,
    pub private: bool,
    pub blob_store: BlobStoreConfig,
    pub owners: BTreeSet<Principal>,
    pub writers: BTreeSet<Principal>,
    pub readers: BTreeSet<Principal>,
}

impl RepoRecord {
    /// A fresh registration with `owner` as the only member.
    pub fn new(name: RepoName, blob_store: BlobStoreConfig, private: bool, owner: Principal) -> Self {
        let mut owners = BTreeSet::new();
        owners.insert(owner);
        Self {
            name,
            private,
            blob_store,
            owners,
            writers: BTreeSet::new(),
            readers: BTreeSet::new(),
        }
    }

    pub fn members(&self, role: Role) -> &BTreeSet<Principal> {
        match role {
            Role::Owner => &self.owners,
            Role::Writer => &self.writers,
            Role::Reader => &self.readers,
        }
    }

    pub fn members_mut(&mut self, role: Role) -> &mut BTreeSet<Principal> {
        match role {
            Role::Owner => &mut self.owners,
            Role::Writer => &mut self.writers,
            Role::Reader => &mut self.readers,
        }
    }

    pub fn has_role(&self, principal: &Principal, role: Role) -> bool {
        self.members(role).contains(principal)
    }

    pub fn can_push(&self, principal: &Principal) -> bool {
        Role::ALL
            .iter()
            .any(|role| role.can_push() && self.has_role(principal, *role))
    }

    /// Whether the principal holds any role at all.
    pub fn is_member(&self, principal: &Principal) -> bool {
        Role::ALL.iter().any(|role| self.has_role(principal, *role))
    }
}

/// A principal's copy of a private repository's symmetric secret.
///
/// `encrypted_secret` is the secret wrapped under `public_key`; its encoding
/// belongs to the key custodian and is opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKeyRecord {
    pub principal: Principal,
    pub public_key: [u8; 32],
    pub encrypted_secret: Vec<u8>,
}
