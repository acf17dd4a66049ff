//! # Packchain Perms
//!
//! Content privacy for private repositories.
//!
//! ## Overview
//!
//! A private repository has one symmetric secret. Every pack pushed to it is
//! sealed under that secret before it leaves the machine, and every authorized
//! principal holds a copy of the secret wrapped under its own X25519 public key.
//! Only wrapped copies ever reach the ledger.
//!
//! - [`Envelope`] / [`seal`] / [`open`] - ChaCha20-Poly1305 sealing of pack bytes
//! - [`KeyShare`] - The secret wrapped for one recipient via ephemeral ECDH
//! - [`KeyPair`] - A principal's X25519 identity, persisted as hex files
//! - [`KeyCustodian`] - Creates, grants, revokes and resolves the secret through the ledger
//!
//! ## Design Notes
//!
//! - **Fresh nonce per seal**: identical packs sealed twice produce different bytes
//! - **Revocation does not rotate**: a revoked principal loses its wrapped copy but
//!   anything it already downloaded stays readable to it
//! - **Metadata stays public**: tags, heads and pack keys are never sealed

pub mod crypto;
pub mod custodian;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod keyshare;

pub use crypto::{
    EncryptionKey, EncryptionNonce, EphemeralKeyPair, SharedKey, X25519PublicKey,
    X25519StaticSecret,
};
pub use custodian::KeyCustodian;
pub use envelope::{open, seal, Envelope};
pub use error::{PermsError, Result};
pub use keys::{load_public_key, public_path, KeyPair};
pub use keyshare::KeyShare;
