//! Wrapping a repository secret for one recipient.
//!
//! The sender generates an ephemeral X25519 key, agrees a shared secret with
//! the recipient's public key, derives a wrapping key bound to the repository
//! name, and encrypts the secret with it.

use packchain_core::RepoName;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    EncryptionKey, EncryptionNonce, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret,
};
use crate::error::{PermsError, Result};

/// A repository secret wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    /// Sender's side of the ECDH.
    pub ephemeral_public: X25519PublicKey,

    /// The secret, encrypted under the derived wrapping key.
    pub encrypted_key: Vec<u8>,

    pub nonce: EncryptionNonce,
}

impl KeyShare {
    /// Wrap `secret` so only the holder of `recipient_public`'s secret key can open it.
    pub fn wrap(
        secret: &EncryptionKey,
        recipient_public: &X25519PublicKey,
        repo: &RepoName,
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let wrap_key = ephemeral
            .diffie_hellman(recipient_public)
            .derive_encryption_key(repo.as_str().as_bytes());

        let nonce = EncryptionNonce::generate();
        let encrypted_key = wrap_key.encrypt(secret.as_bytes(), &nonce)?;

        Ok(Self {
            ephemeral_public,
            encrypted_key,
            nonce,
        })
    }

    /// Recover the secret with the recipient's secret key.
    pub fn unwrap(&self, recipient_secret: &X25519StaticSecret, repo: &RepoName) -> Result<EncryptionKey> {
        let wrap_key = recipient_secret
            .diffie_hellman(&self.ephemeral_public)
            .derive_encryption_key(repo.as_str().as_bytes());

        let key_bytes = wrap_key.decrypt(&self.encrypted_key, &self.nonce)?;
        let key_bytes: [u8; 32] = key_bytes.try_into().map_err(|bytes: Vec<u8>| {
            PermsError::DecryptionError(format!(
                "invalid key length: expected 32, got {}",
                bytes.len()
            ))
        })?;

        Ok(EncryptionKey::from_bytes(key_bytes))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::SerializationError(e.to_string()))
    }
}
