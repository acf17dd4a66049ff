//! Sealed pack envelope.
//!
//! A private repository's pack is uploaded as the CBOR encoding of an
//! [`Envelope`]: the format tag, a fresh nonce and the authenticated ciphertext.

use packchain_core::{EnvelopeFormat, EnvelopeMeta};
use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptionKey, EncryptionNonce};
use crate::error::{PermsError, Result};

/// An encrypted pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub format: EnvelopeFormat,

    /// Unique per seal.
    pub nonce: EncryptionNonce,

    /// The sealed bytes, authentication tag included.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            format: EnvelopeFormat::ChaCha20Poly1305,
            nonce,
            ciphertext,
        })
    }

    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        match self.format {
            EnvelopeFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce),
        }
    }

    /// The descriptor recorded in the push record.
    pub fn meta(&self) -> EnvelopeMeta {
        EnvelopeMeta {
            format: self.format,
        }
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

/// Seal `plaintext` under a repository secret, returning the bytes to upload.
pub fn seal(plaintext: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    Ok(Envelope::encrypt(plaintext, key)?.to_bytes())
}

/// Open bytes produced by [`seal`].
///
/// A wrong key, a tampered ciphertext and bytes that are not an envelope at
/// all are all reported as [`PermsError::DecryptionError`].
pub fn open(sealed: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let envelope = Envelope::from_bytes(sealed)
        .map_err(|e| PermsError::DecryptionError(format!("not a sealed pack: {}", e)))?;
    envelope.decrypt(key)
}
