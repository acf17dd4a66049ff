//! A principal's X25519 identity and its on-disk form.
//!
//! `save(path)` writes two files: `path` holds the secret key and `path.pub`
//! the public key, each as a single line of hex.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::crypto::{decode_32, X25519PublicKey, X25519StaticSecret};
use crate::error::Result;

/// An X25519 key pair used to receive wrapped repository secrets.
#[derive(Clone)]
pub struct KeyPair {
    secret: X25519StaticSecret,
    public: X25519PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_secret(X25519StaticSecret::generate())
    }

    pub fn from_secret(secret: X25519StaticSecret) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn secret(&self) -> &X25519StaticSecret {
        &self.secret
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Write `path` (secret) and `path.pub` (public).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        write_secret_file(path, &format!("{}\n", hex::encode(self.secret.to_bytes())))?;
        fs::write(public_path(path), format!("{}\n", self.public.to_hex()))?;

        debug!(path = %path.display(), "saved key pair");
        Ok(())
    }

    /// Read a key pair written by [`KeyPair::save`]. Only the secret file is needed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(Self::from_secret(X25519StaticSecret::from_bytes(decode_32(&contents)?)))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public.to_hex())
            .finish_non_exhaustive()
    }
}

/// Read a public key from a `.pub` file.
pub fn load_public_key(path: impl AsRef<Path>) -> Result<X25519PublicKey> {
    let contents = fs::read_to_string(path.as_ref())?;
    X25519PublicKey::from_hex(&contents)
}

/// `path` with `.pub` appended to its file name.
pub fn public_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".pub");
    PathBuf::from(name)
}

#[cfg(unix)]
fn write_secret_file(path: &Path, contents: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_secret_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys").join("alice");

        let pair = KeyPair::generate();
        pair.save(&path).unwrap();

        let loaded = KeyPair::load(&path).unwrap();
        assert_eq!(loaded.public_key(), pair.public_key());
        assert_eq!(load_public_key(public_path(&path)).unwrap(), pair.public_key());
        assert!(dir.path().join("keys").join("alice.pub").exists());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad");
        fs::write(&path, "not hex").unwrap();

        assert!(KeyPair::load(&path).is_err());
    }
}
