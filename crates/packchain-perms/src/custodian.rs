//! Key custody for private repositories.
//!
//! The custodian is the only component that creates a repository secret, wraps
//! it for new members and unwraps it for the local principal. Raw secrets never
//! reach the ledger.

use std::sync::Arc;

use packchain_core::{BlobStoreConfig, Principal, RepoName, Role, WrappedKeyRecord};
use packchain_ledger::Ledger;
use tracing::{debug, info};

use crate::crypto::{EncryptionKey, X25519PublicKey};
use crate::error::{PermsError, Result};
use crate::keys::KeyPair;
use crate::keyshare::KeyShare;

/// Manages a private repository's symmetric secret through the ledger.
pub struct KeyCustodian<L> {
    ledger: Arc<L>,
}

impl<L> Clone for KeyCustodian<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<L: Ledger> KeyCustodian<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Register `name` as private with a fresh secret wrapped for `owner_keys`.
    pub async fn register_private(
        &self,
        owner: &Principal,
        owner_keys: &KeyPair,
        name: &RepoName,
        blob_store: &BlobStoreConfig,
    ) -> Result<EncryptionKey> {
        let secret = EncryptionKey::generate();
        let wrapped = wrap_for(&secret, owner, &owner_keys.public_key(), name)?;

        self.ledger
            .register(owner, name, blob_store, Some(wrapped))
            .await?;

        info!(repo = %name, owner = %owner, "registered private repository");
        Ok(secret)
    }

    /// Grant `role` to `member`.
    ///
    /// On a private repository the caller's own copy of the secret is resolved
    /// with `caller_keys` and re-wrapped for `member_public`. On a public one
    /// no key material is involved and both may be `None`.
    pub async fn grant(
        &self,
        caller: &Principal,
        caller_keys: Option<&KeyPair>,
        name: &RepoName,
        role: Role,
        member: &Principal,
        member_public: Option<&X25519PublicKey>,
    ) -> Result<()> {
        let wrapped = if self.ledger.is_private(name).await? {
            let keys = caller_keys.ok_or_else(|| {
                PermsError::KeyUnavailable(format!(
                    "{} needs its key pair to share the secret of {}",
                    caller, name
                ))
            })?;
            let member_public = member_public.ok_or_else(|| {
                PermsError::KeyUnavailable(format!(
                    "no public key supplied for {} on private repository {}",
                    member, name
                ))
            })?;

            let secret = self.resolve_secret(name, caller, keys).await?;
            Some(wrap_for(&secret, member, member_public, name)?)
        } else {
            None
        };

        self.ledger
            .add_member(caller, name, role, member, wrapped)
            .await?;
        debug!(repo = %name, member = %member, role = %role, "granted");
        Ok(())
    }

    /// Revoke `role` from `member`. The secret is not rotated.
    pub async fn revoke(
        &self,
        caller: &Principal,
        name: &RepoName,
        role: Role,
        member: &Principal,
    ) -> Result<()> {
        self.ledger.remove_member(caller, name, role, member).await?;
        debug!(repo = %name, member = %member, role = %role, "revoked");
        Ok(())
    }

    /// Unwrap the repository secret for `principal`.
    pub async fn resolve_secret(
        &self,
        name: &RepoName,
        principal: &Principal,
        keys: &KeyPair,
    ) -> Result<EncryptionKey> {
        let record = self
            .ledger
            .wrapped_secret_for(name, principal)
            .await?
            .ok_or_else(|| PermsError::NoGrant {
                principal: principal.clone(),
                repo: name.clone(),
            })?;

        if record.public_key != *keys.public_key().as_bytes() {
            return Err(PermsError::KeyUnavailable(format!(
                "secret of {} is wrapped for a different key than {}'s local key pair",
                name, principal
            )));
        }

        KeyShare::from_bytes(&record.encrypted_secret)
            .map_err(|e| PermsError::DecryptionError(e.to_string()))?
            .unwrap(keys.secret(), name)
    }
}

fn wrap_for(
    secret: &EncryptionKey,
    member: &Principal,
    member_public: &X25519PublicKey,
    name: &RepoName,
) -> Result<WrappedKeyRecord> {
    let share = KeyShare::wrap(secret, member_public, name)?;
    Ok(WrappedKeyRecord {
        principal: member.clone(),
        public_key: *member_public.as_bytes(),
        encrypted_secret: share.to_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use packchain_ledger::{LedgerError, MemoryLedger};

    struct Setup {
        custodian: KeyCustodian<MemoryLedger>,
        alice: Principal,
        alice_keys: KeyPair,
        repo: RepoName,
        secret: EncryptionKey,
    }

    async fn setup() -> Setup {
        let custodian = KeyCustodian::new(Arc::new(MemoryLedger::new()));
        let alice = Principal::from("alice");
        let alice_keys = KeyPair::generate();
        let repo = RepoName::new("secret-site").unwrap();
        let secret = custodian
            .register_private(&alice, &alice_keys, &repo, &BlobStoreConfig::Stub)
            .await
            .unwrap();
        Setup {
            custodian,
            alice,
            alice_keys,
            repo,
            secret,
        }
    }

    #[tokio::test]
    async fn test_owner_resolves_registered_secret() {
        let s = setup().await;
        let resolved = s
            .custodian
            .resolve_secret(&s.repo, &s.alice, &s.alice_keys)
            .await
            .unwrap();
        assert_eq!(resolved, s.secret);
    }

    #[tokio::test]
    async fn test_granted_reader_resolves_same_secret() {
        let s = setup().await;
        let bob = Principal::from("bob");
        let bob_keys = KeyPair::generate();

        s.custodian
            .grant(
                &s.alice,
                Some(&s.alice_keys),
                &s.repo,
                Role::Reader,
                &bob,
                Some(&bob_keys.public_key()),
            )
            .await
            .unwrap();

        let resolved = s.custodian.resolve_secret(&s.repo, &bob, &bob_keys).await.unwrap();
        assert_eq!(resolved, s.secret);
    }

    #[tokio::test]
    async fn test_ungranted_principal_gets_no_grant() {
        let s = setup().await;
        let err = s
            .custodian
            .resolve_secret(&s.repo, &Principal::from("mallory"), &KeyPair::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, PermsError::NoGrant { .. }));
    }

    #[tokio::test]
    async fn test_wrong_local_key_is_unavailable() {
        let s = setup().await;
        let err = s
            .custodian
            .resolve_secret(&s.repo, &s.alice, &KeyPair::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, PermsError::KeyUnavailable(_)));
    }

    #[tokio::test]
    async fn test_revoked_reader_loses_grant() {
        let s = setup().await;
        let bob = Principal::from("bob");
        let bob_keys = KeyPair::generate();
        s.custodian
            .grant(&s.alice, Some(&s.alice_keys), &s.repo, Role::Reader, &bob, Some(&bob_keys.public_key()))
            .await
            .unwrap();

        s.custodian.revoke(&s.alice, &s.repo, Role::Reader, &bob).await.unwrap();

        let err = s.custodian.resolve_secret(&s.repo, &bob, &bob_keys).await.unwrap_err();
        assert!(matches!(err, PermsError::NoGrant { .. }));
    }

    #[tokio::test]
    async fn test_grant_without_member_key_fails() {
        let s = setup().await;
        let err = s
            .custodian
            .grant(&s.alice, Some(&s.alice_keys), &s.repo, Role::Writer, &Principal::from("bob"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PermsError::KeyUnavailable(_)));
    }

    #[tokio::test]
    async fn test_public_grant_needs_no_keys() {
        let custodian = KeyCustodian::new(Arc::new(MemoryLedger::new()));
        let alice = Principal::from("alice");
        let repo = RepoName::new("public-site").unwrap();
        custodian
            .ledger
            .register(&alice, &repo, &BlobStoreConfig::Stub, None)
            .await
            .unwrap();

        custodian
            .grant(&alice, None, &repo, Role::Writer, &Principal::from("bob"), None)
            .await
            .unwrap();

        let err = custodian
            .grant(&Principal::from("bob"), None, &repo, Role::Writer, &Principal::from("carol"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PermsError::Ledger(LedgerError::NotAuthorized { .. })
        ));
    }
}
