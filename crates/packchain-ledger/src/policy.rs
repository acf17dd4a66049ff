//! Authorization rules shared by every ledger backend.
//!
//! Backends load the [`RepoRecord`], run the matching check here, and only then
//! persist the change. A check never mutates anything.

use packchain_core::{Principal, PushRecord, RepoName, RepoRecord, Role, WrappedKeyRecord};

use crate::error::{LedgerError, Result};

/// Validate a registration request.
pub fn check_register(
    caller: &Principal,
    name: &RepoName,
    privacy: Option<&WrappedKeyRecord>,
) -> Result<()> {
    if let Some(wrapped) = privacy {
        check_wrapped_for(wrapped, caller, name)?;
    }
    Ok(())
}

/// Validate a push append against the repository's registration.
pub fn check_push(repo: &RepoRecord, caller: &Principal, record: &PushRecord) -> Result<()> {
    if !repo.can_push(caller) {
        return Err(not_authorized(caller, repo, "push"));
    }

    match (repo.private, record.envelope.is_some()) {
        (true, false) => Err(LedgerError::InvalidRecord(format!(
            "push to private repository {} must carry an envelope",
            repo.name
        ))),
        (false, true) => Err(LedgerError::InvalidRecord(format!(
            "push to public repository {} must not carry an envelope",
            repo.name
        ))),
        _ => Ok(()),
    }
}

/// Validate a membership grant.
pub fn check_grant(
    repo: &RepoRecord,
    caller: &Principal,
    member: &Principal,
    wrapped: Option<&WrappedKeyRecord>,
) -> Result<()> {
    if !repo.has_role(caller, Role::Owner) {
        return Err(not_authorized(caller, repo, "manage members"));
    }

    match (repo.private, wrapped) {
        (true, None) => Err(LedgerError::MissingKeyMaterial(repo.name.clone())),
        (true, Some(wrapped)) => check_wrapped_for(wrapped, member, &repo.name),
        (false, Some(_)) => Err(LedgerError::InvalidRecord(format!(
            "repository {} is public: wrapped keys are not accepted",
            repo.name
        ))),
        (false, None) => Ok(()),
    }
}

/// Validate a membership revocation.
pub fn check_revoke(
    repo: &RepoRecord,
    caller: &Principal,
    role: Role,
    member: &Principal,
) -> Result<()> {
    if !repo.has_role(caller, Role::Owner) {
        return Err(not_authorized(caller, repo, "manage members"));
    }
    if !repo.has_role(member, role) {
        return Err(LedgerError::NotAMember {
            principal: member.clone(),
            repo: repo.name.clone(),
            role,
        });
    }
    if role == Role::Owner && repo.owners.len() == 1 {
        return Err(LedgerError::LastOwner(repo.name.clone()));
    }
    Ok(())
}

fn check_wrapped_for(wrapped: &WrappedKeyRecord, member: &Principal, name: &RepoName) -> Result<()> {
    if &wrapped.principal != member {
        return Err(LedgerError::InvalidRecord(format!(
            "wrapped key on {} is addressed to {}, not {}",
            name, wrapped.principal, member
        )));
    }
    if wrapped.encrypted_secret.is_empty() {
        return Err(LedgerError::InvalidRecord(format!(
            "wrapped key for {} on {} is empty",
            member, name
        )));
    }
    Ok(())
}

fn not_authorized(caller: &Principal, repo: &RepoRecord, action: &'static str) -> LedgerError {
    LedgerError::NotAuthorized {
        principal: caller.clone(),
        repo: repo.name.clone(),
        action,
    }
}
