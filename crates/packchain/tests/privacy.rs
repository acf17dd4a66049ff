//! Private repositories: sealed packs and wrapped secrets.

use std::fs;

use packchain::graph::ObjectGraph;
use packchain::ledger::MemoryLedger;
use packchain::perms::PermsError;
use packchain::sync::{ErrorKind, SyncError};
use packchain::{Client, ClientConfig, ClientError, PushOutcome, RepoName, Tag};
use packchain_testkit::{multi_party, snapshot, Identity, Scratch};

const SECRET: &str = "launch code 0000";

fn client(scratch: &Scratch, identity: &Identity) -> Client<MemoryLedger> {
    let mut config = ClientConfig::new(identity.principal.clone());
    config.blob_store = scratch.blob_store();
    Client::new(scratch.ledger.clone(), config)
        .unwrap()
        .with_keys(identity.keys.clone())
}

async fn vault(scratch: &Scratch, owner: &Client<MemoryLedger>) -> PushOutcome {
    owner.register("vault", true).await.unwrap();
    let source = scratch.working_copy("source").await;
    source
        .commit(&snapshot(&[("plan.txt", SECRET)]), "plan")
        .await
        .unwrap();
    owner.push(scratch.dest("source"), "vault:master").await.unwrap()
}

#[tokio::test]
async fn stored_pack_is_sealed() {
    let scratch = Scratch::new();
    let parties = multi_party(&["alice"]);
    let alice = client(&scratch, &parties[0]);

    let PushOutcome::Pushed(report) = vault(&scratch, &alice).await else {
        panic!("expected a push");
    };
    let stored = fs::read(scratch.blob_dir().join(report.pack_key.as_str())).unwrap();
    assert!(!stored.windows(SECRET.len()).any(|w| w == SECRET.as_bytes()));

    let records = scratch
        .ledger
        .push_records(&RepoName::new("vault").unwrap(), &Tag::new("master").unwrap())
        .unwrap();
    assert!(records[0].envelope.is_some());

    let copy = alice.clone("vault:master", scratch.dest("copy")).await.unwrap();
    assert_eq!(copy.history_from("HEAD").await.unwrap().len(), 1);
    assert_eq!(
        fs::read_to_string(scratch.dest("copy").join("plan.txt")).unwrap(),
        SECRET
    );
}

#[tokio::test]
async fn principal_without_grant_cannot_read() {
    let scratch = Scratch::new();
    let parties = multi_party(&["alice", "bob"]);
    let alice = client(&scratch, &parties[0]);
    let bob = client(&scratch, &parties[1]);
    assert_ne!(alice.public_key(), bob.public_key());
    vault(&scratch, &alice).await;

    let err = bob.clone("vault:master", scratch.dest("bob")).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Sync(SyncError::Perms(PermsError::NoGrant { .. }))
    ));
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(!scratch.dest("bob").exists());
}

#[tokio::test]
async fn granted_reader_reads_until_revoked() {
    let scratch = Scratch::new();
    let parties = multi_party(&["alice", "bob"]);
    let alice = client(&scratch, &parties[0]);
    let bob = client(&scratch, &parties[1]);
    assert_ne!(alice.public_key(), bob.public_key());
    vault(&scratch, &alice).await;

    alice
        .add_reader("vault", bob.principal(), Some(&parties[1].public_key()))
        .await
        .unwrap();
    bob.clone("vault:master", scratch.dest("bob")).await.unwrap();
    assert_eq!(
        fs::read_to_string(scratch.dest("bob").join("plan.txt")).unwrap(),
        SECRET
    );

    alice.remove_reader("vault", bob.principal()).await.unwrap();
    let err = bob.clone("vault:master", scratch.dest("bob-again")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[tokio::test]
async fn granted_writer_pushes_sealed_packs() {
    let scratch = Scratch::new();
    let parties = multi_party(&["alice", "bob"]);
    let alice = client(&scratch, &parties[0]);
    let bob = client(&scratch, &parties[1]);
    assert_ne!(alice.public_key(), bob.public_key());
    vault(&scratch, &alice).await;

    alice
        .add_writer("vault", bob.principal(), Some(&parties[1].public_key()))
        .await
        .unwrap();
    let bob_copy = bob.clone("vault:master", scratch.dest("bob")).await.unwrap();
    bob_copy
        .commit(&snapshot(&[("plan.txt", "revised")]), "revise")
        .await
        .unwrap();
    assert!(bob.push(scratch.dest("bob"), "vault:master").await.unwrap().is_pushed());

    alice.pull("vault:master", scratch.dest("source")).await.unwrap();
    assert_eq!(
        fs::read_to_string(scratch.dest("source").join("plan.txt")).unwrap(),
        "revised"
    );
}

#[tokio::test]
async fn grant_wrapped_for_another_key_is_unusable() {
    let scratch = Scratch::new();
    let parties = multi_party(&["alice", "bob", "mallory"]);
    let alice = client(&scratch, &parties[0]);
    vault(&scratch, &alice).await;

    alice
        .add_reader("vault", &parties[1].principal, Some(&parties[2].public_key()))
        .await
        .unwrap();
    let bob = client(&scratch, &parties[1]);
    let err = bob.clone("vault:master", scratch.dest("bob")).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Sync(SyncError::Perms(PermsError::KeyUnavailable(_)))
    ));
    assert!(!scratch.dest("bob").exists());
}

#[tokio::test]
async fn private_grant_needs_member_key() {
    let scratch = Scratch::new();
    let parties = multi_party(&["alice", "bob"]);
    let alice = client(&scratch, &parties[0]);
    vault(&scratch, &alice).await;

    let err = alice
        .add_reader("vault", &parties[1].principal, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Perms(PermsError::KeyUnavailable(_))));
}

#[tokio::test]
async fn keyless_client_cannot_push_private() {
    let scratch = Scratch::new();
    let parties = multi_party(&["alice"]);
    let alice = client(&scratch, &parties[0]);
    vault(&scratch, &alice).await;

    let mut config = ClientConfig::new(parties[0].principal.clone());
    config.blob_store = scratch.blob_store();
    let keyless = Client::new(scratch.ledger.clone(), config).unwrap();

    let err = keyless.clone("vault:master", scratch.dest("copy")).await.unwrap_err();
    assert!(matches!(err, ClientError::Sync(SyncError::MissingKeys(_))));
}
