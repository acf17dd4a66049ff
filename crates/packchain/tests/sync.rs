//! Round trips through a ledger and a local blob store.

use std::fs;

use packchain::graph::{FsObjectGraph, ObjectGraph, WorkingCopy};
use packchain::ledger::{Ledger, MemoryLedger};
use packchain::sync::{ErrorKind, SyncError};
use packchain::{Client, ClientConfig, ClientError, ObjectId, PushOutcome, RepoName, Tag};
use packchain_testkit::{linear_history, merge_history, snapshot, Scratch};

fn client(scratch: &Scratch, who: &str) -> Client<MemoryLedger> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut config = ClientConfig::new(who);
    config.blob_store = scratch.blob_store();
    Client::new(scratch.ledger.clone(), config).unwrap()
}

async fn history_ids(graph: &FsObjectGraph) -> Vec<ObjectId> {
    graph
        .history_from("HEAD")
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect()
}

fn records(scratch: &Scratch) -> Vec<packchain::core::PushRecord> {
    scratch
        .ledger
        .push_records(&RepoName::new("site").unwrap(), &Tag::new("master").unwrap())
        .unwrap()
}

#[tokio::test]
async fn push_twice_writes_once() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");
    alice.register("site", false).await.unwrap();

    let source = scratch.working_copy("source").await;
    let ids = linear_history(&source, 2).await.unwrap();

    let first = alice.push(scratch.dest("source"), "site:master").await.unwrap();
    assert!(first.is_pushed());
    assert_eq!(scratch.blob_count(), 1);

    let second = alice.push(scratch.dest("source"), "site:master").await.unwrap();
    assert_eq!(second, PushOutcome::NothingToPush { head: Some(ids[1]) });
    assert_eq!(scratch.blob_count(), 1);
    assert_eq!(records(&scratch).len(), 1);
}

#[tokio::test]
async fn clone_reproduces_history_and_files() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");
    alice.register("site", false).await.unwrap();

    let source = scratch.working_copy("source").await;
    let ids = linear_history(&source, 3).await.unwrap();
    alice.push(scratch.dest("source"), "site:master").await.unwrap();

    let copy = alice.clone("site:master", scratch.dest("copy")).await.unwrap();
    assert_eq!(history_ids(&copy).await, ids);
    assert_eq!(alice.head("site:master").await.unwrap(), Some(ids[2]));

    let dest = scratch.dest("copy");
    assert_eq!(fs::read_to_string(dest.join("README")).unwrap(), "revision 2\n");
    for i in 0..3 {
        assert_eq!(
            fs::read_to_string(dest.join(format!("notes/rev-{}.txt", i))).unwrap(),
            format!("note {}\n", i)
        );
    }
}

#[tokio::test]
async fn incremental_pushes_chain_and_pull_catches_up() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");
    alice.register("site", false).await.unwrap();

    let source = scratch.working_copy("source").await;
    let mut ids = linear_history(&source, 2).await.unwrap();
    alice.push(scratch.dest("source"), "site:master").await.unwrap();
    alice.clone("site:master", scratch.dest("copy")).await.unwrap();

    ids.push(
        source
            .commit(&snapshot(&[("README", "c"), ("keep.txt", "k")]), "c")
            .await
            .unwrap(),
    );
    ids.push(source.commit(&snapshot(&[("README", "d")]), "d").await.unwrap());
    let PushOutcome::Pushed(report) = alice.push(scratch.dest("source"), "site:master").await.unwrap()
    else {
        panic!("expected a push");
    };
    assert_eq!(report.commits, 2);

    let chain = records(&scratch);
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].previous_head, None);
    assert_eq!(chain[1].previous_head, Some(chain[0].head));
    assert_eq!(chain[1].head, ids[3]);

    let copy = alice.pull("site:master", scratch.dest("copy")).await.unwrap();
    assert_eq!(history_ids(&copy).await, ids);

    let dest = scratch.dest("copy");
    assert_eq!(fs::read_to_string(dest.join("README")).unwrap(), "d");
    assert!(!dest.join("keep.txt").exists());
    assert!(!dest.join("notes/rev-0.txt").exists());
}

#[tokio::test]
async fn merge_history_round_trips() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");
    alice.register("site", false).await.unwrap();

    let source = scratch.working_copy("source").await;
    let merge = merge_history(&source).await.unwrap();
    alice.push(scratch.dest("source"), "site:master").await.unwrap();

    let copy = alice.clone("site:master", scratch.dest("copy")).await.unwrap();
    let ids = history_ids(&copy).await;
    assert_eq!(ids, history_ids(&source).await);
    for id in [merge.base, merge.left, merge.right] {
        assert!(ids.contains(&id));
    }
    assert_eq!(ids.last(), Some(&merge.merge));

    let dest = scratch.dest("copy");
    assert_eq!(fs::read_to_string(dest.join("left")).unwrap(), "l");
    assert_eq!(fs::read_to_string(dest.join("right")).unwrap(), "r");
}

#[tokio::test]
async fn bare_repositories_push_and_pull() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");
    alice.register("site", false).await.unwrap();

    let source = FsObjectGraph::init_bare(&scratch.dest("source.bare")).await.unwrap();
    let ids = linear_history(&source, 2).await.unwrap();
    assert!(alice.push(scratch.dest("source.bare"), "site:master").await.unwrap().is_pushed());

    let mirror = FsObjectGraph::init_bare(&scratch.dest("mirror")).await.unwrap();
    assert!(mirror.is_bare());
    let mirror = alice.pull("site:master", scratch.dest("mirror")).await.unwrap();
    assert!(mirror.is_bare());
    assert_eq!(mirror.resolve_ref("refs/heads/master").await.unwrap(), Some(ids[1]));
    assert_eq!(history_ids(&mirror).await, ids);

    let dest = scratch.dest("mirror");
    assert!(!dest.join("README").exists());
    assert!(!dest.join("notes").exists());
    assert!(!dest.join(".packchain").exists());
}

#[tokio::test]
async fn writer_extends_owner_stream() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");
    let bob = client(&scratch, "bob");
    alice.register("site", false).await.unwrap();

    let source = scratch.working_copy("source").await;
    linear_history(&source, 1).await.unwrap();
    alice.push(scratch.dest("source"), "site:master").await.unwrap();

    bob.clone("site:master", scratch.dest("bob")).await.unwrap();
    let bob_copy = FsObjectGraph::open(&scratch.dest("bob")).await.unwrap();
    bob_copy
        .commit(&snapshot(&[("README", "from bob")]), "bob")
        .await
        .unwrap();

    let err = bob.push(scratch.dest("bob"), "site:master").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(scratch.blob_count(), 1);

    alice.add_writer("site", bob.principal(), None).await.unwrap();
    assert!(bob.push(scratch.dest("bob"), "site:master").await.unwrap().is_pushed());

    alice.pull("site:master", scratch.dest("source")).await.unwrap();
    assert_eq!(
        fs::read_to_string(scratch.dest("source").join("README")).unwrap(),
        "from bob"
    );
}

#[tokio::test]
async fn names_with_separator_are_rejected() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");

    let err = alice.register("a:b", false).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(scratch.ledger.repo(&RepoName::new("a").unwrap()).await.unwrap().is_none());

    alice.register("site", false).await.unwrap();
    let source = scratch.working_copy("source").await;
    linear_history(&source, 1).await.unwrap();

    let err = alice.push(scratch.dest("source"), "site:bad:tag").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(scratch.blob_count(), 0);
    assert!(records(&scratch).is_empty());
}

#[tokio::test]
async fn unknown_streams_are_reported() {
    let scratch = Scratch::new();
    let alice = client(&scratch, "alice");

    let err = alice.clone("ghost:master", scratch.dest("ghost")).await.unwrap_err();
    assert!(matches!(err, ClientError::Sync(SyncError::NotRegistered(_))));
    assert!(!scratch.dest("ghost").exists());

    alice.register("site", false).await.unwrap();
    let err = alice.clone("site:master", scratch.dest("empty")).await.unwrap_err();
    assert!(matches!(err, ClientError::Sync(SyncError::StreamNotFound(_))));
    assert!(!scratch.dest("empty").exists());
}

#[tokio::test]
async fn stub_store_accepts_pushes_but_cannot_serve_them() {
    let scratch = Scratch::new();
    let mut config = ClientConfig::new("alice");
    config.blob_store = packchain::core::BlobStoreConfig::Stub;
    let alice = Client::new(scratch.ledger.clone(), config).unwrap();
    alice.register("site", false).await.unwrap();

    let source = scratch.working_copy("source").await;
    let ids = linear_history(&source, 1).await.unwrap();
    alice.push(scratch.dest("source"), "site:master").await.unwrap();
    assert_eq!(alice.head("site:master").await.unwrap(), Some(ids[0]));

    let err = alice.clone("site:master", scratch.dest("copy")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(!scratch.dest("copy").exists());
}
