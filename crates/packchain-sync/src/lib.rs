//! # Packchain Sync
//!
//! Moves commit history between local working copies and ledger-recorded
//! streams.
//!
//! ## Overview
//!
//! A stream (`repo:tag`) is a linked list of push records in the ledger. Each
//! record names the newest commit of one push, the blob-store key of the pack
//! carrying that push's objects, and the head of the push before it.
//!
//! - **push** computes the commits the stream does not have yet, packs them
//!   with their trees and blobs, seals the pack for private repositories,
//!   uploads it and appends a record.
//! - **clone** / **pull** walk the chain from the current head back to the
//!   first push, index every pack, then check out the head.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use packchain_core::{Principal, StreamRef};
//! use packchain_graph::FsObjectGraph;
//! use packchain_ledger::MemoryLedger;
//! use packchain_sync::{SyncConfig, SyncEngine};
//!
//! async fn example() -> packchain_sync::Result<()> {
//!     let ledger = Arc::new(MemoryLedger::new());
//!     let engine = SyncEngine::new(ledger, Principal::from("alice"), SyncConfig::default());
//!     let stream = StreamRef::parse("site:master")?;
//!
//!     let copy: FsObjectGraph = engine.clone(&stream, "site".as_ref()).await?;
//!     engine.push(&copy, &stream).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - Pushing at a stable head is a no-op: no upload, no record.
//! - A recorded head missing from local history is reported as
//!   [`SyncError::DivergedHistory`], never resolved silently.
//! - The ledger append is the only commitment point. A failed append leaves an
//!   orphaned pack in the blob store and nothing else.

pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod plan;

pub use config::SyncConfig;
pub use delta::commits_after;
pub use engine::{DownloadReport, PushOutcome, PushReport, SyncEngine};
pub use error::{ErrorKind, Result, SyncError};
pub use plan::{plan_pack, PackPlan};
