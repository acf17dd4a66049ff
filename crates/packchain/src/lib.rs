//! # Packchain
//!
//! Repository streams recorded in a ledger: packs of content-addressed
//! objects in a pluggable blob store, optionally sealed for private
//! repositories.
//!
//! ## Overview
//!
//! - **Ledger**: source of truth for registrations, roles, stream heads and
//!   the push chain of every `repo:tag` stream.
//! - **Blob store**: where pack bytes live (local directory, S3, or a stub).
//! - **Private repositories**: packs are sealed with a per-repository secret,
//!   shared with members as X25519-wrapped key records.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use packchain::{generate_keys, Client, ClientConfig};
//!
//! async fn example() -> packchain::Result<()> {
//!     let config = ClientConfig::load("packchain.toml")?;
//!     let client = Client::open(config)?;
//!
//!     client.register("site", false).await?;
//!     client.push("site", "site:master").await?;
//!     client.clone("site:master", "site-copy").await?;
//!
//!     // Once per principal, before being granted a private repository.
//!     let keys = generate_keys("keys/bob")?;
//!     println!("public key: {}", keys.public_key().to_hex());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `packchain::core` - ids, names, records
//! - `packchain::ledger` - `Ledger` trait and backends
//! - `packchain::blob` - blob stores
//! - `packchain::perms` - envelopes and key custody
//! - `packchain::graph` - object graph and working copies
//! - `packchain::sync` - the sync engine

pub mod client;
pub mod config;
pub mod error;

pub use client::{generate_keys, Client};
pub use config::{ClientConfig, DEFAULT_LEDGER_PATH};
pub use error::{ClientError, Result};

pub use packchain_blob as blob;
pub use packchain_core as core;
pub use packchain_graph as graph;
pub use packchain_ledger as ledger;
pub use packchain_perms as perms;
pub use packchain_sync as sync;

pub use packchain_core::{ObjectId, Principal, RepoName, Role, StreamRef, Tag};
pub use packchain_sync::{PushOutcome, PushReport};
