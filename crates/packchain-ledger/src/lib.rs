//! # Packchain Ledger
//!
//! The thin client facade the sync engine uses to talk to the public ledger.
//!
//! ## Overview
//!
//! The ledger is an external, append-only, permissioned record store. It never
//! holds object bytes; it holds repository registrations, one push record per
//! synchronization point, the membership of each repository, and wrapped copies
//! of a private repository's secret. The engine treats it as the source of
//! truth for stream heads and access grants.
//!
//! The [`Ledger`] trait is the collaborator contract. Two backends ship here:
//!
//! - [`MemoryLedger`] - In-memory, for tests
//! - [`SqliteLedger`] - A single-node development ledger persisted in SQLite
//!
//! [`LedgerExt`] adds the named convenience operations (`pack_key_for`,
//! `previous_head`, `add_owner`, ...) on top of any backend.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use packchain_core::{BlobStoreConfig, Principal, RepoName, Tag};
//! use packchain_ledger::{Ledger, LedgerExt, SqliteLedger};
//!
//! async fn example() {
//!     let ledger = SqliteLedger::open("ledger.db").unwrap();
//!     let alice = Principal::from("0xa11ce");
//!     let repo = RepoName::new("website").unwrap();
//!
//!     ledger
//!         .register(&alice, &repo, &BlobStoreConfig::default(), None)
//!         .await
//!         .unwrap();
//!
//!     let head = ledger.head(&repo, &Tag::new("master").unwrap()).await.unwrap();
//!     assert!(head.is_none());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Absence is not an error**: `head` on a registered repo with no pushes is `Ok(None)`
//! - **Ledger orders appends**: concurrent pushes are not compare-and-swapped; the
//!   latest append wins the head and each record keeps the head it was computed against
//! - **Role model**: the registrant is the first owner; owners manage every role;
//!   owners and writers may push

pub mod error;
pub mod memory;
pub mod migration;
pub mod policy;
pub mod sqlite;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{Ledger, LedgerExt};
