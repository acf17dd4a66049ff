//! # Packchain Testkit
//!
//! Testing utilities for packchain.
//!
//! ## Overview
//!
//! - **Fixtures**: scratch directories with a local blob store and an
//!   in-memory ledger, identities with key pairs, canned linear and merge
//!   histories
//! - **Generators**: proptest strategies for names, stream refs and working
//!   tree snapshots
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use packchain_testkit::fixtures::{linear_history, Scratch};
//!
//! async fn example() {
//!     let scratch = Scratch::new();
//!     let source = scratch.working_copy("source").await;
//!     let commits = linear_history(&source, 3).await.unwrap();
//!     assert_eq!(commits.len(), 3);
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    linear_history, merge_history, multi_party, snapshot, Identity, MergeHistory, Scratch,
};
