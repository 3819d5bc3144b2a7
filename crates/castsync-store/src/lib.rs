//! # castsync store
//!
//! Storage for castsync: the append-only subscription and episode logs, the
//! device directory, and the device → sync-group pointers.
//!
//! ## Overview
//!
//! Every store implements [`Store`], which hands out one capability:
//! a [`StoreTx`] view of the data. Mutations get it through
//! [`Store::transaction`] and are committed only if the closure returns
//! `Ok`; any `Err` rolls the whole closure back. Reads go through
//! [`Store::read`] and are not isolated from concurrent writers.
//!
//! The primary implementation is [`SqliteStore`], with [`MemoryStore`] for
//! tests. Both give the same transactional guarantees.
//!
//! ## Key Types
//!
//! - [`Store`] - Async entry point that runs closures against the data
//! - [`StoreTx`] - The capability passed into every store operation
//! - [`EventLog`] - Append and query the subscription and episode logs
//! - [`GroupStore`] - Create sync-groups and move device pointers
//! - [`Directory`] - Users and devices as registered by collaborators
//!
//! ## Usage
//!
//! ```rust,no_run
//! use castsync_core::{SubscriptionAction, Timestamp};
//! use castsync_store::{SqliteStore, Store, StoreError};
//!
//! async fn example() -> Result<(), StoreError> {
//!     let store = SqliteStore::open("castsync.db")?;
//!
//!     store
//!         .transaction(|tx| {
//!             tx.upsert_user("alice")?;
//!             let phone = tx.upsert_device("alice", "phone", "", "mobile")?;
//!             tx.append_subscription_event(
//!                 "alice",
//!                 phone,
//!                 "http://a.fm/feed",
//!                 &SubscriptionAction::Subscribe,
//!                 Timestamp::now(),
//!             )
//!         })
//!         .await
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: log rows are never updated by the core
//! - **Derived membership**: a group's members are the devices pointing at it
//! - **No retries**: failures surface unchanged; retry policy is the caller's

pub mod config;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use config::SqliteConfig;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Directory, EventLog, GroupStore, Store, StoreExt, StoreTx};
