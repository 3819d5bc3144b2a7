//! # castsync sync
//!
//! Sync-groups: clusters of one user's devices whose subscription changes
//! are mirrored to every member.
//!
//! ## Overview
//!
//! A device points at no group or at exactly one. A group's members are the
//! devices pointing at it, so membership can never disagree with the
//! pointers. [`SyncGroupManager::link`] re-points one device at a time: when
//! both sides are already grouped, only the second device moves and its old
//! group stays in place with whatever members remain.
//!
//! ## Key Properties
//!
//! - **Transitive**: link(A, B) then link(B, C) puts A, B and C together
//! - **Atomic**: run inside `Store::transaction`, a failed link leaves nothing behind
//! - **Snapshot fan-out**: membership is resolved at write time and never
//!   rewritten into history
//!
//! ## Usage
//!
//! ```rust,no_run
//! use castsync_core::Timestamp;
//! use castsync_store::{MemoryStore, Store};
//! use castsync_sync::{GroupError, SyncGroupManager};
//!
//! async fn example(store: &MemoryStore) -> Result<(), GroupError> {
//!     store
//!         .transaction(|tx| {
//!             SyncGroupManager.link(tx, "alice", &["phone", "laptop"], Timestamp::now())
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod groups;
pub mod status;

pub use error::{GroupError, Result};
pub use groups::SyncGroupManager;
pub use status::{SyncRequest, SyncStatus};
