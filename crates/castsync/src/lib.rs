//! # castsync
//!
//! Keeps one user's podcast subscriptions and episode progress converging
//! across many devices that report changes independently and out of order.
//!
//! ## Overview
//!
//! - **Event log**: every subscribe, unsubscribe and episode action is an
//!   immutable, timestamped row. Nothing is ever updated in place.
//! - **Diff**: current state is derived by folding the log since a cursor.
//! - **Sync-groups**: a change made on one device is written for every
//!   device in its group, inside one transaction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use castsync::{ReconciliationService, ServiceConfig};
//! use castsync::core::Timestamp;
//! use castsync::store::{SqliteStore, StoreExt};
//!
//! async fn example() -> castsync::Result<()> {
//!     let store = SqliteStore::open("castsync.db")?;
//!     store.register_device("alice", "phone", "Pixel", "mobile").await?;
//!     store.register_device("alice", "laptop", "", "laptop").await?;
//!
//!     let service = ReconciliationService::new(store, ServiceConfig::default());
//!     service
//!         .link_devices("alice", &["phone".into(), "laptop".into()])
//!         .await?;
//!
//!     service
//!         .upload_changes("alice", "phone", &["http://a.fm/feed".into()], &[])
//!         .await?;
//!
//!     let changes = service.read_changes("alice", "laptop", Timestamp::EPOCH).await?;
//!     assert_eq!(changes.add, vec!["http://a.fm/feed".to_string()]);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `castsync::core` - Types, timestamps, validation and the diff
//! - `castsync::store` - Storage traits, SQLite and in-memory backends
//! - `castsync::sync` - Sync-group management

pub mod config;
pub mod error;
pub mod service;

// Re-export component crates
pub use castsync_core as core;
pub use castsync_store as store;
pub use castsync_sync as sync;

pub use config::ServiceConfig;
pub use error::{Error, ErrorKind, Result};
pub use service::{
    ChangeSet, DeviceSummary, EpisodeActionsPage, EpisodeUploadReceipt, ReconciliationService,
    UploadReceipt,
};

pub use castsync_core::{
    Clock, DeviceHandle, EpisodeActionEvent, EpisodeActionQuery, SystemClock, Timestamp,
};
pub use castsync_sync::{SyncRequest, SyncStatus};
