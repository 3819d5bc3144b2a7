//! # castsync testkit
//!
//! Testing utilities for castsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known diff cases with the add/remove sets every implementation must produce
//! - **Generators**: Proptest strategies for logs, uploads and link plans
//! - **Fixtures**: A seeded store and a manual clock
//! - **Faults**: A store wrapper that fails a transaction part-way through
//! - **Gate**: A store wrapper that holds a transaction back until released
//!
//! ## Golden Vectors
//!
//! ```rust
//! use castsync_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     assert!(vector.holds(), "{}", vector.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use castsync_core::{diff, DeviceHandle};
//! use castsync_testkit::generators::event_log;
//!
//! proptest! {
//!     #[test]
//!     fn diff_is_deterministic(events in event_log("alice", DeviceHandle(1), 64)) {
//!         prop_assert_eq!(diff(&events), diff(&events));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use castsync_testkit::fixtures::{TestFixture, ALICE};
//!
//! let fixture = TestFixture::memory().await?;
//! let phone = fixture.handle("phone");
//! ```

pub mod faults;
pub mod fixtures;
pub mod gate;
pub mod generators;
pub mod vectors;

pub use faults::{FlakyStore, INJECTED_FAULT};
pub use gate::GatedStore;
pub use fixtures::{init_test_tracing, seed_devices, ManualClock, TestFixture};
pub use vectors::{all_vectors, failing_vectors, DiffVector};
