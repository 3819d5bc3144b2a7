//! # castsync core
//!
//! Pure primitives for castsync: identifiers, timestamps, log events, and the
//! subscription diff.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! plain computation over values that the store and the service pass around.
//!
//! ## Key Types
//!
//! - [`DeviceHandle`] - Internal integer handle of a device
//! - [`GroupId`] / [`GroupRef`] - Sync-group identity and the nullable pointer to it
//! - [`SubscriptionEvent`] - One immutable subscribe/unsubscribe row of the log
//! - [`EpisodeActionEvent`] - One immutable episode playback/download row
//! - [`Timestamp`] - Second-resolution Unix time
//!
//! ## Diff
//!
//! Current subscription state is never stored. It is derived by folding the
//! log with [`diff`]; see the [`diff`](mod@diff) module for the exact counting rules.

pub mod diff;
pub mod error;
pub mod event;
pub mod time;
pub mod types;
pub mod validation;

pub use diff::{diff, SubscriptionDiff, SubscriptionTally};
pub use error::ValidationError;
pub use event::{EpisodeActionEvent, EpisodeActionQuery, SubscriptionAction, SubscriptionEvent};
pub use time::{Clock, SystemClock, Timestamp};
pub use types::{Device, DeviceHandle, GroupId, GroupRef, GROUP_STATUS_PENDING};
pub use validation::{
    sanitize_url, validate_change_lists, validate_episode_action, validate_subscription_action,
    ChangeLists,
};
