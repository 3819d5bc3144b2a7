//! Store traits: the abstract interface for log and group persistence.
//!
//! This lets the service stay storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).
//!
//! Data access is split in two layers:
//!
//! - [`EventLog`], [`GroupStore`] and [`Directory`] are synchronous views
//!   over the data, bundled together as [`StoreTx`].
//! - [`Store`] is the async entry point. It runs a closure against a
//!   [`StoreTx`] either inside a transaction or as a plain read.
//!
//! Holding a `&mut dyn StoreTx` is the only way to write, and the only way
//! to get one is [`Store::transaction`]. Everything a closure writes is
//! committed together or not at all.

use async_trait::async_trait;
use castsync_core::{
    Device, DeviceHandle, EpisodeActionEvent, EpisodeActionQuery, GroupId, GroupRef,
    SubscriptionAction, SubscriptionEvent, Timestamp,
};

use crate::error::{Result, StoreError};

// ─────────────────────────────────────────────────────────────────────────────
// Event Log
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only logs of subscription changes and episode actions.
///
/// Rows are never updated once written. Reads come back in insertion order.
pub trait EventLog {
    /// Append one subscription change for `(user, device)`.
    ///
    /// Fails with [`StoreError::NotFound`] if the device does not belong to
    /// the user.
    fn append_subscription_event(
        &mut self,
        user: &str,
        device: DeviceHandle,
        podcast: &str,
        action: &SubscriptionAction,
        timestamp: Timestamp,
    ) -> Result<()>;

    /// Subscription events of one device with `timestamp > since`.
    ///
    /// Ordered by timestamp, then by insertion. Unknown users or devices
    /// simply have no events.
    fn subscription_events_since(
        &self,
        user: &str,
        device: DeviceHandle,
        since: Timestamp,
    ) -> Result<Vec<SubscriptionEvent>>;

    /// Append one episode action recorded by `device`.
    ///
    /// `received` is the server time of the upload. The action's own
    /// timestamp is client time and is stored as given.
    fn append_episode_action(
        &mut self,
        device: DeviceHandle,
        action: &EpisodeActionEvent,
        received: Timestamp,
    ) -> Result<()>;

    /// Episode actions of all of `user`'s devices matching `query`.
    ///
    /// `query.since` is compared with the server receive time, never with
    /// the client timestamp. The `device` field of each returned action is
    /// the recording device's name. Ordered by insertion.
    fn episode_actions_since(
        &self,
        user: &str,
        query: &EpisodeActionQuery,
    ) -> Result<Vec<EpisodeActionEvent>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync Groups
// ─────────────────────────────────────────────────────────────────────────────

/// Sync-group records and the device → group pointers.
///
/// Group membership is not stored separately: the members of a group are
/// exactly the devices whose pointer names it.
pub trait GroupStore {
    /// Create a new, empty group.
    fn create_group(&mut self, status: &str, now: Timestamp) -> Result<GroupId>;

    /// Status of a group record, `None` if no such group exists.
    fn group_status(&self, group: GroupId) -> Result<Option<String>>;

    /// Current pointer of a device.
    ///
    /// Fails with [`StoreError::NotFound`] for an unknown device.
    fn device_group(&self, device: DeviceHandle) -> Result<GroupRef>;

    /// Re-point a device. `None` ungroups it.
    ///
    /// Fails with [`StoreError::NotFound`] for an unknown device or group.
    fn set_device_group(&mut self, device: DeviceHandle, group: GroupRef) -> Result<()>;

    /// Devices currently pointing at `group`, ordered by handle.
    fn devices_in_group(&self, group: GroupId) -> Result<Vec<Device>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────────────────────────────────────

/// Users and their devices.
///
/// Registration is owned by collaborators outside the sync core; the core
/// only resolves names and reads device records.
pub trait Directory {
    /// Register a user. Registering an existing name is a no-op.
    fn upsert_user(&mut self, username: &str) -> Result<()>;

    /// Register a device, or update caption and kind of an existing one.
    ///
    /// An existing device keeps its handle and its group pointer.
    fn upsert_device(
        &mut self,
        user: &str,
        name: &str,
        caption: &str,
        kind: &str,
    ) -> Result<DeviceHandle>;

    /// Look a device up by its per-user name.
    fn find_device(&self, user: &str, name: &str) -> Result<Option<Device>>;

    /// Look a device up by handle.
    fn device(&self, handle: DeviceHandle) -> Result<Option<Device>>;

    /// All devices of a user, ordered by handle.
    ///
    /// Fails with [`StoreError::NotFound`] for an unknown user.
    fn list_devices(&self, user: &str) -> Result<Vec<Device>>;
}

/// Everything a store closure can see.
pub trait StoreTx: EventLog + GroupStore + Directory {}

impl<T: EventLog + GroupStore + Directory + ?Sized> StoreTx for T {}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// The Store trait: async entry point to the data.
///
/// Closures run on a blocking thread for SQLite, so they must be `'static`
/// and must not await.
///
/// # Design Notes
///
/// - **All or nothing**: a transaction closure that returns `Err` leaves no
///   trace, no matter how many writes it made first.
/// - **Errors pass through**: the closure's own error type comes back
///   unchanged; store failures are lifted into it with `From<StoreError>`.
/// - **No retries**: a busy database surfaces as an error.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    async fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;

    /// Run `f` against the current data without a transaction.
    async fn read<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Register a user and a device in one transaction.
    fn register_device(
        &self,
        user: &str,
        name: &str,
        caption: &str,
        kind: &str,
    ) -> impl std::future::Future<Output = Result<DeviceHandle>> + Send;

    /// All devices of a user.
    fn devices_of(&self, user: &str)
        -> impl std::future::Future<Output = Result<Vec<Device>>> + Send;

    /// Resolve a device by name, failing with [`StoreError::NotFound`].
    fn resolve_device(
        &self,
        user: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Device>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn register_device(
        &self,
        user: &str,
        name: &str,
        caption: &str,
        kind: &str,
    ) -> Result<DeviceHandle> {
        let (user, name) = (user.to_string(), name.to_string());
        let (caption, kind) = (caption.to_string(), kind.to_string());
        self.transaction(move |tx| {
            tx.upsert_user(&user)?;
            tx.upsert_device(&user, &name, &caption, &kind)
        })
        .await
    }

    async fn devices_of(&self, user: &str) -> Result<Vec<Device>> {
        let user = user.to_string();
        self.read(move |tx| tx.list_devices(&user)).await
    }

    async fn resolve_device(&self, user: &str, name: &str) -> Result<Device> {
        let (user, name) = (user.to_string(), name.to_string());
        self.read(move |tx| {
            tx.find_device(&user, &name)?
                .ok_or_else(|| StoreError::NotFound(format!("device {user}/{name}")))
        })
        .await
    }
}
