//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use castsync_core::{Clock, DeviceHandle, Timestamp};
use castsync_store::{MemoryStore, Result, Store, StoreExt};

/// Default fixture user.
pub const ALICE: &str = "alice";

/// Devices registered for [`ALICE`] by [`TestFixture::with_store`].
pub const DEVICES: [&str; 3] = ["phone", "laptop", "tablet"];

/// Feeds used across scenario tests.
pub const FEED_A: &str = "http://a.fm/feed";
pub const FEED_B: &str = "http://b.fm/feed";
pub const FEED_C: &str = "http://c.fm/feed";

/// Start time of every fixture clock: 2023-11-14T22:13:20Z.
pub const START: Timestamp = Timestamp(1_700_000_000);

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the service.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start.as_unix())),
        }
    }

    pub fn set(&self, to: Timestamp) {
        self.now.store(to.as_unix(), Ordering::SeqCst);
    }

    /// Move forward by `secs` and return the new time.
    pub fn advance(&self, secs: i64) -> Timestamp {
        Timestamp(self.now.fetch_add(secs, Ordering::SeqCst) + secs)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(START)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::SeqCst))
    }
}

/// A store seeded with [`ALICE`] and her [`DEVICES`], plus a manual clock.
pub struct TestFixture<S = MemoryStore> {
    pub store: S,
    pub clock: ManualClock,
    /// Handles of [`DEVICES`], in the same order.
    pub devices: Vec<DeviceHandle>,
}

impl TestFixture<MemoryStore> {
    /// Fixture over a fresh in-memory store.
    pub async fn memory() -> Result<Self> {
        Self::with_store(MemoryStore::new()).await
    }
}

impl<S: Store> TestFixture<S> {
    /// Seed `store` with the fixture user and devices.
    pub async fn with_store(store: S) -> Result<Self> {
        let devices = seed_devices(&store, ALICE, &DEVICES).await?;
        Ok(Self {
            store,
            clock: ManualClock::default(),
            devices,
        })
    }

    /// Handle of a fixture device by name.
    pub fn handle(&self, name: &str) -> Option<DeviceHandle> {
        DEVICES
            .iter()
            .position(|d| *d == name)
            .map(|i| self.devices[i])
    }

    /// Split into store and clock, e.g. to build a service.
    pub fn into_parts(self) -> (S, ManualClock) {
        (self.store, self.clock)
    }
}

/// Register `user` and each named device; returns handles in order.
pub async fn seed_devices<S: Store + ?Sized>(
    store: &S,
    user: &str,
    names: &[&str],
) -> Result<Vec<DeviceHandle>> {
    let mut handles = Vec::with_capacity(names.len());
    for name in names {
        handles.push(store.register_device(user, name, "", "other").await?);
    }
    Ok(handles)
}

/// Install a `tracing` subscriber for tests.
///
/// Honors `RUST_LOG`; output goes through the test harness capture. Safe to
/// call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
