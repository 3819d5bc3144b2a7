//! Fault injection.
//!
//! [`FlakyStore`] wraps any [`Store`] and can be armed to fail a transaction
//! after a given number of writes. Reads and the writes before the fault go
//! through to the wrapped store, so a test can check that the partial batch
//! was rolled back.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use castsync_core::{
    Device, DeviceHandle, EpisodeActionEvent, EpisodeActionQuery, GroupId, GroupRef,
    SubscriptionAction, SubscriptionEvent, Timestamp,
};
use castsync_store::{Directory, EventLog, GroupStore, Result, Store, StoreError, StoreTx};

/// Message of every injected failure.
pub const INJECTED_FAULT: &str = "injected fault";

/// A store that fails on demand.
pub struct FlakyStore<S> {
    inner: S,
    /// Write budget of the next transaction, if armed.
    armed: Mutex<Option<usize>>,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: Mutex::new(None),
        }
    }

    /// Let the next transaction make `writes` writes, then fail the one after.
    ///
    /// Applies to one transaction only.
    pub fn fail_after_writes(&self, writes: usize) {
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner) = Some(writes);
    }

    /// Disarm a pending fault.
    pub fn heal(&self) {
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn take_budget(&self) -> Option<usize> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

#[async_trait]
impl<S: Store> Store for FlakyStore<S> {
    async fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        match self.take_budget() {
            None => self.inner.transaction(f).await,
            Some(remaining) => {
                self.inner
                    .transaction(move |tx| {
                        let mut faulty = FailAfter { inner: tx, remaining };
                        f(&mut faulty)
                    })
                    .await
            }
        }
    }

    async fn read<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        self.inner.read(f).await
    }
}

/// A transaction view that fails once its write budget is spent.
struct FailAfter<'a> {
    inner: &'a mut dyn StoreTx,
    remaining: usize,
}

impl FailAfter<'_> {
    fn spend(&mut self) -> Result<()> {
        if self.remaining == 0 {
            return Err(StoreError::Unavailable(INJECTED_FAULT.to_string()));
        }
        self.remaining -= 1;
        Ok(())
    }
}

impl EventLog for FailAfter<'_> {
    fn append_subscription_event(
        &mut self,
        user: &str,
        device: DeviceHandle,
        podcast: &str,
        action: &SubscriptionAction,
        timestamp: Timestamp,
    ) -> Result<()> {
        self.spend()?;
        self.inner
            .append_subscription_event(user, device, podcast, action, timestamp)
    }

    fn subscription_events_since(
        &self,
        user: &str,
        device: DeviceHandle,
        since: Timestamp,
    ) -> Result<Vec<SubscriptionEvent>> {
        self.inner.subscription_events_since(user, device, since)
    }

    fn append_episode_action(
        &mut self,
        device: DeviceHandle,
        action: &EpisodeActionEvent,
        received: Timestamp,
    ) -> Result<()> {
        self.spend()?;
        self.inner.append_episode_action(device, action, received)
    }

    fn episode_actions_since(
        &self,
        user: &str,
        query: &EpisodeActionQuery,
    ) -> Result<Vec<EpisodeActionEvent>> {
        self.inner.episode_actions_since(user, query)
    }
}

impl GroupStore for FailAfter<'_> {
    fn create_group(&mut self, status: &str, now: Timestamp) -> Result<GroupId> {
        self.spend()?;
        self.inner.create_group(status, now)
    }

    fn group_status(&self, group: GroupId) -> Result<Option<String>> {
        self.inner.group_status(group)
    }

    fn device_group(&self, device: DeviceHandle) -> Result<GroupRef> {
        self.inner.device_group(device)
    }

    fn set_device_group(&mut self, device: DeviceHandle, group: GroupRef) -> Result<()> {
        self.spend()?;
        self.inner.set_device_group(device, group)
    }

    fn devices_in_group(&self, group: GroupId) -> Result<Vec<Device>> {
        self.inner.devices_in_group(group)
    }
}

impl Directory for FailAfter<'_> {
    fn upsert_user(&mut self, username: &str) -> Result<()> {
        self.spend()?;
        self.inner.upsert_user(username)
    }

    fn upsert_device(
        &mut self,
        user: &str,
        name: &str,
        caption: &str,
        kind: &str,
    ) -> Result<DeviceHandle> {
        self.spend()?;
        self.inner.upsert_device(user, name, caption, kind)
    }

    fn find_device(&self, user: &str, name: &str) -> Result<Option<Device>> {
        self.inner.find_device(user, name)
    }

    fn device(&self, handle: DeviceHandle) -> Result<Option<Device>> {
        self.inner.device(handle)
    }

    fn list_devices(&self, user: &str) -> Result<Vec<Device>> {
        self.inner.list_devices(user)
    }
}
