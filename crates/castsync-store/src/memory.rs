//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.
//!
//! Every transaction clones the whole state, both logs included, so a write
//! costs O(total history). Fine for tests and small fixtures; use the SQLite
//! backend for anything long-lived.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use castsync_core::{
    validate_subscription_action, Device, DeviceHandle, EpisodeActionEvent, EpisodeActionQuery,
    GroupId, GroupRef, SubscriptionAction, SubscriptionEvent, Timestamp,
};

use crate::error::{Result, StoreError};
use crate::traits::{Directory, EventLog, GroupStore, Store, StoreTx};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
/// A transaction works on a copy of the state that replaces the original
/// only when the closure succeeds.
pub struct MemoryStore {
    inner: RwLock<MemoryState>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    /// Username -> user id.
    users: BTreeMap<String, i64>,

    /// Devices indexed by handle.
    devices: BTreeMap<i64, DeviceRow>,

    /// Group status indexed by group id.
    groups: BTreeMap<i64, String>,

    /// Subscription log in insertion order.
    subscription_events: Vec<SubscriptionEvent>,

    /// Episode log in insertion order: recording device, server receive
    /// time, action.
    episode_actions: Vec<(i64, Timestamp, EpisodeActionEvent)>,

    last_user_id: i64,
    last_device_id: i64,
    last_group_id: i64,
}

#[derive(Debug, Clone)]
struct DeviceRow {
    user: String,
    name: String,
    caption: String,
    kind: String,
    group: Option<i64>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryState::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("memory store lock poisoned: {}", e))
}

#[async_trait]
impl Store for MemoryStore {
    async fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let mut staged = inner.clone();
        let value = f(&mut staged)?;
        *inner = staged;
        Ok(value)
    }

    async fn read<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let inner = self.inner.read().map_err(poisoned)?;
        f(&*inner)
    }
}

impl MemoryState {
    fn user_id(&self, username: &str) -> Result<i64> {
        self.users
            .get(username)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("user {username}")))
    }

    fn to_device(id: i64, row: &DeviceRow) -> Device {
        Device {
            handle: DeviceHandle(id),
            user: row.user.clone(),
            name: row.name.clone(),
            caption: row.caption.clone(),
            kind: row.kind.clone(),
            group: row.group.map(GroupId),
        }
    }
}

impl Directory for MemoryState {
    fn upsert_user(&mut self, username: &str) -> Result<()> {
        if !self.users.contains_key(username) {
            self.last_user_id += 1;
            self.users.insert(username.to_string(), self.last_user_id);
        }
        Ok(())
    }

    fn upsert_device(
        &mut self,
        user: &str,
        name: &str,
        caption: &str,
        kind: &str,
    ) -> Result<DeviceHandle> {
        self.user_id(user)?;

        let existing = self
            .devices
            .iter_mut()
            .find(|(_, row)| row.user == user && row.name == name);
        if let Some((id, row)) = existing {
            row.caption = caption.to_string();
            row.kind = kind.to_string();
            return Ok(DeviceHandle(*id));
        }

        self.last_device_id += 1;
        self.devices.insert(
            self.last_device_id,
            DeviceRow {
                user: user.to_string(),
                name: name.to_string(),
                caption: caption.to_string(),
                kind: kind.to_string(),
                group: None,
            },
        );
        Ok(DeviceHandle(self.last_device_id))
    }

    fn find_device(&self, user: &str, name: &str) -> Result<Option<Device>> {
        Ok(self
            .devices
            .iter()
            .find(|(_, row)| row.user == user && row.name == name)
            .map(|(id, row)| Self::to_device(*id, row)))
    }

    fn device(&self, handle: DeviceHandle) -> Result<Option<Device>> {
        Ok(self
            .devices
            .get(&handle.get())
            .map(|row| Self::to_device(handle.get(), row)))
    }

    fn list_devices(&self, user: &str) -> Result<Vec<Device>> {
        self.user_id(user)?;
        Ok(self
            .devices
            .iter()
            .filter(|(_, row)| row.user == user)
            .map(|(id, row)| Self::to_device(*id, row))
            .collect())
    }
}

impl GroupStore for MemoryState {
    fn create_group(&mut self, status: &str, _now: Timestamp) -> Result<GroupId> {
        self.last_group_id += 1;
        self.groups.insert(self.last_group_id, status.to_string());
        Ok(GroupId(self.last_group_id))
    }

    fn group_status(&self, group: GroupId) -> Result<Option<String>> {
        Ok(self.groups.get(&group.get()).cloned())
    }

    fn device_group(&self, device: DeviceHandle) -> Result<GroupRef> {
        self.devices
            .get(&device.get())
            .map(|row| row.group.map(GroupId))
            .ok_or_else(|| StoreError::NotFound(format!("device {device}")))
    }

    fn set_device_group(&mut self, device: DeviceHandle, group: GroupRef) -> Result<()> {
        if let Some(group) = group {
            if !self.groups.contains_key(&group.get()) {
                return Err(StoreError::NotFound(format!("sync group {group}")));
            }
        }

        let row = self
            .devices
            .get_mut(&device.get())
            .ok_or_else(|| StoreError::NotFound(format!("device {device}")))?;
        row.group = group.map(GroupId::get);
        Ok(())
    }

    fn devices_in_group(&self, group: GroupId) -> Result<Vec<Device>> {
        Ok(self
            .devices
            .iter()
            .filter(|(_, row)| row.group == Some(group.get()))
            .map(|(id, row)| Self::to_device(*id, row))
            .collect())
    }
}

impl EventLog for MemoryState {
    fn append_subscription_event(
        &mut self,
        user: &str,
        device: DeviceHandle,
        podcast: &str,
        action: &SubscriptionAction,
        timestamp: Timestamp,
    ) -> Result<()> {
        validate_subscription_action(action)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        self.user_id(user)?;
        match self.devices.get(&device.get()) {
            Some(row) if row.user == user => {}
            _ => return Err(StoreError::NotFound(format!("device {device} of user {user}"))),
        }

        self.subscription_events.push(SubscriptionEvent {
            user: user.to_string(),
            device,
            podcast: podcast.to_string(),
            action: action.clone(),
            timestamp,
        });
        Ok(())
    }

    fn subscription_events_since(
        &self,
        user: &str,
        device: DeviceHandle,
        since: Timestamp,
    ) -> Result<Vec<SubscriptionEvent>> {
        let mut events: Vec<_> = self
            .subscription_events
            .iter()
            .filter(|e| e.user == user && e.device == device && e.timestamp > since)
            .cloned()
            .collect();
        // Stable, so equal timestamps keep insertion order.
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    fn append_episode_action(
        &mut self,
        device: DeviceHandle,
        action: &EpisodeActionEvent,
        received: Timestamp,
    ) -> Result<()> {
        if !self.devices.contains_key(&device.get()) {
            return Err(StoreError::NotFound(format!("device {device}")));
        }
        self.episode_actions
            .push((device.get(), received, action.clone()));
        Ok(())
    }

    fn episode_actions_since(
        &self,
        user: &str,
        query: &EpisodeActionQuery,
    ) -> Result<Vec<EpisodeActionEvent>> {
        let mut out = Vec::new();
        for (device_id, received, action) in &self.episode_actions {
            let Some(row) = self.devices.get(device_id) else {
                continue;
            };
            if row.user != user {
                continue;
            }
            if query.device.as_deref().is_some_and(|name| name != row.name) {
                continue;
            }

            let mut action = action.clone();
            action.device = row.name.clone();
            if query.matches(&action, *received) {
                out.push(action);
            }
        }
        Ok(out)
    }
}
