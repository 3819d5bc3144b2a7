//! Device → sync-group mapping.
//!
//! Every operation takes the store capability explicitly, so callers decide
//! the transaction boundary: a `link` over many names is applied entirely
//! or not at all when run inside [`Store::transaction`].
//!
//! [`Store::transaction`]: castsync_store::Store::transaction

use std::collections::BTreeSet;

use castsync_core::{DeviceHandle, GroupId, GroupRef, Timestamp, GROUP_STATUS_PENDING};
use castsync_store::StoreTx;

use crate::error::{GroupError, Result};
use crate::status::{SyncRequest, SyncStatus};

/// Keeps the Device → SyncGroup mapping transitively closed.
///
/// Stateless; all state lives behind the [`StoreTx`] passed to each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncGroupManager;

impl SyncGroupManager {
    pub fn new() -> Self {
        Self
    }

    /// Every device sharing `device`'s group, including `device` itself.
    ///
    /// Empty when the device is ungrouped.
    pub fn group_members(
        &self,
        tx: &dyn StoreTx,
        device: DeviceHandle,
    ) -> Result<BTreeSet<DeviceHandle>> {
        let Some(group) = tx.device_group(device)? else {
            return Ok(BTreeSet::new());
        };
        Ok(tx
            .devices_in_group(group)?
            .into_iter()
            .map(|d| d.handle)
            .collect())
    }

    /// Link a list of devices into one group.
    ///
    /// The first name is the pivot. Each following device is joined with
    /// the pivot's current group:
    /// 1. Neither grouped: create a group and point both at it
    /// 2. Only one grouped: the other joins that group
    /// 3. Both grouped differently: only the following device is re-pointed
    ///    to the pivot's group; its old group and any other members of it
    ///    stay where they are
    /// 4. Same group: nothing to do
    ///
    /// This is a single pass, not a union-find: chains linked out of order
    /// within one call are not normalized.
    ///
    /// Both pointers are re-read for every name, so earlier steps of the
    /// same call are visible to later ones. Duplicate names count once.
    /// Returns the pivot's group afterwards.
    pub fn link<S: AsRef<str>>(
        &self,
        tx: &mut dyn StoreTx,
        user: &str,
        names: &[S],
        now: Timestamp,
    ) -> Result<GroupRef> {
        if names.is_empty() {
            return Err(GroupError::EmptyLink);
        }

        let mut seen = BTreeSet::new();
        let mut handles = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }
            let device = tx
                .find_device(user, name)?
                .ok_or_else(|| GroupError::device_not_found(user, name))?;
            handles.push(device.handle);
        }

        let pivot = handles[0];
        for &other in &handles[1..] {
            let pivot_group = tx.device_group(pivot)?;
            let other_group = tx.device_group(other)?;

            match (pivot_group, other_group) {
                (None, None) => {
                    let group = tx.create_group(GROUP_STATUS_PENDING, now)?;
                    tx.set_device_group(pivot, Some(group))?;
                    tx.set_device_group(other, Some(group))?;
                    tracing::debug!(%pivot, %other, %group, "created sync group");
                }
                (Some(group), None) => {
                    tx.set_device_group(other, Some(group))?;
                    tracing::debug!(device = %other, %group, "joined pivot's group");
                }
                (None, Some(group)) => {
                    tx.set_device_group(pivot, Some(group))?;
                    tracing::debug!(device = %pivot, %group, "pivot joined group");
                }
                (Some(a), Some(b)) if a == b => {}
                (Some(target), Some(source)) => {
                    tx.set_device_group(other, Some(target))?;
                    tracing::debug!(device = %other, %source, %target, "moved to pivot's group");
                }
            }
        }

        Ok(tx.device_group(pivot)?)
    }

    /// Take a device out of its group.
    ///
    /// Other members and the group record are left as they are. Unlinking
    /// an ungrouped device does nothing.
    pub fn unlink(&self, tx: &mut dyn StoreTx, user: &str, name: &str) -> Result<()> {
        let device = tx
            .find_device(user, name)?
            .ok_or_else(|| GroupError::device_not_found(user, name))?;

        if let Some(group) = device.group {
            tx.set_device_group(device.handle, None)?;
            tracing::debug!(device = %device.handle, %group, "left sync group");
        }
        Ok(())
    }

    /// Ids of every group at least one of the user's devices points at.
    pub fn group_ids_for_user(&self, tx: &dyn StoreTx, user: &str) -> Result<BTreeSet<GroupId>> {
        Ok(tx
            .list_devices(user)?
            .into_iter()
            .filter_map(|d| d.group)
            .collect())
    }

    /// Names of the user's devices that belong to no group.
    pub fn devices_without_group(&self, tx: &dyn StoreTx, user: &str) -> Result<BTreeSet<String>> {
        Ok(tx
            .list_devices(user)?
            .into_iter()
            .filter(|d| !d.is_grouped())
            .map(|d| d.name)
            .collect())
    }

    /// Snapshot of which devices are synchronized with which.
    pub fn sync_status(&self, tx: &dyn StoreTx, user: &str) -> Result<SyncStatus> {
        let mut synchronized = Vec::new();
        for group in self.group_ids_for_user(tx, user)? {
            let mut names: Vec<String> = tx
                .devices_in_group(group)?
                .into_iter()
                .filter(|d| d.user == user)
                .map(|d| d.name)
                .collect();
            names.sort();
            synchronized.push(names);
        }

        Ok(SyncStatus {
            synchronized,
            not_synchronized: self.devices_without_group(tx, user)?.into_iter().collect(),
        })
    }

    /// Apply every link in `request`, then every unlink.
    pub fn apply_sync_request(
        &self,
        tx: &mut dyn StoreTx,
        user: &str,
        request: &SyncRequest,
        now: Timestamp,
    ) -> Result<()> {
        for names in &request.synchronize {
            self.link(tx, user, names.as_slice(), now)?;
        }
        for name in &request.stop_synchronize {
            self.unlink(tx, user, name)?;
        }
        Ok(())
    }
}
