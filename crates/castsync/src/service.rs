//! The reconciliation service: uploads, reads, and sync-group changes.
//!
//! Every mutation runs in one store transaction. Subscription uploads are
//! fanned out to every member of the acting device's sync-group, resolved
//! inside that same transaction, so a concurrent link or unlink is either
//! fully before or fully after the upload.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use castsync_core::{
    diff, validate_change_lists, validate_episode_action, Clock, Device, DeviceHandle,
    EpisodeActionEvent, EpisodeActionQuery, SubscriptionAction, SubscriptionDiff, SystemClock,
    Timestamp,
};
use castsync_store::{Store, StoreError, StoreTx};
use castsync_sync::{SyncGroupManager, SyncRequest, SyncStatus};

use crate::config::{check_batch, ServiceConfig};
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a subscription upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Every device that received the change rows.
    pub fan_out_devices: Vec<DeviceHandle>,
    /// Server time stamped on every row of the upload.
    pub timestamp: Timestamp,
    /// `(as sent, as stored)` for every URL in the upload.
    pub update_urls: Vec<(String, String)>,
}

/// Subscription changes of one device since a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub add: Vec<String>,
    pub remove: Vec<String>,
    /// Pass back as `since` on the next read.
    #[serde(rename = "timestamp")]
    pub cursor: Timestamp,
}

/// Outcome of an episode-action upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeUploadReceipt {
    /// Server receive time stored with every action of the batch.
    pub timestamp: Timestamp,
    /// Number of actions appended.
    pub stored: usize,
}

/// Episode actions matching a query, with the cursor for the next read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeActionsPage {
    pub actions: Vec<EpisodeActionEvent>,
    #[serde(rename = "timestamp")]
    pub cursor: Timestamp,
}

/// One device as listed to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    #[serde(rename = "id")]
    pub name: String,
    pub caption: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Number of podcasts the device is currently subscribed to.
    pub subscriptions: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Orchestrates the event log, the diff and the sync-groups.
///
/// Cheap to share: the store is held behind an `Arc` and the service holds
/// no other mutable state. No subscription state is cached; every read
/// re-folds the log.
pub struct ReconciliationService<S: Store, C: Clock = SystemClock> {
    /// The storage backend.
    store: Arc<S>,
    /// Source of row timestamps and read cursors. Read inside store
    /// closures, so stamps and cursors are ordered with the commits.
    clock: Arc<C>,
    groups: SyncGroupManager,
    config: ServiceConfig,
}

impl<S: Store> ReconciliationService<S, SystemClock> {
    /// Create a service stamping rows with the system clock.
    pub fn new(store: S, config: ServiceConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: Store, C: Clock + 'static> ReconciliationService<S, C> {
    /// Create a service with an explicit clock.
    pub fn with_clock(store: S, clock: C, config: ServiceConfig) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(clock),
            groups: SyncGroupManager::new(),
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Record added and removed podcasts for a device and all its peers.
    ///
    /// Every clustered device gets one row per URL, all stamped with the
    /// same server time. The stamp is taken once the transaction runs, so a
    /// write that waited on the store is never stamped behind a cursor that
    /// was handed out meanwhile. Nothing is written if any row fails.
    #[tracing::instrument(skip(self, add, remove), fields(adds = add.len(), removes = remove.len()))]
    pub async fn upload_changes(
        &self,
        user: &str,
        device: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<UploadReceipt> {
        let lists = validate_change_lists(add, remove).map_err(|e| {
            tracing::warn!(error = %e, "rejected subscription upload");
            e
        })?;
        check_batch(lists.len(), self.config.max_changes_per_upload)?;

        let clock = Arc::clone(&self.clock);
        let groups = self.groups;
        let (user_owned, device_owned) = (user.to_string(), device.to_string());
        let (adds, removes) = (lists.add, lists.remove);

        let (fan_out, timestamp) = self
            .store
            .transaction(move |tx| -> Result<(Vec<DeviceHandle>, Timestamp)> {
                let timestamp = clock.now();
                let acting = resolve_device(&*tx, &user_owned, &device_owned)?;
                let mut targets = groups.group_members(&*tx, acting.handle)?;
                if targets.is_empty() {
                    targets.insert(acting.handle);
                }

                let changes = adds
                    .iter()
                    .map(|url| (url, SubscriptionAction::Subscribe))
                    .chain(removes.iter().map(|url| (url, SubscriptionAction::Unsubscribe)));
                let planned = (adds.len() + removes.len()) * targets.len();
                let mut applied = 0;

                for (url, action) in changes {
                    for &handle in &targets {
                        tx.append_subscription_event(&user_owned, handle, url, &action, timestamp)
                            .map_err(|e| abort_after(applied, planned, e))?;
                        applied += 1;
                    }
                }

                Ok((targets.into_iter().collect(), timestamp))
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, kind = %e.kind(), "subscription upload rolled back");
                e
            })?;

        tracing::info!(fan_out = fan_out.len(), %timestamp, "subscription changes uploaded");

        Ok(UploadReceipt {
            fan_out_devices: fan_out,
            timestamp,
            update_urls: lists.update_urls,
        })
    }

    /// Podcasts added to and removed from a device since `since`.
    ///
    /// Covers every row stamped up to the server time of this read. The
    /// cursor is one second earlier, so rows committed later in that same
    /// second are picked up again by the next read. A client chaining reads
    /// by cursor may see a row twice but never misses one.
    #[tracing::instrument(skip(self))]
    pub async fn read_changes(&self, user: &str, device: &str, since: Timestamp) -> Result<ChangeSet> {
        let clock = Arc::clone(&self.clock);
        let (user, device) = (user.to_string(), device.to_string());

        let (changes, cursor) = self
            .store
            .read(move |tx| -> Result<(SubscriptionDiff, Timestamp)> {
                let now = clock.now();
                let device = resolve_device(tx, &user, &device)?;
                let events = tx.subscription_events_since(&user, device.handle, since)?;
                let changes = diff(events.iter().take_while(|e| e.timestamp <= now));
                Ok((changes, cursor_at(now)))
            })
            .await?;

        let (add, remove) = changes.into_lists();
        tracing::debug!(adds = add.len(), removes = remove.len(), %cursor, "read subscription changes");
        Ok(ChangeSet { add, remove, cursor })
    }

    /// Current subscriptions of one device.
    #[tracing::instrument(skip(self))]
    pub async fn device_subscriptions(&self, user: &str, device: &str) -> Result<Vec<String>> {
        let (user, device) = (user.to_string(), device.to_string());
        self.store
            .read(move |tx| -> Result<Vec<String>> {
                let device = resolve_device(tx, &user, &device)?;
                current_subscriptions(tx, &user, device.handle)
            })
            .await
    }

    /// Union of the current subscriptions of every device of a user, sorted.
    #[tracing::instrument(skip(self))]
    pub async fn all_subscriptions(&self, user: &str) -> Result<Vec<String>> {
        let user = user.to_string();
        self.store
            .read(move |tx| -> Result<Vec<String>> {
                let mut all = BTreeSet::new();
                for device in tx.list_devices(&user)? {
                    all.extend(current_subscriptions(tx, &user, device.handle)?);
                }
                Ok(all.into_iter().collect())
            })
            .await
    }

    /// Make a device's subscriptions exactly `urls`.
    ///
    /// Only the difference to the current state is written, and only for the
    /// acting device; peers are not touched.
    #[tracing::instrument(skip(self, urls), fields(urls = urls.len()))]
    pub async fn replace_subscriptions(
        &self,
        user: &str,
        device: &str,
        urls: &[String],
    ) -> Result<UploadReceipt> {
        let lists = validate_change_lists(urls, &[])?;
        check_batch(lists.len(), self.config.max_changes_per_upload)?;

        let clock = Arc::clone(&self.clock);
        let (user_owned, device_owned) = (user.to_string(), device.to_string());
        let wanted: BTreeSet<String> = lists.add.into_iter().collect();

        let (handle, added, removed, timestamp) = self
            .store
            .transaction(move |tx| -> Result<(DeviceHandle, usize, usize, Timestamp)> {
                let timestamp = clock.now();
                let acting = resolve_device(&*tx, &user_owned, &device_owned)?;
                let current: BTreeSet<String> =
                    current_subscriptions(&*tx, &user_owned, acting.handle)?.into_iter().collect();

                let to_add: Vec<_> = wanted.difference(&current).collect();
                let to_remove: Vec<_> = current.difference(&wanted).collect();
                let planned = to_add.len() + to_remove.len();
                let mut applied = 0;

                let changes = to_add
                    .iter()
                    .map(|url| (*url, SubscriptionAction::Subscribe))
                    .chain(to_remove.iter().map(|url| (*url, SubscriptionAction::Unsubscribe)));
                for (url, action) in changes {
                    tx.append_subscription_event(&user_owned, acting.handle, url, &action, timestamp)
                        .map_err(|e| abort_after(applied, planned, e))?;
                    applied += 1;
                }

                Ok((acting.handle, to_add.len(), to_remove.len(), timestamp))
            })
            .await?;

        tracing::info!(added, removed, %timestamp, "subscriptions replaced");

        Ok(UploadReceipt {
            fan_out_devices: vec![handle],
            timestamp,
            update_urls: lists.update_urls,
        })
    }

    /// Every device of a user with its current subscription count.
    #[tracing::instrument(skip(self))]
    pub async fn device_summaries(&self, user: &str) -> Result<Vec<DeviceSummary>> {
        let user = user.to_string();
        self.store
            .read(move |tx| -> Result<Vec<DeviceSummary>> {
                tx.list_devices(&user)?
                    .into_iter()
                    .map(|device| -> Result<DeviceSummary> {
                        let subscriptions = current_subscriptions(tx, &user, device.handle)?.len();
                        Ok(DeviceSummary {
                            name: device.name,
                            caption: device.caption,
                            kind: device.kind,
                            subscriptions,
                        })
                    })
                    .collect()
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Episode Actions
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a batch of episode actions.
    ///
    /// Each action names its recording device. Actions keep the timestamp
    /// the client sent as payload; the server's receive time, taken inside
    /// the transaction, is what `since` and cursors compare against. The
    /// batch is stored entirely or not at all.
    #[tracing::instrument(skip(self, actions), fields(actions = actions.len()))]
    pub async fn upload_episode_actions(
        &self,
        user: &str,
        actions: Vec<EpisodeActionEvent>,
    ) -> Result<EpisodeUploadReceipt> {
        check_batch(actions.len(), self.config.max_episode_actions_per_upload)?;
        if self.config.validate_on_upload {
            for action in &actions {
                validate_episode_action(action).map_err(|e| {
                    tracing::warn!(error = %e, "rejected episode action upload");
                    e
                })?;
            }
        }

        let clock = Arc::clone(&self.clock);
        let user = user.to_string();

        let (stored, timestamp) = self
            .store
            .transaction(move |tx| -> Result<(usize, Timestamp)> {
                let received = clock.now();
                let mut handles: BTreeMap<String, DeviceHandle> = BTreeMap::new();
                let planned = actions.len();

                for (applied, action) in actions.iter().enumerate() {
                    let handle = match handles.get(&action.device) {
                        Some(handle) => *handle,
                        None => {
                            let handle = resolve_device(&*tx, &user, &action.device)?.handle;
                            handles.insert(action.device.clone(), handle);
                            handle
                        }
                    };
                    tx.append_episode_action(handle, action, received)
                        .map_err(|e| abort_after(applied, planned, e))?;
                }
                Ok((planned, received))
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, kind = %e.kind(), "episode upload rolled back");
                e
            })?;

        tracing::info!(stored, %timestamp, "episode actions uploaded");
        Ok(EpisodeUploadReceipt { timestamp, stored })
    }

    /// Episode actions of a user matching `query`, oldest first.
    ///
    /// `query.since` and the returned cursor are server receive times, so an
    /// action recorded offline with an old client timestamp still reaches
    /// readers that already moved past it. Same cursor rule as
    /// [`read_changes`](Self::read_changes).
    #[tracing::instrument(skip(self))]
    pub async fn read_episode_actions(
        &self,
        user: &str,
        query: &EpisodeActionQuery,
    ) -> Result<EpisodeActionsPage> {
        let clock = Arc::clone(&self.clock);
        let user = user.to_string();
        let query = query.clone();

        let (actions, cursor) = self
            .store
            .read(move |tx| -> Result<(Vec<EpisodeActionEvent>, Timestamp)> {
                let now = clock.now();
                if let Some(device) = &query.device {
                    resolve_device(tx, &user, device)?;
                }
                Ok((tx.episode_actions_since(&user, &query)?, cursor_at(now)))
            })
            .await?;

        Ok(EpisodeActionsPage { actions, cursor })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync Groups
    // ─────────────────────────────────────────────────────────────────────────

    /// Link devices into one sync-group; the first name is the pivot.
    #[tracing::instrument(skip(self))]
    pub async fn link_devices(&self, user: &str, names: &[String]) -> Result<()> {
        let now = self.clock.now();
        let groups = self.groups;
        let (user, names) = (user.to_string(), names.to_vec());

        let group = self
            .store
            .transaction(move |tx| groups.link(tx, &user, names.as_slice(), now).map_err(Error::from))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, kind = %e.kind(), "link rolled back");
                e
            })?;

        tracing::info!(group = ?group, "devices linked");
        Ok(())
    }

    /// Take a device out of its sync-group.
    #[tracing::instrument(skip(self))]
    pub async fn unlink_device(&self, user: &str, name: &str) -> Result<()> {
        let groups = self.groups;
        let (user, name) = (user.to_string(), name.to_string());

        self.store
            .transaction(move |tx| groups.unlink(tx, &user, &name).map_err(Error::from))
            .await?;

        tracing::info!("device unlinked");
        Ok(())
    }

    /// Which of the user's devices are synchronized with which.
    #[tracing::instrument(skip(self))]
    pub async fn sync_status(&self, user: &str) -> Result<SyncStatus> {
        let groups = self.groups;
        let user = user.to_string();
        self.store
            .read(move |tx| groups.sync_status(tx, &user).map_err(Error::from))
            .await
    }

    /// Apply a combined link/unlink request and return the resulting status.
    ///
    /// All links run first, then all unlinks, in one transaction.
    #[tracing::instrument(skip(self))]
    pub async fn update_sync(&self, user: &str, request: &SyncRequest) -> Result<SyncStatus> {
        let now = self.clock.now();
        let groups = self.groups;
        let (user, request) = (user.to_string(), request.clone());

        let status = self
            .store
            .transaction(move |tx| -> Result<SyncStatus> {
                groups.apply_sync_request(tx, &user, &request, now)?;
                Ok(groups.sync_status(&*tx, &user)?)
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, kind = %e.kind(), "sync update rolled back");
                e
            })?;

        tracing::info!(groups = status.synchronized.len(), "sync groups updated");
        Ok(status)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn resolve_device(tx: &dyn StoreTx, user: &str, name: &str) -> Result<Device> {
    tx.find_device(user, name)?
        .ok_or_else(|| Error::device_not_found(user, name))
}

/// `add` side of the diff over a device's whole history.
fn current_subscriptions(tx: &dyn StoreTx, user: &str, device: DeviceHandle) -> Result<Vec<String>> {
    let events = tx.subscription_events_since(user, device, Timestamp::EPOCH)?;
    Ok(diff(&events).add.into_iter().collect())
}

/// Cursor handed out by a read at `now`.
///
/// Stamps are whole seconds, so a later commit can still land in the read's
/// own second; starting the next read one second back picks it up.
fn cursor_at(now: Timestamp) -> Timestamp {
    Timestamp(now.as_unix().saturating_sub(1))
}

/// A failure after some rows of a batch were written aborts the batch.
fn abort_after(applied: usize, planned: usize, e: StoreError) -> StoreError {
    if applied == 0 {
        e
    } else {
        StoreError::aborted(applied, planned, e)
    }
}
