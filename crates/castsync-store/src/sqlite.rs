//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use castsync_core::{
    validate_subscription_action, Device, DeviceHandle, EpisodeActionEvent, EpisodeActionQuery,
    GroupId, GroupRef, SubscriptionAction, SubscriptionEvent, Timestamp,
};

use crate::config::SqliteConfig;
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Directory, EventLog, GroupStore, Store, StoreTx};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All closures run under `spawn_blocking`
/// so the async runtime is never blocked on disk I/O.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path with default settings.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(SqliteConfig::new(path.as_ref()))
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::open_with(SqliteConfig::in_memory())
    }

    /// Open a database described by `config`.
    pub fn open_with(config: SqliteConfig) -> Result<Self> {
        let mut conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        conn.busy_timeout(config.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        if config.enable_wal && config.path.is_some() {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(journal_mode = %mode, "configured sqlite journal");
        }

        migration::migrate(&mut conn)?;
        tracing::info!(path = ?config.path, "opened sqlite store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Unavailable(format!("connection mutex poisoned: {}", e)))
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Unavailable(format!("spawn_blocking failed: {}", e))
}

#[async_trait]
impl Store for SqliteStore {
    async fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> std::result::Result<T, E> {
            let mut conn = lock(&conn)?;
            // IMMEDIATE takes the write lock up front, so a competing writer
            // fails at BEGIN instead of halfway through the closure.
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(StoreError::from)?;

            let outcome = f(&mut SqliteTx { conn: &*tx });

            match outcome {
                Ok(value) => {
                    tx.commit().map_err(StoreError::from)?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback) = tx.rollback() {
                        tracing::warn!(error = %rollback, "rollback failed");
                    }
                    Err(err)
                }
            }
        })
        .await
        .map_err(|e| E::from(join_error(e)))?
    }

    async fn read<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> std::result::Result<T, E> {
            let conn = lock(&conn)?;
            f(&SqliteTx { conn: &*conn })
        })
        .await
        .map_err(|e| E::from(join_error(e)))?
    }
}

/// Borrowed view over a connection or an open transaction.
struct SqliteTx<'c> {
    conn: &'c Connection,
}

const DEVICE_COLUMNS: &str = "d.id, u.username, d.name, d.caption, d.kind, d.sync_group_id";

// Helper to convert a row selected with DEVICE_COLUMNS to Device
fn row_to_device(row: &rusqlite::Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        handle: DeviceHandle(row.get(0)?),
        user: row.get(1)?,
        name: row.get(2)?,
        caption: row.get(3)?,
        kind: row.get(4)?,
        group: row.get::<_, Option<i64>>(5)?.map(GroupId),
    })
}

impl SqliteTx<'_> {
    fn user_id(&self, username: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user {username}")))
    }

    fn query_devices(&self, filter: &str, params: impl rusqlite::Params) -> Result<Vec<Device>> {
        let sql = format!(
            "SELECT {DEVICE_COLUMNS} FROM devices d JOIN users u ON u.id = d.user_id
             WHERE {filter} ORDER BY d.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let devices = stmt
            .query_map(params, row_to_device)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(devices)
    }
}

impl Directory for SqliteTx<'_> {
    fn upsert_user(&mut self, username: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (username) VALUES (?1) ON CONFLICT(username) DO NOTHING",
            params![username],
        )?;
        Ok(())
    }

    fn upsert_device(
        &mut self,
        user: &str,
        name: &str,
        caption: &str,
        kind: &str,
    ) -> Result<DeviceHandle> {
        let user_id = self.user_id(user)?;
        let id: i64 = self.conn.query_row(
            "INSERT INTO devices (user_id, name, caption, kind) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, name) DO UPDATE
                SET caption = excluded.caption, kind = excluded.kind
             RETURNING id",
            params![user_id, name, caption, kind],
            |row| row.get(0),
        )?;
        Ok(DeviceHandle(id))
    }

    fn find_device(&self, user: &str, name: &str) -> Result<Option<Device>> {
        let mut devices = self.query_devices("u.username = ?1 AND d.name = ?2", params![user, name])?;
        Ok(devices.pop())
    }

    fn device(&self, handle: DeviceHandle) -> Result<Option<Device>> {
        let mut devices = self.query_devices("d.id = ?1", params![handle.get()])?;
        Ok(devices.pop())
    }

    fn list_devices(&self, user: &str) -> Result<Vec<Device>> {
        let user_id = self.user_id(user)?;
        self.query_devices("d.user_id = ?1", params![user_id])
    }
}

impl GroupStore for SqliteTx<'_> {
    fn create_group(&mut self, status: &str, now: Timestamp) -> Result<GroupId> {
        self.conn.execute(
            "INSERT INTO sync_groups (status, created_at) VALUES (?1, ?2)",
            params![status, now.as_unix()],
        )?;
        Ok(GroupId(self.conn.last_insert_rowid()))
    }

    fn group_status(&self, group: GroupId) -> Result<Option<String>> {
        let status = self
            .conn
            .query_row(
                "SELECT status FROM sync_groups WHERE id = ?1",
                params![group.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status)
    }

    fn device_group(&self, device: DeviceHandle) -> Result<GroupRef> {
        let pointer: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT sync_group_id FROM devices WHERE id = ?1",
                params![device.get()],
                |row| row.get(0),
            )
            .optional()?;

        match pointer {
            Some(group) => Ok(group.map(GroupId)),
            None => Err(StoreError::NotFound(format!("device {device}"))),
        }
    }

    fn set_device_group(&mut self, device: DeviceHandle, group: GroupRef) -> Result<()> {
        if let Some(group) = group {
            if self.group_status(group)?.is_none() {
                return Err(StoreError::NotFound(format!("sync group {group}")));
            }
        }

        let updated = self.conn.execute(
            "UPDATE devices SET sync_group_id = ?1 WHERE id = ?2",
            params![group.map(GroupId::get), device.get()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("device {device}")));
        }
        Ok(())
    }

    fn devices_in_group(&self, group: GroupId) -> Result<Vec<Device>> {
        self.query_devices("d.sync_group_id = ?1", params![group.get()])
    }
}

impl EventLog for SqliteTx<'_> {
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
        let user_id = self.user_id(user)?;
        let owned: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM devices WHERE id = ?1 AND user_id = ?2)",
            params![device.get(), user_id],
            |row| row.get(0),
        )?;
        if !owned {
            return Err(StoreError::NotFound(format!("device {device} of user {user}")));
        }

        self.conn.execute(
            "INSERT INTO subscription_events (user_id, device_id, podcast, action, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, device.get(), podcast, action.as_str(), timestamp.as_unix()],
        )?;
        Ok(())
    }

    fn subscription_events_since(
        &self,
        user: &str,
        device: DeviceHandle,
        since: Timestamp,
    ) -> Result<Vec<SubscriptionEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.username, e.device_id, e.podcast, e.action, e.timestamp
             FROM subscription_events e JOIN users u ON u.id = e.user_id
             WHERE u.username = ?1 AND e.device_id = ?2 AND e.timestamp > ?3
             ORDER BY e.timestamp ASC, e.id ASC",
        )?;

        let events = stmt
            .query_map(params![user, device.get(), since.as_unix()], |row| {
                let action: String = row.get(3)?;
                Ok(SubscriptionEvent {
                    user: row.get(0)?,
                    device: DeviceHandle(row.get(1)?),
                    podcast: row.get(2)?,
                    action: SubscriptionAction::from_label(&action),
                    timestamp: Timestamp(row.get(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }

    fn append_episode_action(
        &mut self,
        device: DeviceHandle,
        action: &EpisodeActionEvent,
        received: Timestamp,
    ) -> Result<()> {
        if self.device(device)?.is_none() {
            return Err(StoreError::NotFound(format!("device {device}")));
        }

        self.conn.execute(
            "INSERT INTO episode_actions
                (device_id, podcast, episode, action, position, started, total, timestamp,
                 received_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                device.get(),
                action.podcast,
                action.episode,
                action.action,
                action.position,
                action.started,
                action.total,
                action.timestamp.as_unix(),
                received.as_unix(),
            ],
        )?;
        Ok(())
    }

    fn episode_actions_since(
        &self,
        user: &str,
        query: &EpisodeActionQuery,
    ) -> Result<Vec<EpisodeActionEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.podcast, a.episode, d.name, a.action, a.position, a.started, a.total,
                    a.timestamp
             FROM episode_actions a
             JOIN devices d ON d.id = a.device_id
             JOIN users u ON u.id = d.user_id
             WHERE u.username = ?1
               AND (?2 IS NULL OR d.name = ?2)
               AND (?3 IS NULL OR a.podcast = ?3)
               AND (?4 IS NULL OR a.received_at > ?4)
             ORDER BY a.id ASC",
        )?;

        let actions = stmt
            .query_map(
                params![
                    user,
                    query.device.as_deref(),
                    query.podcast.as_deref(),
                    query.since.map(Timestamp::as_unix),
                ],
                |row| {
                    Ok(EpisodeActionEvent {
                        podcast: row.get(0)?,
                        episode: row.get(1)?,
                        device: row.get(2)?,
                        action: row.get(3)?,
                        position: row.get(4)?,
                        started: row.get(5)?,
                        total: row.get(6)?,
                        timestamp: Timestamp(row.get(7)?),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(actions)
    }
}
