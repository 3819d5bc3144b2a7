//! Database schema migrations for SQLite.
//!
//! Versioned and forward-only: each migration moves the schema from version
//! N to N+1 inside a single transaction.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// Idempotent: running it on an up-to-date database does nothing.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database is at version {current}, newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at)
                 VALUES (?1, CAST(strftime('%s', 'now') AS INTEGER))",
                [version],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE
        );

        CREATE TABLE sync_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL
        );

        -- A device belongs to at most one group through its own pointer.
        CREATE TABLE devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            caption TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL DEFAULT 'other',
            sync_group_id INTEGER REFERENCES sync_groups(id),
            UNIQUE(user_id, name)
        );

        CREATE TABLE subscription_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            device_id INTEGER NOT NULL REFERENCES devices(id),
            podcast TEXT NOT NULL,
            action TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE episode_actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id INTEGER NOT NULL REFERENCES devices(id),
            podcast TEXT NOT NULL,
            episode TEXT NOT NULL,
            action TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            started INTEGER NOT NULL DEFAULT 0,
            total INTEGER NOT NULL DEFAULT 0,
            timestamp INTEGER NOT NULL
        );

        -- Log rows are immutable. Deletion is left to retention jobs.
        CREATE TRIGGER subscription_events_append_only
        BEFORE UPDATE ON subscription_events
        BEGIN
            SELECT RAISE(ABORT, 'subscription_events is append-only');
        END;

        CREATE TRIGGER episode_actions_append_only
        BEFORE UPDATE ON episode_actions
        BEGIN
            SELECT RAISE(ABORT, 'episode_actions is append-only');
        END;

        CREATE INDEX idx_devices_group ON devices(sync_group_id);
        CREATE INDEX idx_subscription_events_device
            ON subscription_events(user_id, device_id, timestamp);
        CREATE INDEX idx_episode_actions_device ON episode_actions(device_id, timestamp);
        "#,
    )?;

    Ok(())
}

/// Migration v2: server receive time on episode actions.
///
/// Existing rows take their client timestamp as the best available guess.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE episode_actions ADD COLUMN received_at INTEGER NOT NULL DEFAULT 0;

        DROP TRIGGER episode_actions_append_only;
        UPDATE episode_actions SET received_at = timestamp;
        CREATE TRIGGER episode_actions_append_only
        BEFORE UPDATE ON episode_actions
        BEGIN
            SELECT RAISE(ABORT, 'episode_actions is append-only');
        END;

        CREATE INDEX idx_episode_actions_received ON episode_actions(received_at);
        "#,
    )?;

    Ok(())
}
