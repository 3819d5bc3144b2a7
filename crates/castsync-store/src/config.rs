//! Connection settings for [`SqliteStore`](crate::SqliteStore).

use std::path::PathBuf;
use std::time::Duration;

/// SQLite connection configuration.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// How long a writer waits on a locked database before failing with busy.
    pub busy_timeout: Duration,
    /// Enable Write-Ahead Logging (WAL) mode. Ignored for in-memory databases.
    pub enable_wal: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout: Duration::from_secs(5),
            enable_wal: true,
        }
    }
}

impl SqliteConfig {
    /// Configuration for a database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Configuration for an in-memory database.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sets the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enables or disables WAL mode.
    pub fn with_wal(mut self, enable: bool) -> Self {
        self.enable_wal = enable;
        self
    }
}
