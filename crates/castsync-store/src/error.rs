//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Referenced user, device, or group does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row the log refuses to hold, or a stored row that does not decode.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A multi-row write failed partway and was rolled back.
    #[error("transaction aborted after {applied} of {planned} writes: {source}")]
    Aborted {
        applied: usize,
        planned: usize,
        #[source]
        source: Box<StoreError>,
    },

    /// The store could not be reached (poisoned lock, worker thread gone, injected fault).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// SQLite reported the database busy or locked by another writer.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Aborted { source, .. } => source.is_busy(),
            _ => false,
        }
    }

    /// Wrap a failure that interrupted a multi-row write.
    pub fn aborted(applied: usize, planned: usize, source: StoreError) -> Self {
        Self::Aborted {
            applied,
            planned,
            source: Box::new(source),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
