//! Error types for the reconciliation service.

use std::fmt;

use castsync_core::ValidationError;
use castsync_store::StoreError;
use castsync_sync::GroupError;
use thiserror::Error;

/// Errors that can occur during service operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync-group error.
    #[error("sync group error: {0}")]
    Group(#[from] GroupError),

    /// Device name did not resolve for this user.
    #[error("device not found: {user}/{device}")]
    DeviceNotFound { user: String, device: String },
}

/// How a caller should react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown user, device, or group. Terminal.
    NotFound,
    /// A multi-row write was aborted or the database was busy. Retry the
    /// whole batch.
    Conflict,
    /// Malformed request. Terminal.
    InvalidInput,
    /// Storage failed. Left to the caller's backoff.
    StoreUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidInput => "invalid_input",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub(crate) fn device_not_found(user: &str, device: &str) -> Self {
        Self::DeviceNotFound {
            user: user.to_string(),
            device: device.to_string(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Store(e) => store_kind(e),
            Self::Group(GroupError::DeviceNotFound { .. }) => ErrorKind::NotFound,
            Self::Group(GroupError::EmptyLink) => ErrorKind::InvalidInput,
            Self::Group(GroupError::Store(e)) => store_kind(e),
            Self::DeviceNotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Whether retrying the same call unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

fn store_kind(e: &StoreError) -> ErrorKind {
    match e {
        StoreError::NotFound(_) => ErrorKind::NotFound,
        StoreError::InvalidData(_) => ErrorKind::InvalidInput,
        StoreError::Aborted { .. } => ErrorKind::Conflict,
        e if e.is_busy() => ErrorKind::Conflict,
        _ => ErrorKind::StoreUnavailable,
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;
