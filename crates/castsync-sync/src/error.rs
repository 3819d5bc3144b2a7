//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur while managing sync-groups.
#[derive(Debug, Error)]
pub enum GroupError {
    /// A device name did not resolve for this user.
    #[error("device not found: {user}/{device}")]
    DeviceNotFound { user: String, device: String },

    /// A link request named no devices.
    #[error("link request names no devices")]
    EmptyLink,

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] castsync_store::StoreError),
}

impl GroupError {
    pub(crate) fn device_not_found(user: &str, device: &str) -> Self {
        Self::DeviceNotFound {
            user: user.to_string(),
            device: device.to_string(),
        }
    }
}

/// Result type for sync-group operations.
pub type Result<T> = std::result::Result<T, GroupError>;
