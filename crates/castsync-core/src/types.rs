//! Strong type definitions for castsync.
//!
//! Store-assigned identifiers are newtypes so a device handle can never be
//! passed where a group id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal integer handle of a device, assigned by the store.
///
/// The human-facing device id is the device *name*, unique per user. The
/// handle is what the log and the group pointers reference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceHandle(pub i64);

impl DeviceHandle {
    /// Wrap a raw store id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw store id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceHandle({})", self.0)
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a sync-group row.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl GroupId {
    /// Wrap a raw store id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw store id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A device's nullable pointer to its sync-group.
pub type GroupRef = Option<GroupId>;

/// Status given to freshly created sync-groups.
pub const GROUP_STATUS_PENDING: &str = "pending";

/// A registered device as the core sees it.
///
/// Devices are created and updated by the registration collaborator; the
/// core only reads them and moves the `group` pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Store handle.
    pub handle: DeviceHandle,
    /// Owning username.
    pub user: String,
    /// Device name, unique per user.
    pub name: String,
    /// Free-form caption shown to the user.
    pub caption: String,
    /// Free-form type label (`laptop`, `mobile`, ...).
    pub kind: String,
    /// Current sync-group, if any.
    pub group: GroupRef,
}

impl Device {
    /// Whether the device currently belongs to a sync-group.
    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }
}
