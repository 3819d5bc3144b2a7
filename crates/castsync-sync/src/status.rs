//! Sync status snapshots and combined link/unlink requests.

use serde::{Deserialize, Serialize};

/// Which of a user's devices are synchronized with which.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// One entry per sync-group, each listing its device names sorted.
    /// Groups are ordered by group id.
    pub synchronized: Vec<Vec<String>>,

    /// Names of the devices that belong to no group, sorted.
    #[serde(rename = "not-synchronize")]
    pub not_synchronized: Vec<String>,
}

impl SyncStatus {
    /// Whether `a` and `b` are listed in the same group.
    pub fn are_synchronized(&self, a: &str, b: &str) -> bool {
        self.synchronized
            .iter()
            .any(|group| group.iter().any(|d| d == a) && group.iter().any(|d| d == b))
    }
}

/// A batch of link and unlink operations applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Device name lists to link; the first name of each list is its pivot.
    #[serde(default)]
    pub synchronize: Vec<Vec<String>>,

    /// Device names to take out of their group.
    #[serde(default, rename = "stop-synchronize")]
    pub stop_synchronize: Vec<String>,
}

impl SyncRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a list of devices to link.
    pub fn synchronize<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synchronize.push(names.into_iter().map(Into::into).collect());
        self
    }

    /// Add a device to unlink.
    pub fn stop(mut self, name: impl Into<String>) -> Self {
        self.stop_synchronize.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.synchronize.is_empty() && self.stop_synchronize.is_empty()
    }
}
