//! Log events: the immutable rows of the subscription and episode history.

use serde::{Deserialize, Serialize};

use crate::time::{iso8601, Timestamp};
use crate::types::DeviceHandle;

/// What a subscription event did.
///
/// Stored as its label. Labels other than `SUBSCRIBE` and `UNSUBSCRIBE` can
/// exist in an older log; they read back as [`SubscriptionAction::Unknown`]
/// and the diff skips them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
    Unknown(String),
}

impl SubscriptionAction {
    /// Label as stored in the log.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Unknown(label) => label,
        }
    }

    /// Parse a stored label. Matching is exact.
    pub fn from_label(label: &str) -> Self {
        match label {
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether the diff counts this action.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for SubscriptionAction {
    fn from(label: String) -> Self {
        match label.as_str() {
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            _ => Self::Unknown(label),
        }
    }
}

impl From<SubscriptionAction> for String {
    fn from(action: SubscriptionAction) -> Self {
        match action {
            SubscriptionAction::Unknown(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

/// One row of the subscription log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub user: String,
    pub device: DeviceHandle,
    pub podcast: String,
    pub action: SubscriptionAction,
    pub timestamp: Timestamp,
}

impl SubscriptionEvent {
    pub fn subscribe(
        user: impl Into<String>,
        device: DeviceHandle,
        podcast: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            user: user.into(),
            device,
            podcast: podcast.into(),
            action: SubscriptionAction::Subscribe,
            timestamp,
        }
    }

    pub fn unsubscribe(
        user: impl Into<String>,
        device: DeviceHandle,
        podcast: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            action: SubscriptionAction::Unsubscribe,
            ..Self::subscribe(user, device, podcast, timestamp)
        }
    }
}

/// One row of the episode-action log.
///
/// `device` is the device *name*; the store resolves it to a handle on
/// append and joins it back on read. Position, start and total are in
/// seconds and default to zero when a client omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeActionEvent {
    pub podcast: String,
    pub episode: String,
    pub device: String,
    pub action: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub started: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(with = "iso8601")]
    pub timestamp: Timestamp,
}

/// Filter for reading the episode-action log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeActionQuery {
    /// Only actions recorded for this device name.
    pub device: Option<String>,
    /// Only actions on this podcast URL.
    pub podcast: Option<String>,
    /// Only actions the server received strictly after this time.
    pub since: Option<Timestamp>,
}

impl EpisodeActionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn podcast(mut self, podcast: impl Into<String>) -> Self {
        self.podcast = Some(podcast.into());
        self
    }

    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    /// Whether `event`, received by the server at `received`, passes the
    /// podcast and time filters.
    ///
    /// The device filter is applied by the store, which knows the device
    /// behind each row.
    pub fn matches(&self, event: &EpisodeActionEvent, received: Timestamp) -> bool {
        if let Some(podcast) = &self.podcast {
            if &event.podcast != podcast {
                return false;
            }
        }
        match self.since {
            Some(since) => received > since,
            None => true,
        }
    }
}
