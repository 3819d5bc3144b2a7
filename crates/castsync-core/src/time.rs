//! Second-resolution timestamps and the clock that produces them.
//!
//! Log rows are stamped with whole Unix seconds. Read cursors are the same
//! type, so a cursor handed to a client can be fed straight back as `since`.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Whole seconds since the Unix epoch.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The epoch; `since = EPOCH` means "the whole history".
    pub const EPOCH: Self = Self(0);

    /// Build from Unix seconds.
    pub const fn from_unix(secs: i64) -> Self {
        Self(secs)
    }

    /// Unix seconds.
    pub const fn as_unix(self) -> i64 {
        self.0
    }

    /// Current wall-clock time, truncated to the second.
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    /// Parse an ISO-8601 timestamp.
    ///
    /// Accepts RFC 3339 (`2024-03-01T10:00:00Z`, `...+02:00`) and the
    /// zone-less form gpodder clients send (`2024-03-01T10:00:00`), which is
    /// read as UTC. Fractional seconds are dropped.
    pub fn parse_iso8601(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.timestamp()));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self(naive.and_utc().timestamp()))
            .map_err(|e| ValidationError::InvalidTimestamp(format!("{s:?}: {e}")))
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(self) -> String {
        match DateTime::<Utc>::from_timestamp(self.0, 0) {
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

/// Serde adapter that writes a [`Timestamp`] as an ISO-8601 string.
///
/// Use with `#[serde(with = "castsync_core::time::iso8601")]`. Deserializing
/// also accepts a bare integer of Unix seconds.
pub mod iso8601 {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    use super::Timestamp;

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_iso8601())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an ISO-8601 timestamp or Unix seconds")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
                Timestamp::parse_iso8601(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
                Ok(Timestamp(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
                i64::try_from(v)
                    .map(Timestamp)
                    .map_err(|_| E::custom("timestamp out of range"))
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

/// Source of "now" for stamping log rows and read cursors.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
