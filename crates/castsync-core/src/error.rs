//! Error types for castsync core.

use thiserror::Error;

/// Validation errors for incoming changes and log events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("podcast URL is empty")]
    EmptyUrl,

    #[error("podcast URL {0:?} appears in both add and remove")]
    AddRemoveOverlap(String),

    #[error("unrecognized subscription action: {0:?}")]
    UnknownAction(String),

    #[error("episode action is missing field {0:?}")]
    MissingField(&'static str),

    #[error("episode action field {field:?} must not be negative, got {value}")]
    NegativeField { field: &'static str, value: i64 },

    #[error("batch of {got} entries exceeds the limit of {limit}")]
    BatchTooLarge { got: usize, limit: usize },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
