//! Input validation for uploads before they reach the log.

use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::event::{EpisodeActionEvent, SubscriptionAction};

/// Sanitized add/remove lists for one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLists {
    /// URLs to subscribe, de-duplicated, in first-seen order.
    pub add: Vec<String>,
    /// URLs to unsubscribe, de-duplicated, in first-seen order.
    pub remove: Vec<String>,
    /// `(as sent, as stored)` for every URL in the upload.
    pub update_urls: Vec<(String, String)>,
}

impl ChangeLists {
    /// Number of distinct URLs touched.
    pub fn len(&self) -> usize {
        self.add.len() + self.remove.len()
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Normalize a podcast URL as clients send it.
///
/// Surrounding whitespace is dropped. An empty result is rejected.
pub fn sanitize_url(url: &str) -> Result<String, ValidationError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    Ok(trimmed.to_string())
}

/// Sanitize an add/remove upload.
///
/// Duplicates inside one list collapse to a single entry, so a client that
/// sends the same URL twice does not leave a counter of two behind. A URL
/// present on both sides is ambiguous and rejected.
pub fn validate_change_lists(
    add: &[String],
    remove: &[String],
) -> Result<ChangeLists, ValidationError> {
    let mut out = ChangeLists::default();
    let mut seen_add = BTreeSet::new();
    let mut seen_remove = BTreeSet::new();

    for raw in add {
        let url = sanitize_url(raw)?;
        out.update_urls.push((raw.clone(), url.clone()));
        if seen_add.insert(url.clone()) {
            out.add.push(url);
        }
    }
    for raw in remove {
        let url = sanitize_url(raw)?;
        if seen_add.contains(&url) {
            return Err(ValidationError::AddRemoveOverlap(url));
        }
        out.update_urls.push((raw.clone(), url.clone()));
        if seen_remove.insert(url.clone()) {
            out.remove.push(url);
        }
    }

    Ok(out)
}

/// Only `SUBSCRIBE` and `UNSUBSCRIBE` may be appended.
pub fn validate_subscription_action(action: &SubscriptionAction) -> Result<(), ValidationError> {
    match action {
        SubscriptionAction::Unknown(label) => Err(ValidationError::UnknownAction(label.clone())),
        _ => Ok(()),
    }
}

/// Check the required fields and offsets of an uploaded episode action.
pub fn validate_episode_action(action: &EpisodeActionEvent) -> Result<(), ValidationError> {
    for (field, value) in [
        ("podcast", &action.podcast),
        ("episode", &action.episode),
        ("device", &action.device),
        ("action", &action.action),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field));
        }
    }
    for (field, value) in [
        ("position", action.position),
        ("started", action.started),
        ("total", action.total),
    ] {
        if value < 0 {
            return Err(ValidationError::NegativeField { field, value });
        }
    }
    Ok(())
}
