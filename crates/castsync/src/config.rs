//! Service configuration.

/// Configuration for [`ReconciliationService`](crate::ReconciliationService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Check required fields and offsets of uploaded episode actions.
    ///
    /// Subscription URL lists are always sanitized; the diff depends on it.
    pub validate_on_upload: bool,
    /// Most distinct URLs one subscription upload may touch. `0` disables the limit.
    pub max_changes_per_upload: usize,
    /// Most episode actions one upload may carry. `0` disables the limit.
    pub max_episode_actions_per_upload: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            validate_on_upload: true,
            max_changes_per_upload: 1_000,
            max_episode_actions_per_upload: 5_000,
        }
    }
}

impl ServiceConfig {
    /// No limits and no episode validation.
    pub fn permissive() -> Self {
        Self {
            validate_on_upload: false,
            max_changes_per_upload: 0,
            max_episode_actions_per_upload: 0,
        }
    }

    pub fn with_max_changes(mut self, limit: usize) -> Self {
        self.max_changes_per_upload = limit;
        self
    }

    pub fn with_max_episode_actions(mut self, limit: usize) -> Self {
        self.max_episode_actions_per_upload = limit;
        self
    }
}

/// `Err(BatchTooLarge)` when `got` exceeds a non-zero `limit`.
pub(crate) fn check_batch(got: usize, limit: usize) -> Result<(), castsync_core::ValidationError> {
    if limit > 0 && got > limit {
        return Err(castsync_core::ValidationError::BatchTooLarge { got, limit });
    }
    Ok(())
}
