//! Classification of follow-up polls

use deploy_models::models::arsenal::FollowupState;

use crate::deploy::retry::AttemptOutcome;
use crate::errors::PluginError;

/// Tracks progress across consecutive polls of one follow-up handle
///
/// A progress that falls back to exactly zero after being positive means the
/// remote job was most likely cancelled on the platform side. This is a
/// heuristic, the remote service gives no such guarantee.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last_progress: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last progress seen, between 0.0 and 1.0
    pub fn last_progress(&self) -> f64 {
        self.last_progress
    }

    /// Classify one poll, `None` meaning the service had no state yet
    pub fn classify(&mut self, state: Option<FollowupState>) -> AttemptOutcome<FollowupState> {
        let Some(state) = state else {
            return AttemptOutcome::Retry("service unavailable, no state yet".to_string());
        };

        if state.done {
            self.last_progress = state.progress;
            return AttemptOutcome::Success(state);
        }

        if state.progress == 0.0 && self.last_progress > 0.0 {
            return AttemptOutcome::Failure(PluginError::CancelledExternally);
        }

        self.last_progress = state.progress;
        AttemptOutcome::Retry(format!(
            "deployment still in progress ({:.1}%)",
            state.progress * 100.0
        ))
    }
}
