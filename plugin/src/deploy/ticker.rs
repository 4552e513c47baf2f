//! Periodic progress narration while waiting on a deployment

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::job::context::JobContext;

/// Narration period
pub const TICK_PERIOD: Duration = Duration::from_secs(5);

/// Logs "deployment in progress" lines until stopped
///
/// Stopping is idempotent and also happens on drop, so every exit path of the
/// enclosing wait ends the narration.
#[derive(Debug)]
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Start narrating for `subject`
    pub fn start(job: Arc<dyn JobContext>, subject: String, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let t0 = Instant::now();
            let mut interval = tokio::time::interval_at(t0 + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let tick = interval.tick().await;
                let elapsed = tick.duration_since(t0).as_secs();
                job.info(&format!(
                    "Application {} deployment in progress [{} seconds] please wait...",
                    subject, elapsed
                ));
            }
        });
        Self { handle }
    }

    /// Stop narrating
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
