//! Concurrent wait on several sub-deployments
//!
//! Every sub-deployment gets a slot task racing its poll loop against a
//! timer. Whichever side settles the slot first writes the only result for
//! that slot; the loser is dropped. Once every slot task has joined, the
//! results are drained from the channel and AND-reduced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::errors::PluginError;
use crate::job::context::JobContext;

/// Extra time granted on top of a sub-deployment timeout before the timer
/// declares it failed.
pub const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Waits until one sub-deployment reaches a terminal state
#[async_trait]
pub trait SubDeploymentWaiter: Send + Sync + 'static {
    async fn wait(&self, id: &str) -> Result<(), PluginError>;
}

/// One concurrently tracked deployment unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubDeployment {
    pub id: String,
    pub timeout: Duration,
}

impl SubDeployment {
    pub fn new(id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            id: id.into(),
            timeout,
        }
    }
}

/// Terminal state of a sub-deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubDeploymentStatus {
    Succeeded,
    Failed(String),
    TimedOut(Duration),
}

/// Result written into a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubDeploymentOutcome {
    pub id: String,
    pub status: SubDeploymentStatus,
}

impl SubDeploymentOutcome {
    pub fn is_success(&self) -> bool {
        self.status == SubDeploymentStatus::Succeeded
    }
}

/// Reduction of every sub-deployment outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub success: bool,
    pub details: String,
    pub outcomes: Vec<SubDeploymentOutcome>,
}

impl AggregateResult {
    fn reduce(expected: usize, outcomes: Vec<SubDeploymentOutcome>) -> Self {
        let mut causes: Vec<String> = outcomes
            .iter()
            .filter_map(|o| match &o.status {
                SubDeploymentStatus::Succeeded => None,
                SubDeploymentStatus::Failed(cause) => Some(format!("{}: {}", o.id, cause)),
                SubDeploymentStatus::TimedOut(after) => Some(
                    PluginError::Timeout {
                        id: o.id.clone(),
                        after: *after,
                    }
                    .to_string(),
                ),
            })
            .collect();
        if outcomes.len() < expected {
            causes.push(format!(
                "{} of {} deployments reported no result",
                expected - outcomes.len(),
                expected
            ));
        }

        Self {
            success: causes.is_empty(),
            details: causes.join("; "),
            outcomes,
        }
    }
}

/// Single-write result slot of one sub-deployment
struct ResultSlot {
    id: String,
    settled: AtomicBool,
    tx: mpsc::Sender<SubDeploymentOutcome>,
    job: Arc<dyn JobContext>,
}

impl ResultSlot {
    /// Write the slot result; only the first caller wins
    fn settle(&self, status: SubDeploymentStatus) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            debug!(id = %self.id, ?status, "Slot already settled, late result discarded");
            return false;
        }

        match &status {
            SubDeploymentStatus::Succeeded => {
                self.job.info(&format!("Deployment {} succeeded", self.id))
            }
            SubDeploymentStatus::Failed(cause) => self
                .job
                .error(&format!("Error on deployment {}: {}", self.id, cause)),
            SubDeploymentStatus::TimedOut(after) => self.job.error(&format!(
                "Deployment {} timed out after {}s",
                self.id,
                after.as_secs()
            )),
        }

        // one send per slot into a channel sized for every slot
        if let Err(e) = self.tx.try_send(SubDeploymentOutcome {
            id: self.id.clone(),
            status,
        }) {
            error!(id = %self.id, "Unable to record deployment outcome: {}", e);
        }
        true
    }
}

/// Fans out sub-deployment waits and reduces them to one verdict
#[derive(Debug, Clone)]
pub struct Aggregator {
    grace: Duration,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            grace: TIMEOUT_GRACE,
        }
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the grace added to every timeout
    pub fn with_grace(grace: Duration) -> Self {
        Self { grace }
    }

    /// Wait for every sub-deployment; any failure or timeout fails the whole
    ///
    /// An empty list is vacuously successful.
    pub async fn wait_all<W: SubDeploymentWaiter>(
        &self,
        job: Arc<dyn JobContext>,
        deployments: Vec<SubDeployment>,
        waiter: Arc<W>,
    ) -> AggregateResult {
        let expected = deployments.len();
        if expected == 0 {
            return AggregateResult::reduce(0, Vec::new());
        }
        info!(count = expected, "Waiting on sub-deployments");

        let (tx, mut rx) = mpsc::channel(expected);
        let mut wait_group = JoinSet::new();

        for deployment in deployments {
            let slot = Arc::new(ResultSlot {
                id: deployment.id.clone(),
                settled: AtomicBool::new(false),
                tx: tx.clone(),
                job: job.clone(),
            });
            let deadline = deployment.timeout.saturating_add(self.grace);
            let waiter = waiter.clone();

            // the poll future lives inside the slot task, so aborting the
            // wait group also stops every poll loop
            wait_group.spawn(async move {
                tokio::select! {
                    polled = waiter.wait(&slot.id) => {
                        let status = match polled {
                            Ok(()) => SubDeploymentStatus::Succeeded,
                            Err(e) => SubDeploymentStatus::Failed(e.to_string()),
                        };
                        slot.settle(status);
                    }
                    _ = tokio::time::sleep(deadline) => {
                        slot.settle(SubDeploymentStatus::TimedOut(deadline));
                    }
                }
            });
        }
        drop(tx);

        while let Some(joined) = wait_group.join_next().await {
            if let Err(e) = joined {
                error!("Sub-deployment slot task failed: {}", e);
            }
        }

        let mut outcomes = Vec::with_capacity(expected);
        while let Ok(outcome) = rx.try_recv() {
            outcomes.push(outcome);
        }

        AggregateResult::reduce(expected, outcomes)
    }
}
