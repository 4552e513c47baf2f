//! Bounded retry loop shared by the submit and follow-up phases

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::errors::PluginError;

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts allowed after the first one
    pub max_retries: u32,

    /// Delay before every attempt but the first
    pub delay: Duration,

    /// Upper bound for a single attempt
    pub per_attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            delay: Duration::from_secs(5),
            per_attempt_timeout: None,
        }
    }
}

/// Classification of one attempt
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// Terminal, stop with this value
    Success(T),

    /// Terminal, stop with this error
    Failure(PluginError),

    /// Transient, try again after the delay
    Retry(String),
}

impl<T> AttemptOutcome<T> {
    /// Classify a remote call result: retryable errors loop, others stop
    pub fn from_result(result: Result<T, PluginError>) -> Self {
        match result {
            Ok(value) => AttemptOutcome::Success(value),
            Err(e) if e.is_retryable() => AttemptOutcome::Retry(e.to_string()),
            Err(e) => AttemptOutcome::Failure(e),
        }
    }
}

/// Drive `op` until it reaches a terminal outcome
///
/// `op` receives the zero-based attempt number. `sleep_fn` is awaited with the
/// policy delay between attempts, never before the first one. Fails with
/// `RetriesExhausted` once `max_retries` extra attempts were all transient.
pub async fn retry<T, Op, Fut, S, SF>(
    policy: &RetryPolicy,
    mut op: Op,
    sleep_fn: S,
) -> Result<T, PluginError>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
    S: Fn(Duration) -> SF,
    SF: Future<Output = ()>,
{
    let mut attempt: u32 = 0;
    loop {
        if attempt > 0 {
            sleep_fn(policy.delay).await;
        }

        let outcome = match policy.per_attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, op(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => AttemptOutcome::Retry(format!(
                    "attempt timed out after {}ms",
                    limit.as_millis()
                )),
            },
            None => op(attempt).await,
        };

        match outcome {
            AttemptOutcome::Success(value) => return Ok(value),
            AttemptOutcome::Failure(err) => return Err(err),
            AttemptOutcome::Retry(reason) => {
                debug!(attempt, max_retries = policy.max_retries, "Transient outcome: {}", reason);
                if attempt >= policy.max_retries {
                    return Err(PluginError::RetriesExhausted {
                        attempts: attempt.saturating_add(1),
                        last: reason,
                    });
                }
                attempt += 1;
            }
        }
    }
}

/// Sleep on the tokio timer
pub async fn tokio_sleep(duration: Duration) {
    tokio::time::sleep(duration).await
}
