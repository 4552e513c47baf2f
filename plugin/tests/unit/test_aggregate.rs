//! Sub-deployment aggregator unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdsdeploy::deploy::aggregate::{
    Aggregator, SubDeployment, SubDeploymentStatus, SubDeploymentWaiter,
};
use cdsdeploy::errors::PluginError;
use cdsdeploy::job::context::{Job, JobContext};
use cdsdeploy::job::sink::MemorySink;

/// Waiter answering after a fixed delay with a scripted verdict per id
struct ScriptedWaiter {
    script: HashMap<String, (Duration, bool)>,
    calls: AtomicU32,
}

impl ScriptedWaiter {
    fn new(script: &[(&str, Duration, bool)]) -> Arc<Self> {
        Arc::new(Self {
            script: script
                .iter()
                .map(|(id, delay, ok)| (id.to_string(), (*delay, *ok)))
                .collect(),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl SubDeploymentWaiter for ScriptedWaiter {
    async fn wait(&self, id: &str) -> Result<(), PluginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, ok) = self.script.get(id).copied().unwrap_or((Duration::ZERO, false));
        tokio::time::sleep(delay).await;
        if ok {
            Ok(())
        } else {
            Err(PluginError::DeploymentFailed(format!("{id} rolled back")))
        }
    }
}

fn job() -> (Arc<dyn JobContext>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let job: Arc<dyn JobContext> = Arc::new(Job::new(HashMap::new(), sink.clone()));
    (job, sink)
}

fn deployments(ids: &[&str], timeout: Duration) -> Vec<SubDeployment> {
    ids.iter().map(|id| SubDeployment::new(*id, timeout)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_one_failure_fails_the_whole() {
    let (job, sink) = job();
    let waiter = ScriptedWaiter::new(&[
        ("d-1", Duration::from_secs(1), true),
        ("d-2", Duration::from_secs(2), true),
        ("d-3", Duration::from_secs(3), false),
    ]);

    let result = Aggregator::new()
        .wait_all(
            job,
            deployments(&["d-1", "d-2", "d-3"], Duration::from_secs(30)),
            waiter.clone(),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.outcomes.len(), 3);
    assert!(result.details.contains("d-3"));
    assert!(!result.details.contains("d-1"));
    assert_eq!(waiter.calls.load(Ordering::SeqCst), 3);
    assert!(sink.contains("Error on deployment d-3"));
    assert!(sink.contains("Deployment d-1 succeeded"));
}

#[tokio::test(start_paused = true)]
async fn test_all_succeed() {
    let (job, _) = job();
    let waiter = ScriptedWaiter::new(&[
        ("d-1", Duration::from_millis(500), true),
        ("d-2", Duration::from_millis(100), true),
    ]);

    let result = Aggregator::new()
        .wait_all(job, deployments(&["d-1", "d-2"], Duration::from_secs(5)), waiter)
        .await;

    assert!(result.success);
    assert!(result.details.is_empty());
    assert!(result.outcomes.iter().all(|o| o.is_success()));
}

#[tokio::test]
async fn test_empty_set_is_success() {
    let (job, sink) = job();
    let waiter = ScriptedWaiter::new(&[]);

    let result = Aggregator::new().wait_all(job, Vec::new(), waiter.clone()).await;

    assert!(result.success);
    assert!(result.outcomes.is_empty());
    assert_eq!(waiter.calls.load(Ordering::SeqCst), 0);
    assert!(sink.lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timer_wins_over_slow_poll() {
    let (job, sink) = job();
    let timeout = Duration::from_secs(10);
    // the poll would report success at timeout + 2s, after the timer fires at timeout + 1s
    let waiter = ScriptedWaiter::new(&[("slow", timeout + Duration::from_secs(2), true)]);

    let started = tokio::time::Instant::now();
    let result = Aggregator::new()
        .wait_all(job, deployments(&["slow"], timeout), waiter)
        .await;

    assert!(!result.success);
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(
        result.outcomes[0].status,
        SubDeploymentStatus::TimedOut(timeout + Duration::from_secs(1))
    );
    assert!(result.details.contains("timed out"));
    assert!(started.elapsed() < timeout + Duration::from_secs(2));

    // the dropped poll never writes a second result
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!sink.contains("Deployment slow succeeded"));
}

#[tokio::test(start_paused = true)]
async fn test_fast_poll_beats_timer() {
    let (job, _) = job();
    let waiter = ScriptedWaiter::new(&[("fast", Duration::from_millis(200), true)]);

    let result = Aggregator::with_grace(Duration::ZERO)
        .wait_all(job, deployments(&["fast"], Duration::from_secs(1)), waiter)
        .await;

    assert!(result.success);
    assert_eq!(result.outcomes[0].status, SubDeploymentStatus::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_many_failures_never_block() {
    let (job, _) = job();
    let ids: Vec<String> = (0..64).map(|i| format!("d-{i}")).collect();
    let script: Vec<(&str, Duration, bool)> = ids
        .iter()
        .map(|id| (id.as_str(), Duration::ZERO, false))
        .collect();
    let waiter = ScriptedWaiter::new(&script);
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let result = tokio::time::timeout(
        Duration::from_secs(60),
        Aggregator::new().wait_all(job, deployments(&refs, Duration::from_secs(30)), waiter),
    )
    .await
    .expect("aggregator must not deadlock");

    assert!(!result.success);
    assert_eq!(result.outcomes.len(), 64);
}

/// Waiter that keeps polling until it is dropped
struct EndlessWaiter {
    polls: AtomicU32,
}

#[async_trait]
impl SubDeploymentWaiter for EndlessWaiter {
    async fn wait(&self, _id: &str) -> Result<(), PluginError> {
        loop {
            self.polls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropping_wait_all_stops_polling() {
    let (job, _) = job();
    let waiter = Arc::new(EndlessWaiter {
        polls: AtomicU32::new(0),
    });

    let waited = tokio::time::timeout(
        Duration::from_millis(2500),
        Aggregator::new().wait_all(
            job,
            deployments(&["stuck"], Duration::from_secs(30)),
            waiter.clone(),
        ),
    )
    .await;
    assert!(waited.is_err());
    tokio::task::yield_now().await;

    let at_drop = waiter.polls.load(Ordering::SeqCst);
    assert_eq!(at_drop, 3);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(waiter.polls.load(Ordering::SeqCst), at_drop);
}

#[tokio::test(start_paused = true)]
async fn test_huge_timeout_does_not_overflow() {
    let (job, _) = job();
    let waiter = ScriptedWaiter::new(&[("d-1", Duration::from_millis(10), true)]);

    let result = Aggregator::new()
        .wait_all(
            job,
            deployments(&["d-1"], Duration::from_secs(u64::MAX)),
            waiter,
        )
        .await;

    assert!(result.success);
    assert_eq!(result.outcomes[0].status, SubDeploymentStatus::Succeeded);
}
