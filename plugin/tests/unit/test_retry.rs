//! Retry engine unit tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use cdsdeploy::deploy::retry::{retry, AttemptOutcome, RetryPolicy};
use cdsdeploy::errors::PluginError;
use tokio_test::{assert_err, assert_ok};

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        delay: Duration::from_secs(5),
        per_attempt_timeout: None,
    }
}

#[tokio::test]
async fn test_bound_three_makes_four_attempts() {
    let attempts = AtomicU32::new(0);
    let sleeps = Mutex::new(Vec::new());

    let result: Result<(), _> = retry(
        &policy(3),
        |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { AttemptOutcome::Retry("service unavailable".to_string()) }
        },
        |d| {
            sleeps.lock().unwrap().push(d);
            async {}
        },
    )
    .await;

    match assert_err!(result) {
        PluginError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 4);
            assert_eq!(last, "service unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_secs(5); 3]);
}

#[tokio::test]
async fn test_bound_zero_makes_one_attempt() {
    let attempts = AtomicU32::new(0);
    let sleeps = AtomicU32::new(0);

    let result: Result<(), _> = retry(
        &policy(0),
        |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { AttemptOutcome::Retry("not yet".to_string()) }
        },
        |_| {
            sleeps.fetch_add(1, Ordering::SeqCst);
            async {}
        },
    )
    .await;

    assert!(matches!(result, Err(PluginError::RetriesExhausted { attempts: 1, .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(sleeps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_after_transient_attempts() {
    let sleeps = AtomicU32::new(0);

    let value = retry(
        &policy(10),
        |attempt| async move {
            if attempt < 2 {
                AttemptOutcome::Retry(format!("attempt {attempt}"))
            } else {
                AttemptOutcome::Success(attempt)
            }
        },
        |_| {
            sleeps.fetch_add(1, Ordering::SeqCst);
            async {}
        },
    )
    .await;

    assert_eq!(assert_ok!(value), 2);
    assert_eq!(sleeps.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failure_stops_immediately() {
    let attempts = AtomicU32::new(0);

    let result: Result<(), _> = retry(
        &policy(10),
        |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                AttemptOutcome::Failure(PluginError::RequestRejected {
                    status: 400,
                    body: "bad config".to_string(),
                })
            }
        },
        |_| async {},
    )
    .await;

    assert!(matches!(result, Err(PluginError::RequestRejected { status: 400, .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_from_result_classifies_errors() {
    let unavailable = AttemptOutcome::<()>::from_result(Err(PluginError::ServiceUnavailable(
        "503".to_string(),
    )));
    assert!(matches!(unavailable, AttemptOutcome::Retry(_)));

    let protocol =
        AttemptOutcome::<()>::from_result(Err(PluginError::Protocol("no token".to_string())));
    assert!(matches!(protocol, AttemptOutcome::Failure(_)));
}

#[tokio::test(start_paused = true)]
async fn test_per_attempt_timeout_counts_as_transient() {
    let attempts = AtomicU32::new(0);
    let policy = RetryPolicy {
        max_retries: 1,
        delay: Duration::from_millis(10),
        per_attempt_timeout: Some(Duration::from_millis(100)),
    };

    let result: Result<(), _> = retry(
        &policy,
        |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                AttemptOutcome::Success(())
            }
        },
        |d| tokio::time::sleep(d),
    )
    .await;

    match result {
        Err(PluginError::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 2);
            assert!(last.contains("timed out"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
