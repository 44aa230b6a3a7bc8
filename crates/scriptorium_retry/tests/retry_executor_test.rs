//! Behavioural tests for the retry executor.

use scriptorium_error::{GenerationError, GenerationErrorKind, ScriptoriumError};
use scriptorium_retry::{RetryExecutor, RetryObserver, RetryPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingObserver {
    retries: Mutex<Vec<(usize, Duration)>>,
}

impl RetryObserver for RecordingObserver {
    fn on_retry(&self, _label: &str, attempt: usize, delay: Duration, _error: &str) {
        self.retries.lock().unwrap().push((attempt, delay));
    }
}

fn backend_error(message: &str) -> ScriptoriumError {
    GenerationError::new(GenerationErrorKind::Backend(message.to_string())).into()
}

fn executor() -> (RetryExecutor, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let executor = RetryExecutor::new(RetryPolicy::default()).with_observer(observer.clone());
    (executor, observer)
}

#[tokio::test(start_paused = true)]
async fn test_two_transient_failures_then_success() {
    let (executor, observer) = executor();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let result: Result<String, ScriptoriumError> = executor
        .run("chapter 1", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(backend_error("HTTP 503 Service Unavailable"))
            } else {
                Ok("It was a dark night.".to_string())
            }
        })
        .await;

    assert_eq!(result.unwrap(), "It was a dark night.");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let retries = observer.retries.lock().unwrap();
    assert_eq!(retries.len(), 2);
    assert_eq!(retries[0].0, 1);
    assert_eq!(retries[1].0, 2);
    assert!(retries[1].1 > retries[0].1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_is_not_retried() {
    let (executor, observer) = executor();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let result: Result<String, ScriptoriumError> = executor
        .run("outline", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(backend_error("invalid credentials"))
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("invalid credentials"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(observer.retries.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhaustion_returns_last_error() {
    let (executor, observer) = executor();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let result: Result<String, ScriptoriumError> = executor
        .run("epilogue", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Err(backend_error(&format!("model overloaded (attempt {})", n + 1)))
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("attempt 4"));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(observer.retries.lock().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_custom_classifier_overrides_error_type() {
    let executor = RetryExecutor::new(RetryPolicy::default().with_max_retries(1));
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let result: Result<(), String> = executor
        .execute(
            "custom",
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("flaky".to_string())
            },
            |e: &String| e == "flaky",
        )
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sleeps_follow_backoff_curve() {
    let (executor, _observer) = executor();
    let calls = AtomicUsize::new(0);
    let counter = &calls;
    let start = tokio::time::Instant::now();

    let _: Result<(), ScriptoriumError> = executor
        .run("timing", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(backend_error("request timeout"))
            } else {
                Ok(())
            }
        })
        .await;

    let elapsed = start.elapsed();
    // 15s + 22.5s plus two jitters of 0.1..=1.0s
    assert!(elapsed >= Duration::from_millis(37_700));
    assert!(elapsed <= Duration::from_millis(39_500));
}

#[test]
fn test_policy_from_partial_toml() {
    let policy: RetryPolicy = toml::from_str("max_retries = 5\nbase_delay_ms = 200").unwrap();
    assert_eq!(*policy.max_retries(), 5);
    assert_eq!(*policy.base_delay_ms(), 200);
    assert_eq!(*policy.backoff_factor(), 1.5);
}
