//! Retry executor.

use crate::RetryPolicy;
use scriptorium_error::RetryableError;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, error, instrument, warn};

/// Receives one notification per scheduled retry.
///
/// Purely observational; the executor's control flow never depends on it.
pub trait RetryObserver: Send + Sync {
    /// Called before sleeping ahead of 1-based retry `attempt`.
    fn on_retry(&self, label: &str, attempt: usize, delay: Duration, error: &str);
}

/// Runs a fallible async call under a [`RetryPolicy`].
///
/// Fails with the last error once the retry budget is exhausted, and
/// immediately on an error the classifier rejects. Never swallows a failure.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    observer: Option<Arc<dyn RetryObserver>>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryExecutor {
    /// Create an executor for the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    /// Attach an observer notified on every retry.
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The policy in force.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call`, retrying errors the error type itself reports as retryable.
    pub async fn run<T, E, F, Fut>(&self, label: &str, call: F) -> Result<T, E>
    where
        E: RetryableError + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute(label, call, |e: &E| e.is_retryable()).await
    }

    /// Run `call`, retrying errors for which `is_retryable` returns true.
    #[instrument(skip(self, call, is_retryable), fields(max_retries = self.policy.max_retries()))]
    pub async fn execute<T, E, F, Fut, C>(
        &self,
        label: &str,
        mut call: F,
        is_retryable: C,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        let schedule = self.policy.schedule();
        let max_retries = schedule.len();
        let classify = &is_retryable;
        let mut attempt = 0usize;

        let action = || {
            attempt += 1;
            let current = attempt;
            let next_delay = schedule.get(current - 1).copied();
            let observer = self.observer.clone();
            let pending = call();
            async move {
                match pending.await {
                    Ok(value) => {
                        if current > 1 {
                            debug!(label, attempt = current, "Call succeeded after retry");
                        }
                        Ok(value)
                    }
                    Err(e) if !classify(&e) => {
                        error!(label, attempt = current, error = %e, "Non-retryable failure");
                        Err(RetryError::Permanent(e))
                    }
                    Err(e) => match next_delay {
                        Some(delay) => {
                            warn!(
                                label,
                                attempt = current,
                                max_retries,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "Transient failure, retrying"
                            );
                            if let Some(observer) = observer {
                                observer.on_retry(label, current, delay, &e.to_string());
                            }
                            Err(RetryError::Transient {
                                err: e,
                                retry_after: None,
                            })
                        }
                        None => {
                            error!(label, attempts = current, error = %e, "All retries failed");
                            Err(RetryError::Permanent(e))
                        }
                    },
                }
            }
        };

        Retry::spawn(schedule.clone(), action).await
    }
}
