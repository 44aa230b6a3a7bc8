//! Retry policy configuration.

use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget and backoff curve.
///
/// Loaded from the `[retry]` table of the configuration file; every field has
/// a default so a partial table is accepted.
///
/// # Examples
///
/// ```
/// use scriptorium_retry::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(*policy.max_retries(), 3);
/// assert_eq!(policy.base_delay(3), std::time::Duration::from_millis(33_750));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: usize,
    /// Delay before the first retry, in milliseconds
    base_delay_ms: u64,
    /// Multiplier applied per further retry
    backoff_factor: f64,
    /// Lower bound of the random jitter, in milliseconds
    jitter_min_ms: u64,
    /// Upper bound of the random jitter, in milliseconds
    jitter_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 15_000,
            backoff_factor: 1.5,
            jitter_min_ms: 100,
            jitter_max_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Deterministic part of the delay before 1-based retry `attempt`:
    /// `base * factor^(attempt - 1)`.
    pub fn base_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let millis = self.base_delay_ms as f64 * self.backoff_factor.max(0.0).powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Full delay before retry `attempt`, jitter included.
    pub fn delay(&self, attempt: usize) -> Duration {
        let low = self.jitter_min_ms.min(self.jitter_max_ms);
        let high = self.jitter_min_ms.max(self.jitter_max_ms);
        let jitter = rand::thread_rng().gen_range(low..=high);
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }

    /// Delays for every retry in the budget, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries).map(|attempt| self.delay(attempt)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_grows_geometrically_within_jitter() {
        let policy = RetryPolicy::default();
        let schedule = policy.schedule();
        assert_eq!(schedule.len(), 3);
        for (i, delay) in schedule.iter().enumerate() {
            let base = policy.base_delay(i + 1);
            assert!(*delay >= base + Duration::from_millis(100));
            assert!(*delay <= base + Duration::from_millis(1_000));
        }
        assert_eq!(policy.base_delay(1), Duration::from_secs(15));
        assert_eq!(policy.base_delay(2), Duration::from_millis(22_500));
    }

    #[test]
    fn inverted_jitter_bounds_do_not_panic() {
        let policy = RetryPolicy::default()
            .with_jitter_min_ms(500)
            .with_jitter_max_ms(10);
        let delay = policy.delay(1);
        assert!(delay >= Duration::from_millis(15_010));
        assert!(delay <= Duration::from_millis(15_500));
    }

    #[test]
    fn zero_budget_has_empty_schedule() {
        assert!(RetryPolicy::default().with_max_retries(0).schedule().is_empty());
    }
}
