//! Retry and backoff for remote generation calls.
//!
//! Wraps one call with exponential backoff plus random jitter. Transient
//! failures (overload, rate limiting, timeouts, retryable 5xx) are retried up
//! to a fixed budget; anything else propagates immediately.
//!
//! ```rust,ignore
//! use scriptorium_retry::{RetryExecutor, RetryPolicy};
//!
//! let executor = RetryExecutor::new(RetryPolicy::default());
//! let text = executor.run("chapter 3", || driver.generate(&request)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod executor;
mod policy;

pub use executor::{RetryExecutor, RetryObserver};
pub use policy::RetryPolicy;
pub use scriptorium_error::{RetryableError, is_transient_message};
