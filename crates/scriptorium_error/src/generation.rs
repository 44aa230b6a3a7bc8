//! Generation backend error types and transient-error classification.

use regex::Regex;
use std::sync::LazyLock;

/// Status codes that appear as standalone numbers in transient error text.
static TRANSIENT_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:429|50[0234])\b").expect("Valid transient status regex"));

/// Lowercase phrases whose presence in an error message marks it as transient.
///
/// Covers overload, rate limiting, timeouts, dropped connections and the
/// retryable 5xx family. Status codes are matched separately, as whole
/// numbers only. Anything else is treated as fatal.
pub const TRANSIENT_TOKENS: &[&str] = &[
    "overloaded",
    "rate limit",
    "rate_limit",
    "too many requests",
    "timeout",
    "timed out",
    "connection error",
    "connection reset",
    "service unavailable",
    "internal server error",
    "bad gateway",
];

/// Whether an HTTP status marks a transient failure.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Classify an error message by its textual signature.
///
/// The generation capability reports failures as free text, so the match is
/// case-insensitive and tolerant of surrounding wording.
///
/// # Examples
///
/// ```
/// use scriptorium_error::is_transient_message;
///
/// assert!(is_transient_message("HTTP 503 Service Unavailable"));
/// assert!(is_transient_message("Model is OVERLOADED, try again"));
/// assert!(!is_transient_message("invalid credentials"));
/// assert!(!is_transient_message("max_tokens must be at most 15000"));
/// ```
pub fn is_transient_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_TOKENS.iter().any(|token| lowered.contains(token))
        || TRANSIENT_STATUS.is_match(&lowered)
}

/// Failure conditions of a single remote generation call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Backend answered with a non-success status
    #[display("HTTP {} error: {}", status, message)]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },
    /// Request never completed at the transport level
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// Response stream broke before completion
    #[display("Stream interrupted: {}", _0)]
    StreamInterrupted(String),
    /// Response arrived but could not be decoded
    #[display("Malformed response: {}", _0)]
    Response(String),
    /// Response decoded but carried no text
    #[display("Backend returned an empty completion")]
    EmptyCompletion,
    /// Free-form backend failure
    #[display("{}", _0)]
    Backend(String),
}

/// Generation error with source location tracking.
///
/// Carries whatever text the backend produced before failing, so callers can
/// rescue a partially generated unit instead of discarding it.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{GenerationError, GenerationErrorKind, RetryableError};
///
/// let err = GenerationError::new(GenerationErrorKind::Status {
///     status: 503,
///     message: "upstream busy".to_string(),
/// });
/// assert!(err.is_retryable());
/// assert!(err.partial_output().is_none());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Text received before the failure, if any
    pub partial: Option<String>,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            partial: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Attach text received before the failure.
    pub fn with_partial(mut self, partial: impl Into<String>) -> Self {
        let partial = partial.into();
        self.partial = (!partial.is_empty()).then_some(partial);
        self
    }

    /// Text received before the failure, if any.
    pub fn partial_output(&self) -> Option<&str> {
        self.partial.as_deref()
    }

    /// The message inspected by the transient-error classifier.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Trait for errors that support retry logic.
///
/// Transient errors like 503 (service unavailable), 429 (rate limit) or
/// network timeouts return true. Permanent errors like 401 (unauthorized)
/// or 400 (bad request) return false.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        match &self.kind {
            GenerationErrorKind::Status { status, .. } => is_transient_status(*status),
            _ => is_transient_message(&self.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_classified_by_number() {
        let busy = GenerationError::new(GenerationErrorKind::Status {
            status: 429,
            message: String::new(),
        });
        let denied = GenerationError::new(GenerationErrorKind::Status {
            status: 401,
            message: "invalid credentials".to_string(),
        });
        assert!(busy.is_retryable());
        assert!(!denied.is_retryable());
    }

    #[test]
    fn bad_request_mentioning_large_numbers_is_fatal() {
        let err = GenerationError::new(GenerationErrorKind::Status {
            status: 400,
            message: "max_tokens must be less than or equal to 15000".to_string(),
        });
        assert!(!err.is_retryable());

        let err = GenerationError::new(GenerationErrorKind::Status {
            status: 503,
            message: "try again with at most 2500 tokens".to_string(),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn status_numbers_match_as_whole_words() {
        assert!(is_transient_message("HTTP 503: upstream busy"));
        assert!(is_transient_message("status=429"));
        assert!(!is_transient_message("context length 15000 exceeded"));
        assert!(!is_transient_message("requested 5000 words, limit 2500"));
        assert!(!is_transient_message("request id 4290a1"));
    }

    #[test]
    fn empty_partial_is_discarded() {
        let err = GenerationError::new(GenerationErrorKind::EmptyCompletion).with_partial("");
        assert!(err.partial_output().is_none());

        let err = GenerationError::new(GenerationErrorKind::StreamInterrupted("eof".into()))
            .with_partial("Once upon a time");
        assert_eq!(err.partial_output(), Some("Once upon a time"));
    }

    #[test]
    fn timeout_wording_variants_are_transient() {
        assert!(is_transient_message("request timed out after 600s"));
        assert!(is_transient_message("Read Timeout"));
        assert!(is_transient_message("Connection reset by peer"));
        assert!(!is_transient_message("model not found"));
    }
}
