//! Top-level error wrapper types.

use crate::{
    BuilderError, ConfigError, GenerationError, HttpError, NarrativeError,
    RetryableError, StorageError, is_transient_message,
};

/// Every error family the workspace can raise.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{ScriptoriumError, HttpError};
///
/// let err: ScriptoriumError = HttpError::new("TLS backend unavailable").into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ScriptoriumErrorKind {
    /// HTTP client error
    #[from(HttpError)]
    Http(HttpError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Remote generation error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Narrative error
    #[from(NarrativeError)]
    Narrative(NarrativeError),
}

/// Scriptorium error with kind discrimination.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{ConfigError, ScriptoriumResult};
///
/// fn might_fail() -> ScriptoriumResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Scriptorium Error: {}", _0)]
pub struct ScriptoriumError(Box<ScriptoriumErrorKind>);

impl ScriptoriumError {
    /// Create a new error from a kind.
    pub fn new(kind: ScriptoriumErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ScriptoriumErrorKind {
        &self.0
    }

    /// Text a failed generation call produced before failing, if any.
    pub fn partial_output(&self) -> Option<&str> {
        match self.kind() {
            ScriptoriumErrorKind::Generation(e) => e.partial_output(),
            _ => None,
        }
    }

    /// Whether this error came from a misconfiguration detected before a run.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind(),
            ScriptoriumErrorKind::Config(_) | ScriptoriumErrorKind::Narrative(_)
        )
    }
}

impl RetryableError for ScriptoriumError {
    fn is_retryable(&self) -> bool {
        match self.kind() {
            ScriptoriumErrorKind::Generation(e) => e.is_retryable(),
            ScriptoriumErrorKind::Http(e) => is_transient_message(&e.message),
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to ScriptoriumErrorKind
impl<T> From<T> for ScriptoriumError
where
    T: Into<ScriptoriumErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Scriptorium operations.
pub type ScriptoriumResult<T> = std::result::Result<T, ScriptoriumError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerationErrorKind;

    #[test]
    fn partial_output_survives_wrapping() {
        let err: ScriptoriumError = GenerationError::new(GenerationErrorKind::StreamInterrupted(
            "connection reset".into(),
        ))
        .with_partial("The lighthouse keeper")
        .into();
        assert_eq!(err.partial_output(), Some("The lighthouse keeper"));
        assert!(err.is_retryable());
    }

    #[test]
    fn configuration_errors_are_never_retryable() {
        let err: ScriptoriumError = ConfigError::new("503 in the key name").into();
        assert!(err.is_configuration());
        assert!(!err.is_retryable());
    }
}
