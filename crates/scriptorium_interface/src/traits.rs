//! Capability traits.

use async_trait::async_trait;
use scriptorium_core::GenerationRequest;
use scriptorium_error::ScriptoriumResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Core trait that every generation backend implements.
///
/// Failures are reported as errors whose text the retry classifier inspects,
/// so implementations should include status codes and provider wording in
/// their error messages.
#[async_trait]
pub trait GenerationDriver: Send + Sync {
    /// Run one generation call and return the produced text.
    async fn generate(&self, request: &GenerationRequest) -> ScriptoriumResult<String>;

    /// Provider name (e.g., "nebius", "openai").
    fn provider_name(&self) -> &'static str;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: GenerationDriver + ?Sized> GenerationDriver for Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> ScriptoriumResult<String> {
        (**self).generate(request).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Sink for produced documents (story, outline, proposals).
///
/// Callers treat a failed write as non-fatal.
pub trait Persistence: Send + Sync {
    /// Write `text` under a name derived from `suggested_name` inside `directory`,
    /// returning the path actually written.
    fn persist(&self, text: &str, suggested_name: &str, directory: &Path)
    -> ScriptoriumResult<PathBuf>;
}
