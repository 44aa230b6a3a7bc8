//! Scripted generation backend for orchestrator tests.

use async_trait::async_trait;
use scriptorium_core::GenerationRequest;
use scriptorium_error::{GenerationError, GenerationErrorKind, ScriptoriumResult};
use scriptorium_interface::GenerationDriver;
use std::sync::Mutex;

/// A single mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return the text
    Success(String),
    /// Fail without partial output
    Error(GenerationErrorKind),
    /// Fail after producing some text
    Partial {
        /// Failure reported after the text
        error: GenerationErrorKind,
        /// Text produced before the failure
        text: String,
    },
}

type Handler = Box<dyn Fn(&GenerationRequest, usize) -> MockResponse + Send + Sync>;

/// Mock backend that answers through a handler and records every request.
///
/// The handler receives the request and the 0-based index of the call.
pub struct MockDriver {
    handler: Handler,
    requests: Mutex<Vec<GenerationRequest>>,
    model_name: String,
}

impl MockDriver {
    /// Answer every call through `handler`.
    pub fn new_routed(
        handler: impl Fn(&GenerationRequest, usize) -> MockResponse + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            model_name: "mock-model".to_string(),
        }
    }

    /// Always succeed with `text`.
    #[allow(dead_code)]
    pub fn new_success(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new_routed(move |_, _| MockResponse::Success(text.clone()))
    }

    /// Answer with `responses` in order; calls past the end fail.
    #[allow(dead_code)]
    pub fn new_sequence(responses: Vec<MockResponse>) -> Self {
        Self::new_routed(move |_, call| {
            responses.get(call).cloned().unwrap_or_else(|| {
                MockResponse::Error(GenerationErrorKind::Backend(format!(
                    "Mock sequence exhausted (call {} beyond {} responses)",
                    call + 1,
                    responses.len()
                )))
            })
        })
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose user prompt contains `marker`.
    pub fn requests_matching(&self, marker: &str) -> Vec<GenerationRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.user_prompt().contains(marker))
            .collect()
    }
}

#[async_trait]
impl GenerationDriver for MockDriver {
    async fn generate(&self, request: &GenerationRequest) -> ScriptoriumResult<String> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        match (self.handler)(request, call) {
            MockResponse::Success(text) => Ok(text),
            MockResponse::Error(kind) => Err(GenerationError::new(kind).into()),
            MockResponse::Partial { error, text } => {
                Err(GenerationError::new(error).with_partial(text).into())
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
