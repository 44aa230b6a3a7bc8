use super::dto::{ChatChunk, ChatMessage, ChatRequest, ChatResponse};
use super::sse::{SseDecoder, SseEvent};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use scriptorium_core::GenerationRequest;
use scriptorium_error::{
    BuilderError, GenerationError, GenerationErrorKind, HttpError, ScriptoriumResult,
};
use scriptorium_interface::GenerationDriver;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    provider: &'static str,
    stream: bool,
}

impl std::fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("provider", &self.provider)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatClient {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token
    /// * `model` - Model identifier
    /// * `base_url` - API root, e.g. `https://api.studio.nebius.com/v1/`
    /// * `timeout` - Per-request timeout; the only bound on a stuck call
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> ScriptoriumResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let model = model.into();
        debug!(endpoint = %endpoint, model = %model, "Creating chat-completions client");
        Ok(Self {
            client,
            api_key: api_key.into(),
            model,
            endpoint,
            provider: "openai-compatible",
            stream: true,
        })
    }

    /// Label reported by [`GenerationDriver::provider_name`].
    pub fn with_provider_name(mut self, provider: &'static str) -> Self {
        self.provider = provider;
        self
    }

    /// Toggle server-sent-event streaming (on by default).
    ///
    /// Streaming lets a call that breaks mid-response report the text
    /// received so far.
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// The full chat-completions URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn convert_request(&self, request: &GenerationRequest) -> ScriptoriumResult<ChatRequest> {
        let body = ChatRequest::builder()
            .model(self.model.clone())
            .messages(vec![
                ChatMessage::system(request.system_prompt().clone()),
                ChatMessage::user(request.user_prompt().clone()),
            ])
            .max_tokens(*request.max_tokens())
            .temperature(*request.temperature())
            .stream(self.stream)
            .build()
            .map_err(|e| BuilderError::from(e.to_string()))?;
        Ok(body)
    }

    fn transport_error(e: &reqwest::Error) -> GenerationError {
        let message = if e.is_timeout() {
            format!("timeout: {}", e)
        } else if e.is_connect() {
            format!("connection error: {}", e)
        } else {
            e.to_string()
        };
        GenerationError::new(GenerationErrorKind::Transport(message))
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to send chat-completions request");
                Self::transport_error(&e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no body").to_string()
            } else {
                body
            };
            error!(status = %status, body = %message, "Backend returned error status");
            return Err(GenerationError::new(GenerationErrorKind::Status {
                status: status.as_u16(),
                message,
            }));
        }
        Ok(response)
    }

    async fn read_whole(response: reqwest::Response) -> Result<String, GenerationError> {
        let parsed: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::new(GenerationErrorKind::Response(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::Response("no choices".to_string()))
        })?;
        if choice.finish_reason.as_deref() == Some("length") {
            warn!("Completion stopped at max_tokens");
        }
        choice
            .message
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::EmptyCompletion))
    }

    async fn read_stream(response: reqwest::Response) -> Result<String, GenerationError> {
        let mut decoder = SseDecoder::default();
        let mut text = String::new();
        let mut finished = false;
        let mut bytes = response.bytes_stream();

        'outer: while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(received = text.len(), error = %e, "Stream broke mid-response");
                GenerationError::new(GenerationErrorKind::StreamInterrupted(format!(
                    "connection error: {}",
                    e
                )))
                .with_partial(text.clone())
            })?;
            for event in decoder.push(&chunk) {
                if Self::apply_event(event, &mut text, &mut finished)? {
                    break 'outer;
                }
            }
        }
        if let Some(event) = decoder.finish() {
            Self::apply_event(event, &mut text, &mut finished)?;
        }

        if !finished {
            return Err(GenerationError::new(GenerationErrorKind::StreamInterrupted(
                "connection error: stream ended before completion".to_string(),
            ))
            .with_partial(text));
        }
        if text.trim().is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::EmptyCompletion));
        }
        Ok(text)
    }

    /// Fold one event into the accumulated text. Returns true on `[DONE]`.
    fn apply_event(
        event: SseEvent,
        text: &mut String,
        finished: &mut bool,
    ) -> Result<bool, GenerationError> {
        let data = match event {
            SseEvent::Done => {
                *finished = true;
                return Ok(true);
            }
            SseEvent::Data(data) => data,
        };
        let chunk: ChatChunk = serde_json::from_str(&data).map_err(|e| {
            GenerationError::new(GenerationErrorKind::Response(format!(
                "Failed to parse stream chunk: {}",
                e
            )))
            .with_partial(text.clone())
        })?;
        if let Some(err) = chunk.error {
            return Err(
                GenerationError::new(GenerationErrorKind::Backend(err.to_string()))
                    .with_partial(text.clone()),
            );
        }
        for choice in chunk.choices {
            if let Some(content) = choice.delta.and_then(|d| d.content) {
                text.push_str(&content);
            }
            if let Some(reason) = choice.finish_reason {
                if reason == "length" {
                    warn!("Completion stopped at max_tokens");
                }
                *finished = true;
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl GenerationDriver for OpenAiCompatClient {
    #[instrument(
        skip(self, request),
        fields(
            provider = self.provider,
            model = %self.model,
            max_tokens = *request.max_tokens(),
            temperature = *request.temperature()
        )
    )]
    async fn generate(&self, request: &GenerationRequest) -> ScriptoriumResult<String> {
        let body = self.convert_request(request)?;
        debug!("Sending chat-completions request");
        let response = self.send(&body).await?;
        let text = if self.stream {
            Self::read_stream(response).await?
        } else {
            Self::read_whole(response).await?
        };
        debug!(chars = text.len(), "Received completion");
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
