//! Generation backend adapters for Scriptorium.
//!
//! Provides an OpenAI-compatible chat-completions client implementing
//! [`GenerationDriver`](scriptorium_interface::GenerationDriver). Any provider
//! exposing `/chat/completions` (Nebius AI Studio, OpenAI, Groq, vLLM, ...)
//! works by pointing the client at its base URL.
//!
//! ```no_run
//! use scriptorium_core::GenerationRequest;
//! use scriptorium_interface::GenerationDriver;
//! use scriptorium_models::OpenAiCompatClient;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiCompatClient::new(
//!     std::env::var("SCRIPTORIUM_API_KEY")?,
//!     "meta-llama/Meta-Llama-3.1-70B-Instruct",
//!     "https://api.studio.nebius.com/v1/",
//!     Duration::from_secs(600),
//! )?;
//! let request = GenerationRequest::new("You are a novelist.", "Write one line.", 64, 0.7);
//! let text = client.generate(&request).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod openai_compat;

pub use openai_compat::{
    ChatMessage, ChatRequest, ChatRequestBuilder, OpenAiCompatClient, SseDecoder, SseEvent,
};
