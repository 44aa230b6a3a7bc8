//! OpenAI-compatible chat-completions backend.

mod client;
mod dto;
mod sse;

pub use client::OpenAiCompatClient;
pub use dto::{ChatMessage, ChatRequest, ChatRequestBuilder};
pub use sse::{SseDecoder, SseEvent};
