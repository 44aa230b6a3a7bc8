//! Request type for the generation capability.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// One remote generation call: a system prompt, a user prompt and sampling limits.
///
/// Constructed per call and never mutated.
///
/// # Examples
///
/// ```
/// use scriptorium_core::GenerationRequest;
///
/// let request = GenerationRequest::new("You are a novelist.", "Write chapter 1.", 4000, 0.75);
/// assert_eq!(*request.max_tokens(), 4000);
/// assert_eq!(request.user_prompt(), "Write chapter 1.");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct GenerationRequest {
    /// Instructions framing the call
    system_prompt: String,
    /// The concrete ask
    user_prompt: String,
    /// Upper bound on generated tokens
    max_tokens: u32,
    /// Sampling temperature
    temperature: f32,
}

impl GenerationRequest {
    /// Create a request.
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens,
            temperature,
        }
    }
}
