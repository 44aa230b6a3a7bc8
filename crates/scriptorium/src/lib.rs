//! Scriptorium - long-form story generation with bounded-context models.
//!
//! Language models write a few thousand words per call. Scriptorium writes
//! much longer works by planning segments, requesting a plot outline and
//! carrying a compact continuity context from one segment to the next.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use scriptorium::{
//!     Language, LanguagePack, RetryExecutor, ScriptoriumConfig, StoryBrief, StoryOrchestrator,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScriptoriumConfig::load(None)?;
//!     let client = Arc::new(config.backend().client()?);
//!     let pack = Arc::new(LanguagePack::bundled(Language::English)?);
//!     let orchestrator = StoryOrchestrator::new(
//!         client,
//!         pack,
//!         config.generation().clone(),
//!         RetryExecutor::new(config.retry().clone()),
//!     );
//!     let brief = StoryBrief::builder()
//!         .title("The Last Train")
//!         .premise("A conductor hears voices in an empty carriage.")
//!         .setting("Trans-Siberian railway, winter 1953")
//!         .target_words(4000u32)
//!         .language(Language::English)
//!         .build()?;
//!     println!("{}", orchestrator.write(&brief).await?.text());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `scriptorium_core` - Data model (briefs, segments, outcomes)
//! - `scriptorium_interface` - Generation and persistence capabilities
//! - `scriptorium_error` - Error types
//! - `scriptorium_retry` - Retry with exponential backoff
//! - `scriptorium_storage` - Filesystem artifacts
//! - `scriptorium_models` - OpenAI-compatible backend
//! - `scriptorium_narrative` - Planning, continuity, repair and orchestration
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod observability;

pub use config::{BackendConfig, FALLBACK_API_KEY_ENV, OutputConfig, ScriptoriumConfig};
pub use observability::{ObservabilityConfig, init_observability};

pub use scriptorium_core::*;
pub use scriptorium_error::*;
pub use scriptorium_interface::*;
pub use scriptorium_models::OpenAiCompatClient;
pub use scriptorium_narrative::*;
pub use scriptorium_retry::{RetryExecutor, RetryObserver, RetryPolicy};
pub use scriptorium_storage::*;
