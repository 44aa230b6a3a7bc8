//! Trait definitions for Scriptorium.
//!
//! The orchestrator consumes two capabilities it treats as black boxes:
//! a generation backend and an artifact sink.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{GenerationDriver, Persistence};
