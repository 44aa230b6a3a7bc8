//! Error types for the Scriptorium workspace.
//!
//! This crate provides the foundation error types used throughout Scriptorium.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use scriptorium_error::{ConfigError, ScriptoriumResult};
//!
//! fn load() -> ScriptoriumResult<String> {
//!     Err(ConfigError::new("Missing credential"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod generation;
mod http;
mod narrative;
mod storage;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use error::{ScriptoriumError, ScriptoriumErrorKind, ScriptoriumResult};
pub use generation::{
    GenerationError, GenerationErrorKind, RetryableError, TRANSIENT_TOKENS, is_transient_message,
    is_transient_status,
};
pub use http::HttpError;
pub use narrative::{NarrativeError, NarrativeErrorKind};
pub use storage::{StorageError, StorageErrorKind};
