//! Core data types for Scriptorium.
//!
//! This crate provides the data model shared by every Scriptorium crate:
//! generation requests, story briefs, segment plans, generated segments and
//! the idea records recovered from structured responses.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod brief;
mod idea;
mod language;
mod plan;
mod request;
mod segment;

pub use brief::{StoryBrief, StoryBriefBuilder, StoryBriefBuilderError};
pub use idea::StoryIdea;
pub use language::Language;
pub use plan::SegmentPlan;
pub use request::GenerationRequest;
pub use segment::{Outcome, Segment, SegmentStatus};

/// Count whitespace-separated words.
///
/// # Examples
///
/// ```
/// assert_eq!(scriptorium_core::word_count("The  door\nswung open."), 4);
/// ```
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
