//! Bounded-context long-form story generation.
//!
//! A backend can only produce a few thousand words per call and only sees a
//! limited context. This crate writes works far longer than that by planning
//! segments, requesting an outline, generating each segment with a compact
//! continuity context (synopsis, verbatim tail, running summary) and
//! stitching the results into one document.
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptorium_core::{Language, StoryBrief};
//! use scriptorium_narrative::{LanguagePack, OrchestratorSettings, StoryOrchestrator};
//! use scriptorium_retry::{RetryExecutor, RetryPolicy};
//! use std::sync::Arc;
//!
//! let pack = Arc::new(LanguagePack::bundled(Language::English)?);
//! let orchestrator = StoryOrchestrator::new(
//!     Arc::new(client),
//!     pack,
//!     OrchestratorSettings::default(),
//!     RetryExecutor::new(RetryPolicy::default()),
//! );
//! let brief = StoryBrief::builder()
//!     .title("The Last Train")
//!     .premise("A conductor hears voices in an empty carriage.")
//!     .setting("Trans-Siberian railway, winter 1953")
//!     .target_words(5000)
//!     .language(Language::English)
//!     .build()?;
//! let document = orchestrator.write(&brief).await?;
//! println!("{}", document.text());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod continuity;
mod format;
mod ideas;
mod language;
mod orchestrator;
mod outline;
mod planner;
mod repair;
mod salvage;

pub use continuity::{
    ContinuityContext, ContinuityManager, GenerativeSummary, HeuristicSummary, SummaryStrategy,
    TAIL_CHARS, TAIL_MAX_CHARS, extract_tail,
};
pub use format::{error_segment, format_epilogue, format_segment, format_story};
pub use ideas::{
    IDEA_WORD_RANGE, IdeaGenerator, ProposalChoice, brief_from_idea, format_proposal,
    select_proposal,
};
pub use language::{LabelKey, LanguagePack, PromptContext, TemplateKey, WordLists};
pub use orchestrator::{
    GenerationMode, MIN_CHARS_FOR_RESCUE, OrchestratorSettings, OrchestratorState,
    StoryDocument, StoryOrchestrator, SummaryMode,
};
pub use outline::extract_segment_slice;
pub use planner::{
    MIN_SEGMENT_WORDS, MIN_SEGMENTS_FOR_LONG_WORK, WORDS_PER_SEGMENT_DIVISOR, plan_segments,
};
pub use repair::BoundaryRepair;
pub use salvage::{IdeaDefaults, normalize_idea, salvage_ideas, salvage_objects};
