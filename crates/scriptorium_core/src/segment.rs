//! Generated segments and the outcome of a generation step.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// How trustworthy a generated unit is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SegmentStatus {
    /// Generated in full
    #[display("ok")]
    Ok,
    /// Recovered from partial output of a failed call
    #[display("rescued")]
    Rescued,
    /// Replaced by an error placeholder
    #[display("failed")]
    Failed,
}

/// Result of one generation step (single story, segment or epilogue).
///
/// # Examples
///
/// ```
/// use scriptorium_core::{Outcome, SegmentStatus};
///
/// let rescued = Outcome::Rescued("Half a chapter.".into(), "stream interrupted".into());
/// assert_eq!(rescued.status(), SegmentStatus::Rescued);
/// assert_eq!(rescued.text(), Some("Half a chapter."));
///
/// let failed = Outcome::Failed("invalid credentials".into());
/// assert!(failed.text().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Complete text
    Ok(String),
    /// Partial text and the reason the call failed
    Rescued(String, String),
    /// Nothing usable; the reason the call failed
    Failed(String),
}

impl Outcome {
    /// Status tag for this outcome.
    pub fn status(&self) -> SegmentStatus {
        match self {
            Outcome::Ok(_) => SegmentStatus::Ok,
            Outcome::Rescued(..) => SegmentStatus::Rescued,
            Outcome::Failed(_) => SegmentStatus::Failed,
        }
    }

    /// Generated text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Ok(text) | Outcome::Rescued(text, _) => Some(text),
            Outcome::Failed(_) => None,
        }
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Rescued(_, reason) | Outcome::Failed(reason) => Some(reason),
        }
    }
}

/// One appended unit of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Segment {
    /// 1-based position
    index: usize,
    /// Planned length in words
    target_words: u32,
    /// Formatted, repaired text (or error placeholder)
    text: String,
    /// Trust level
    status: SegmentStatus,
}

impl Segment {
    /// Create a segment.
    pub fn new(index: usize, target_words: u32, text: impl Into<String>, status: SegmentStatus) -> Self {
        Self {
            index,
            target_words,
            text: text.into(),
            status,
        }
    }

    /// Words actually generated.
    pub fn word_count(&self) -> usize {
        crate::word_count(&self.text)
    }

    /// Whether the segment fell short of 70% of its target.
    pub fn is_short(&self) -> bool {
        self.target_words > 0 && (self.word_count() as f64) < f64::from(self.target_words) * 0.7
    }
}
