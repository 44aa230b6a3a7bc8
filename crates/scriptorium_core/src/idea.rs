//! Story idea records recovered from structured responses.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// One story proposal.
///
/// Every field is required; records missing any of them are dropped during
/// salvage rather than accepted partially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StoryIdea {
    /// Proposed title
    title: String,
    /// Basic idea of the plot
    premise: String,
    /// Place, time and atmosphere
    setting: String,
    /// Genre label
    genre: String,
    /// Suggested length in words
    word_count: u32,
}

impl StoryIdea {
    /// Create a record from already-validated fields.
    pub fn new(
        title: impl Into<String>,
        premise: impl Into<String>,
        setting: impl Into<String>,
        genre: impl Into<String>,
        word_count: u32,
    ) -> Self {
        Self {
            title: title.into(),
            premise: premise.into(),
            setting: setting.into(),
            genre: genre.into(),
            word_count,
        }
    }
}
