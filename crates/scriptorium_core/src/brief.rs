//! The user's description of the story to write.

use crate::Language;
use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Everything the orchestrator needs to know about the story to write.
///
/// # Examples
///
/// ```
/// use scriptorium_core::{Language, StoryBrief};
///
/// let brief = StoryBrief::builder()
///     .title("The Salt Archive")
///     .premise("A librarian finds a map drawn in salt.")
///     .setting("A drowned city, present day")
///     .target_words(4000u32)
///     .language(Language::English)
///     .build()
///     .unwrap();
/// assert_eq!(*brief.target_words(), 4000);
/// assert!(brief.instructions().is_none());
///
/// let invalid = StoryBrief::builder()
///     .title("  ")
///     .premise("p")
///     .setting("s")
///     .target_words(1000u32)
///     .build();
/// assert!(invalid.is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct StoryBrief {
    /// Story title
    title: String,
    /// Basic idea of the plot
    premise: String,
    /// Place, time and atmosphere
    setting: String,
    /// Requested length in words, before buffering
    target_words: u32,
    /// Output language
    #[builder(default)]
    language: Language,
    /// Extra style or character notes
    #[builder(default, setter(strip_option))]
    instructions: Option<String>,
}

impl StoryBrief {
    /// Creates a new builder for `StoryBrief`.
    pub fn builder() -> StoryBriefBuilder {
        StoryBriefBuilder::default()
    }
}

impl StoryBriefBuilder {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("title", &self.title),
            ("premise", &self.premise),
            ("setting", &self.setting),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(format!("{} must not be empty", name));
            }
        }
        if self.target_words == Some(0) {
            return Err("target_words must be positive".to_string());
        }
        Ok(())
    }
}
