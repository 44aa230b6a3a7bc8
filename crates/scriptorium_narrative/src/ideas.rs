//! Story idea proposals.

use crate::{IdeaDefaults, LabelKey, LanguagePack, PromptContext, salvage_ideas};
use rand::Rng;
use rand::seq::SliceRandom;
use scriptorium_core::{Language, StoryBrief, StoryIdea};
use scriptorium_error::{NarrativeError, NarrativeErrorKind, ScriptoriumResult};
use scriptorium_interface::GenerationDriver;
use scriptorium_retry::RetryExecutor;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Word counts suggested for proposals lacking a usable one.
pub const IDEA_WORD_RANGE: RangeInclusive<u32> = 5_000..=10_000;
/// Genres sampled from the pack when no hint is given.
const SAMPLED_GENRES: usize = 3;

/// Asks the backend for story ideas and recovers them from its response.
pub struct IdeaGenerator<D> {
    driver: Arc<D>,
    executor: RetryExecutor,
}

impl<D: GenerationDriver> IdeaGenerator<D> {
    /// Create a generator.
    pub fn new(driver: Arc<D>, executor: RetryExecutor) -> Self {
        Self { driver, executor }
    }

    /// Request `count` ideas in the pack's language.
    ///
    /// A failed call whose error carries partial output is still salvaged;
    /// only a failure with nothing to salvage is returned as an error.
    #[instrument(skip(self, pack), fields(language = %pack.language()))]
    pub async fn propose(
        &self,
        count: usize,
        pack: &LanguagePack,
        genre_hint: Option<&str>,
    ) -> ScriptoriumResult<Vec<StoryIdea>> {
        let count = count.max(1);
        let genres = match genre_hint.map(str::trim).filter(|g| !g.is_empty()) {
            Some(hint) => hint.to_string(),
            None => {
                let mut rng = rand::thread_rng();
                pack.words()
                    .genres()
                    .choose_multiple(&mut rng, SAMPLED_GENRES)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };
        let context = PromptContext::Ideas {
            count,
            genres: &genres,
            min_words: *IDEA_WORD_RANGE.start(),
            max_words: *IDEA_WORD_RANGE.end(),
        };
        let max_tokens = (count as u32).saturating_mul(500).max(1500);
        let request = pack.request(&context, max_tokens, 0.9);

        let raw = match self
            .executor
            .run("ideas", || self.driver.generate(&request))
            .await
        {
            Ok(raw) => raw,
            Err(e) => match e.partial_output() {
                Some(partial) => {
                    warn!(error = %e, "Idea call failed, salvaging partial output");
                    partial.to_string()
                }
                None => return Err(e),
            },
        };

        let defaults = IdeaDefaults::new(IDEA_WORD_RANGE, pack.label(LabelKey::UnknownGenre));
        let ideas = salvage_ideas(&raw, &defaults);
        if ideas.len() < count {
            warn!(requested = count, received = ideas.len(), "Fewer ideas than requested");
        }
        info!(count = ideas.len(), genres = %genres, "Ideas proposed");
        Ok(ideas)
    }
}

/// Which proposal to turn into a story.
///
/// Parsed from a 1-based number or `r`/`random`.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::ProposalChoice;
///
/// assert_eq!("2".parse::<ProposalChoice>().unwrap(), ProposalChoice::Index(2));
/// assert_eq!("R".parse::<ProposalChoice>().unwrap(), ProposalChoice::Random);
/// assert!("0".parse::<ProposalChoice>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ProposalChoice {
    /// Proposal number, starting at 1
    #[display("{}", _0)]
    Index(usize),
    /// Any proposal, picked at random
    #[display("random")]
    Random,
}

impl FromStr for ProposalChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("r") || s.eq_ignore_ascii_case("random") {
            return Ok(Self::Random);
        }
        match s.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Self::Index(n)),
            _ => Err(format!(
                "expected a proposal number starting at 1 or 'random', got '{}'",
                s
            )),
        }
    }
}

/// Pick the proposal named by `choice`.
pub fn select_proposal(ideas: &[StoryIdea], choice: ProposalChoice) -> ScriptoriumResult<&StoryIdea> {
    let number = match choice {
        ProposalChoice::Random if !ideas.is_empty() => rand::thread_rng().gen_range(1..=ideas.len()),
        ProposalChoice::Random => 1,
        ProposalChoice::Index(n) => n,
    };
    let idea = number
        .checked_sub(1)
        .and_then(|index| ideas.get(index))
        .ok_or_else(|| {
            NarrativeError::new(NarrativeErrorKind::ProposalOutOfRange {
                choice: number,
                available: ideas.len(),
            })
        })?;
    info!(choice = %choice, number, title = %idea.title(), "Proposal selected");
    Ok(idea)
}

/// The brief that writes `idea` in `language`.
pub fn brief_from_idea(idea: &StoryIdea, language: Language) -> ScriptoriumResult<StoryBrief> {
    StoryBrief::builder()
        .title(idea.title().clone())
        .premise(idea.premise().clone())
        .setting(idea.setting().clone())
        .target_words(*idea.word_count())
        .language(language)
        .build()
        .map_err(|e| NarrativeError::new(NarrativeErrorKind::InvalidBrief(e.to_string())).into())
}

/// Plain-text rendering of a proposal, with a command line that writes it.
///
/// # Examples
///
/// ```
/// use scriptorium_core::{Language, StoryIdea};
/// use scriptorium_narrative::{LanguagePack, format_proposal};
///
/// let pack = LanguagePack::bundled(Language::English).unwrap();
/// let idea = StoryIdea::new("Salt", "A map drawn in salt.", "Drowned city", "Fantasy", 6000);
/// let text = format_proposal(&idea, &pack);
/// assert!(text.starts_with("Title: Salt\n"));
/// assert!(text.contains("--words 6000 --language en"));
/// ```
pub fn format_proposal(idea: &StoryIdea, pack: &LanguagePack) -> String {
    format!(
        "{}: {}\n{}: {}\n{}: {}\n\n{}:\n{}\n\n{}:\n{}\n\n{}\n{}\n",
        pack.label(LabelKey::FieldTitle),
        idea.title(),
        pack.label(LabelKey::FieldGenre),
        idea.genre(),
        pack.label(LabelKey::FieldWordCount),
        idea.word_count(),
        pack.label(LabelKey::FieldPremise),
        idea.premise(),
        pack.label(LabelKey::FieldSetting),
        idea.setting(),
        pack.label(LabelKey::ExampleCommand),
        example_command(idea, pack),
    )
}

fn example_command(idea: &StoryIdea, pack: &LanguagePack) -> String {
    format!(
        "scriptorium write --title {} --premise {} --setting {} --words {} --language {}",
        shell_quote(idea.title()),
        shell_quote(idea.premise()),
        shell_quote(idea.setting()),
        idea.word_count(),
        pack.language().code()
    )
}

fn shell_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::Language;

    #[test]
    fn proposal_uses_pack_labels() {
        let pack = LanguagePack::bundled(Language::German).unwrap();
        let idea = StoryIdea::new("Die Fähre", "Ein Fährmann schweigt.", "Elbe", "Krimi", 7200);
        let text = format_proposal(&idea, &pack);
        assert!(text.contains(pack.label(LabelKey::FieldPremise)));
        assert!(text.contains("--language de"));
    }

    fn proposals() -> Vec<StoryIdea> {
        vec![
            StoryIdea::new("Salt", "A map drawn in salt.", "Drowned city", "Fantasy", 6000),
            StoryIdea::new("Ferry", "A ferryman keeps quiet.", "River Elbe", "Crime", 7200),
        ]
    }

    #[test]
    fn proposals_are_selected_by_number() {
        let ideas = proposals();
        let idea = select_proposal(&ideas, ProposalChoice::Index(2)).unwrap();
        assert_eq!(idea.title(), "Ferry");
    }

    #[test]
    fn random_selection_stays_in_range() {
        let ideas = proposals();
        for _ in 0..20 {
            let idea = select_proposal(&ideas, ProposalChoice::Random).unwrap();
            assert!(ideas.contains(idea));
        }
    }

    #[test]
    fn missing_proposal_is_an_error() {
        let ideas = proposals();
        let err = select_proposal(&ideas, ProposalChoice::Index(3)).unwrap_err();
        assert!(err.to_string().contains("Proposal 3 does not exist (2 available)"));
        assert!(select_proposal(&[], ProposalChoice::Random).is_err());
    }

    #[test]
    fn brief_carries_every_proposal_field() {
        let ideas = proposals();
        let brief = brief_from_idea(&ideas[1], Language::German).unwrap();
        assert_eq!(brief.title(), "Ferry");
        assert_eq!(brief.premise(), "A ferryman keeps quiet.");
        assert_eq!(brief.setting(), "River Elbe");
        assert_eq!(*brief.target_words(), 7200);
        assert_eq!(*brief.language(), Language::German);
        assert!(brief.instructions().is_none());
    }

    #[test]
    fn quotes_in_titles_are_escaped() {
        assert_eq!(shell_quote(r#"The "Last" Train"#), r#""The \"Last\" Train""#);
    }
}
