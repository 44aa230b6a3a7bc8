//! Language packs: prompt templates, labels and word lists per output language.
//!
//! A pack is a TOML document with four parts: the language code and display
//! name, a `[templates]` table keyed by [`TemplateKey`], a `[labels]` table
//! keyed by [`LabelKey`] and a `[words]` table of [`WordLists`]. Packs are
//! validated completely when loaded, so rendering never fails at run time.

use regex::{Captures, Regex};
use scriptorium_core::{GenerationRequest, Language, StoryBrief};
use scriptorium_error::{NarrativeError, NarrativeErrorKind, ScriptoriumResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([a-z_]+)\}").expect("Valid placeholder regex"));

const BUNDLED_ENGLISH: &str = include_str!("../languages/en.toml");
const BUNDLED_GERMAN: &str = include_str!("../languages/de.toml");

/// Identifies one prompt template.
///
/// Templates come in system/user pairs that share the same placeholders.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum TemplateKey {
    /// Single-call story, system part
    StorySystem,
    /// Single-call story, user part
    StoryUser,
    /// Plot outline, system part
    OutlineSystem,
    /// Plot outline, user part
    OutlineUser,
    /// One segment, system part
    SegmentSystem,
    /// One segment, user part
    SegmentUser,
    /// Epilogue, system part
    EpilogueSystem,
    /// Epilogue, user part
    EpilogueUser,
    /// Per-segment synopsis, system part
    SynopsisSystem,
    /// Per-segment synopsis, user part
    SynopsisUser,
    /// Running-summary update, system part
    RunningSummarySystem,
    /// Running-summary update, user part
    RunningSummaryUser,
    /// Idea proposals, system part
    IdeasSystem,
    /// Idea proposals, user part
    IdeasUser,
}

impl TemplateKey {
    /// Placeholders this template may reference.
    pub fn placeholders(&self) -> &'static [&'static str] {
        use TemplateKey::*;
        match self {
            StorySystem | StoryUser => &[
                "title",
                "premise",
                "setting",
                "words",
                "language",
                "instructions",
            ],
            OutlineSystem | OutlineUser => &[
                "title",
                "premise",
                "setting",
                "words",
                "segments",
                "language",
                "instructions",
            ],
            SegmentSystem | SegmentUser => &[
                "title",
                "number",
                "total",
                "previous_number",
                "slice",
                "running_summary",
                "predecessor",
                "words",
                "min_words",
                "max_words",
                "language",
                "instructions",
            ],
            EpilogueSystem | EpilogueUser => &[
                "title",
                "outline",
                "running_summary",
                "predecessor",
                "tail",
                "total",
                "language",
                "instructions",
            ],
            SynopsisSystem | SynopsisUser => &["text", "number", "language"],
            RunningSummarySystem | RunningSummaryUser => {
                &["previous_summary", "text", "number", "language"]
            }
            IdeasSystem | IdeasUser => &["count", "genres", "min_words", "max_words", "language"],
        }
    }
}

/// Identifies one fixed piece of text: headings, notices, markers, file prefixes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum LabelKey {
    SegmentWord,
    EpilogueWord,
    ErrorSegmentTitle,
    ErrorSegmentBody,
    ErrorStoryBody,
    RescuedSegmentNotice,
    IncompleteStoryNotice,
    FirstSegmentContext,
    SynopsisPrefix,
    TailMarkerStart,
    TailMarkerEnd,
    SynopsisFallback,
    RunningSummaryLabel,
    RunningSummaryInitial,
    OutlineUnavailable,
    SliceUnavailable,
    OutlineHeader,
    InstructionsHeading,
    StoryFilePrefix,
    ProposalFilePrefix,
    UnknownGenre,
    Untitled,
    FieldTitle,
    FieldGenre,
    FieldWordCount,
    FieldPremise,
    FieldSetting,
    ExampleCommand,
    HeuristicCharacters,
    HeuristicEvents,
}

/// Word lists used by boundary repair and the heuristic summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct WordLists {
    /// Words a sentence cannot sensibly end on
    closing_conjunctions: Vec<String>,
    /// Capitalised words that never name a character
    article_words: Vec<String>,
    /// Verbs marking a sentence as an event
    action_verbs: Vec<String>,
    /// Nouns marking a sentence as emotionally significant
    emotion_words: Vec<String>,
    /// Headings a model may prepend to a summary
    summary_labels: Vec<String>,
    /// Genres offered when proposing ideas
    genres: Vec<String>,
}

/// Raw document shape, before key validation.
#[derive(Debug, Deserialize)]
struct PackDocument {
    language: String,
    name: String,
    templates: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
    words: WordLists,
}

/// Everything language-specific the orchestrator needs.
///
/// # Examples
///
/// ```
/// use scriptorium_core::Language;
/// use scriptorium_narrative::{LabelKey, LanguagePack};
///
/// let pack = LanguagePack::bundled(Language::German).unwrap();
/// assert_eq!(pack.label(LabelKey::SegmentWord), "Kapitel");
/// assert_eq!(pack.name(), "Deutsch");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePack {
    language: Language,
    name: String,
    templates: HashMap<TemplateKey, String>,
    labels: HashMap<LabelKey, String>,
    words: WordLists,
}

impl LanguagePack {
    /// The pack shipped with the binary for `language`.
    pub fn bundled(language: Language) -> ScriptoriumResult<Self> {
        let source = match language {
            Language::English => BUNDLED_ENGLISH,
            Language::German => BUNDLED_GERMAN,
        };
        Self::from_toml_str(source)
    }

    /// The bundled pack for a language code or name such as `"de"` or `"English"`.
    pub fn for_code(code: &str) -> ScriptoriumResult<Self> {
        let language = parse_language(code)?;
        Self::bundled(language)
    }

    /// Load a pack from a TOML file.
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path> + std::fmt::Debug) -> ScriptoriumResult<Self> {
        let source = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NarrativeError::new(NarrativeErrorKind::LanguagePackParse(format!(
                "{}: {}",
                path.as_ref().display(),
                e
            )))
        })?;
        Self::from_toml_str(&source)
    }

    /// Parse and validate a pack document.
    pub fn from_toml_str(source: &str) -> ScriptoriumResult<Self> {
        let document: PackDocument = toml::from_str(source).map_err(|e| {
            NarrativeError::new(NarrativeErrorKind::LanguagePackParse(e.to_string()))
        })?;

        let language = parse_language(&document.language)?;
        let templates = collect_keys::<TemplateKey>(document.templates, "template")?;
        let labels = collect_keys::<LabelKey>(document.labels, "label")?;

        for key in TemplateKey::iter() {
            let Some(template) = templates.get(&key) else {
                return Err(NarrativeError::new(NarrativeErrorKind::MissingTemplate {
                    pack: document.name.clone(),
                    key: key.to_string(),
                })
                .into());
            };
            validate_placeholders(key, template)?;
        }
        if let Some(key) = LabelKey::iter().find(|key| !labels.contains_key(key)) {
            return Err(NarrativeError::new(NarrativeErrorKind::MissingLabel {
                pack: document.name.clone(),
                key: key.to_string(),
            })
            .into());
        }

        debug!(language = %language, name = %document.name, "Loaded language pack");
        Ok(Self {
            language,
            name: document.name,
            templates,
            labels,
            words: document.words,
        })
    }

    /// Language this pack writes in.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Display name, substituted for `{language}`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template text.
    pub fn template(&self, key: TemplateKey) -> &str {
        self.templates.get(&key).map(String::as_str).unwrap_or_default()
    }

    /// Label text.
    pub fn label(&self, key: LabelKey) -> &str {
        self.labels.get(&key).map(String::as_str).unwrap_or_default()
    }

    /// Word lists.
    pub fn words(&self) -> &WordLists {
        &self.words
    }

    /// Render one template with the values of `context`.
    ///
    /// `{{` and `}}` become literal braces. Placeholders the context does not
    /// define render empty.
    pub fn render(&self, key: TemplateKey, context: &PromptContext<'_>) -> String {
        PLACEHOLDER
            .replace_all(self.template(key), |caps: &Captures<'_>| match caps.get(1) {
                Some(name) => context.value(name.as_str(), self).unwrap_or_default(),
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            })
            .trim()
            .to_string()
    }

    /// Render the system/user pair for `context` into a request.
    pub fn request(
        &self,
        context: &PromptContext<'_>,
        max_tokens: u32,
        temperature: f32,
    ) -> GenerationRequest {
        let (system, user) = context.templates();
        GenerationRequest::new(
            self.render(system, context),
            self.render(user, context),
            max_tokens,
            temperature,
        )
    }

    /// Instructions appended to prompts, under this pack's heading.
    ///
    /// Empty when there are none; the heading is not repeated when the
    /// text already starts with it.
    pub fn instructions_block(&self, instructions: Option<&str>) -> String {
        let Some(text) = instructions.map(str::trim).filter(|t| !t.is_empty()) else {
            return String::new();
        };
        let heading = self.label(LabelKey::InstructionsHeading);
        if text.starts_with(heading) {
            format!("\n{}\n", text)
        } else {
            format!("\n{}\n{}\n", heading, text)
        }
    }
}

fn parse_language(code: &str) -> ScriptoriumResult<Language> {
    code.trim().parse::<Language>().map_err(|_| {
        NarrativeError::new(NarrativeErrorKind::UnsupportedLanguage {
            requested: code.to_string(),
            supported: Language::supported(),
        })
        .into()
    })
}

fn collect_keys<K>(raw: BTreeMap<String, String>, what: &str) -> ScriptoriumResult<HashMap<K, String>>
where
    K: std::str::FromStr + std::hash::Hash + Eq,
{
    raw.into_iter()
        .map(|(key, value)| {
            key.parse::<K>().map(|k| (k, value)).map_err(|_| {
                NarrativeError::new(NarrativeErrorKind::LanguagePackParse(format!(
                    "unknown {} key '{}'",
                    what, key
                )))
                .into()
            })
        })
        .collect()
}

fn validate_placeholders(key: TemplateKey, template: &str) -> ScriptoriumResult<()> {
    let allowed = key.placeholders();
    for caps in PLACEHOLDER.captures_iter(template) {
        if let Some(name) = caps.get(1)
            && !allowed.contains(&name.as_str())
        {
            return Err(NarrativeError::new(NarrativeErrorKind::UnknownPlaceholder {
                key: key.to_string(),
                placeholder: name.as_str().to_string(),
            })
            .into());
        }
    }
    Ok(())
}

/// Typed values for one template pair.
///
/// Each variant carries exactly what its templates may reference, so a
/// template can only be rendered with a matching context.
#[derive(Debug, Clone, Copy)]
pub enum PromptContext<'a> {
    /// Whole story in one call
    Story {
        /// The brief
        brief: &'a StoryBrief,
        /// Buffered word target
        words: u32,
    },
    /// Plot outline
    Outline {
        /// The brief
        brief: &'a StoryBrief,
        /// Buffered word target
        words: u32,
        /// Number of planned segments
        segments: usize,
    },
    /// One segment
    Segment {
        /// Story title
        title: &'a str,
        /// 1-based segment number
        number: usize,
        /// Total segments
        total: usize,
        /// Outline excerpt for this segment
        slice: &'a str,
        /// Running summary of the story so far
        running_summary: &'a str,
        /// Detailed context of the previous segment
        predecessor: &'a str,
        /// Target words for this segment
        words: u32,
        /// Extra instructions from the brief
        instructions: Option<&'a str>,
    },
    /// Closing epilogue
    Epilogue {
        /// Story title
        title: &'a str,
        /// Full outline or its unavailable marker
        outline: &'a str,
        /// Running summary after the last segment
        running_summary: &'a str,
        /// Detailed context of the last segment
        predecessor: &'a str,
        /// Raw end of the last segment
        tail: &'a str,
        /// Total segments
        total: usize,
        /// Extra instructions from the brief
        instructions: Option<&'a str>,
    },
    /// Synopsis of a finished segment
    Synopsis {
        /// Segment text
        text: &'a str,
        /// 1-based segment number
        number: usize,
    },
    /// Running-summary update
    RunningSummary {
        /// Summary before this segment
        previous_summary: &'a str,
        /// Segment text
        text: &'a str,
        /// 1-based segment number
        number: usize,
    },
    /// Idea proposals
    Ideas {
        /// Number of ideas requested
        count: usize,
        /// Comma-separated genres
        genres: &'a str,
        /// Lower bound of suggested word counts
        min_words: u32,
        /// Upper bound of suggested word counts
        max_words: u32,
    },
}

impl PromptContext<'_> {
    /// The `(system, user)` template pair this context renders.
    pub fn templates(&self) -> (TemplateKey, TemplateKey) {
        use TemplateKey::*;
        match self {
            PromptContext::Story { .. } => (StorySystem, StoryUser),
            PromptContext::Outline { .. } => (OutlineSystem, OutlineUser),
            PromptContext::Segment { .. } => (SegmentSystem, SegmentUser),
            PromptContext::Epilogue { .. } => (EpilogueSystem, EpilogueUser),
            PromptContext::Synopsis { .. } => (SynopsisSystem, SynopsisUser),
            PromptContext::RunningSummary { .. } => (RunningSummarySystem, RunningSummaryUser),
            PromptContext::Ideas { .. } => (IdeasSystem, IdeasUser),
        }
    }

    /// Value of placeholder `name`, or `None` if this context has no such value.
    pub fn value(&self, name: &str, pack: &LanguagePack) -> Option<String> {
        if name == "language" {
            return Some(pack.name().to_string());
        }
        match (self, name) {
            (Self::Story { brief, .. } | Self::Outline { brief, .. }, field) => match field {
                "title" => Some(brief.title().clone()),
                "premise" => Some(brief.premise().clone()),
                "setting" => Some(brief.setting().clone()),
                "instructions" => Some(pack.instructions_block(brief.instructions().as_deref())),
                "words" => match self {
                    Self::Story { words, .. } | Self::Outline { words, .. } => {
                        Some(words.to_string())
                    }
                    _ => None,
                },
                "segments" => match self {
                    Self::Outline { segments, .. } => Some(segments.to_string()),
                    _ => None,
                },
                _ => None,
            },
            (
                Self::Segment {
                    title,
                    number,
                    total,
                    slice,
                    running_summary,
                    predecessor,
                    words,
                    instructions,
                },
                field,
            ) => match field {
                "title" => Some(title.to_string()),
                "number" => Some(number.to_string()),
                "total" => Some(total.to_string()),
                "previous_number" => Some(number.saturating_sub(1).to_string()),
                "slice" => Some(slice.to_string()),
                "running_summary" => Some(running_summary.to_string()),
                "predecessor" => Some(predecessor.to_string()),
                "words" => Some(words.to_string()),
                "min_words" => Some(((f64::from(*words) * 0.7) as u32).to_string()),
                "max_words" => Some(((f64::from(*words) * 1.6) as u32).to_string()),
                "instructions" => Some(pack.instructions_block(*instructions)),
                _ => None,
            },
            (
                Self::Epilogue {
                    title,
                    outline,
                    running_summary,
                    predecessor,
                    tail,
                    total,
                    instructions,
                },
                field,
            ) => match field {
                "title" => Some(title.to_string()),
                "outline" => Some(outline.to_string()),
                "running_summary" => Some(running_summary.to_string()),
                "predecessor" => Some(predecessor.to_string()),
                "tail" => Some(tail.to_string()),
                "total" => Some(total.to_string()),
                "instructions" => Some(pack.instructions_block(*instructions)),
                _ => None,
            },
            (Self::Synopsis { text, number }, field) => match field {
                "text" => Some(text.to_string()),
                "number" => Some(number.to_string()),
                _ => None,
            },
            (
                Self::RunningSummary {
                    previous_summary,
                    text,
                    number,
                },
                field,
            ) => match field {
                "previous_summary" => Some(previous_summary.to_string()),
                "text" => Some(text.to_string()),
                "number" => Some(number.to_string()),
                _ => None,
            },
            (
                Self::Ideas {
                    count,
                    genres,
                    min_words,
                    max_words,
                },
                field,
            ) => match field {
                "count" => Some(count.to_string()),
                "genres" => Some(genres.to_string()),
                "min_words" => Some(min_words.to_string()),
                "max_words" => Some(max_words.to_string()),
                _ => None,
            },
        }
    }
}
