//! Narrative error types.

/// Specific error conditions for narrative generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum NarrativeErrorKind {
    /// Language code or name has no bundled pack
    #[display("Language '{}' is not supported (supported: {})", requested, supported)]
    UnsupportedLanguage {
        /// The requested language
        requested: String,
        /// Comma-separated list of supported codes
        supported: String,
    },
    /// Failed to parse a language pack document
    #[display("Failed to parse language pack: {}", _0)]
    LanguagePackParse(String),
    /// Language pack lacks a required template
    #[display("Language pack '{}' is missing template '{}'", pack, key)]
    MissingTemplate {
        /// Pack name
        pack: String,
        /// Template key
        key: String,
    },
    /// Language pack lacks a required label
    #[display("Language pack '{}' is missing label '{}'", pack, key)]
    MissingLabel {
        /// Pack name
        pack: String,
        /// Label key
        key: String,
    },
    /// Template references a placeholder its context cannot provide
    #[display("Template '{}' references unknown placeholder '{{{}}}'", key, placeholder)]
    UnknownPlaceholder {
        /// Template key
        key: String,
        /// Placeholder name
        placeholder: String,
    },
    /// Requested length cannot be produced in one call and segmenting is disabled
    #[display(
        "Target of {} words exceeds single-call capacity of {} words; enable segmenting",
        words,
        capacity
    )]
    SingleCallCapacity {
        /// Buffered target word count
        words: u32,
        /// Estimated words one call can produce
        capacity: u32,
    },
    /// Story brief is unusable
    #[display("Invalid story brief: {}", _0)]
    InvalidBrief(String),
    /// Selected proposal does not exist
    #[display("Proposal {} does not exist ({} available)", choice, available)]
    ProposalOutOfRange {
        /// Requested proposal number, starting at 1
        choice: usize,
        /// Number of proposals on offer
        available: usize,
    },
}

/// Error type for narrative operations.
///
/// # Examples
///
/// ```
/// use scriptorium_error::{NarrativeError, NarrativeErrorKind};
///
/// let err = NarrativeError::new(NarrativeErrorKind::InvalidBrief("empty title".into()));
/// assert!(format!("{}", err).contains("empty title"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Narrative Error: {} at line {} in {}", kind, line, file)]
pub struct NarrativeError {
    /// The specific error condition
    pub kind: NarrativeErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl NarrativeError {
    /// Create a new NarrativeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: NarrativeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
