//! Continuity across segments generated without shared memory.
//!
//! Two artifacts travel from one segment to the next:
//!
//! - the **detailed predecessor**: a synopsis of the segment just written plus
//!   its verbatim ending, wrapped in fixed markers;
//! - the **running summary**: a cumulative synopsis of the whole story so far,
//!   rewritten after every segment.
//!
//! How synopses are produced is a [`SummaryStrategy`]: either an auxiliary
//! generation call ([`GenerativeSummary`]) or a cheap word-list heuristic
//! ([`HeuristicSummary`]). Both degrade to keeping prior context; continuity
//! problems never abort a run.

use crate::{LabelKey, LanguagePack, PromptContext};
use async_trait::async_trait;
use derive_getters::Getters;
use regex::Regex;
use scriptorium_core::{Segment, SegmentStatus};
use scriptorium_error::ScriptoriumResult;
use scriptorium_interface::GenerationDriver;
use scriptorium_retry::RetryExecutor;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument, warn};

/// Characters of verbatim ending carried into the next prompt.
pub const TAIL_CHARS: usize = 800;
/// Upper bound on the verbatim ending.
pub const TAIL_MAX_CHARS: usize = 1200;
/// A paragraph break this far into the tail window becomes the tail start.
const TAIL_BREAK_RATIO: f64 = 0.3;
/// Segments shorter than this get the fallback synopsis.
const MIN_SYNOPSIS_CHARS: usize = 100;
/// Segments shorter than this leave the running summary untouched.
const MIN_RUNNING_SUMMARY_CHARS: usize = 50;
/// Warn when a rewritten summary shrinks below this share of the previous one.
const SUMMARY_SHRINK_WARNING: f64 = 0.7;

static CAPITALISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}\p{Ll}{2,}\b").expect("Valid capitalised word regex"));
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?\n]+[.!?]+").expect("Valid sentence regex"));

/// Context carried from one segment into the next.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ContinuityContext {
    /// Synopsis plus verbatim ending of the previous segment
    predecessor: String,
    /// Verbatim ending alone, kept for the epilogue
    tail: String,
    /// Cumulative summary, label included
    running_summary: String,
}

impl ContinuityContext {
    /// Assemble a context.
    pub fn new(
        predecessor: impl Into<String>,
        tail: impl Into<String>,
        running_summary: impl Into<String>,
    ) -> Self {
        Self {
            predecessor: predecessor.into(),
            tail: tail.into(),
            running_summary: running_summary.into(),
        }
    }
}

/// Produces synopses and running summaries.
#[async_trait]
pub trait SummaryStrategy: Send + Sync {
    /// A short synopsis of one segment.
    async fn synopsis(
        &self,
        pack: &LanguagePack,
        text: &str,
        number: usize,
    ) -> ScriptoriumResult<String>;

    /// `previous` rewritten to include segment `number`. `previous` is empty
    /// before the first update.
    async fn running_summary(
        &self,
        pack: &LanguagePack,
        previous: &str,
        text: &str,
        number: usize,
    ) -> ScriptoriumResult<String>;

    /// Strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Summaries written by the generation backend.
pub struct GenerativeSummary<D> {
    driver: Arc<D>,
    executor: RetryExecutor,
}

impl<D: GenerationDriver> GenerativeSummary<D> {
    /// Create a strategy that calls `driver` under `executor`.
    pub fn new(driver: Arc<D>, executor: RetryExecutor) -> Self {
        Self { driver, executor }
    }
}

#[async_trait]
impl<D: GenerationDriver + 'static> SummaryStrategy for GenerativeSummary<D> {
    async fn synopsis(
        &self,
        pack: &LanguagePack,
        text: &str,
        number: usize,
    ) -> ScriptoriumResult<String> {
        let request = pack.request(&PromptContext::Synopsis { text, number }, 800, 0.55);
        let label = format!("synopsis {}", number);
        self.executor
            .run(&label, || self.driver.generate(&request))
            .await
    }

    async fn running_summary(
        &self,
        pack: &LanguagePack,
        previous: &str,
        text: &str,
        number: usize,
    ) -> ScriptoriumResult<String> {
        let context = PromptContext::RunningSummary {
            previous_summary: previous,
            text,
            number,
        };
        let request = pack.request(&context, 1500, 0.6);
        let label = format!("running summary {}", number);
        self.executor
            .run(&label, || self.driver.generate(&request))
            .await
    }

    fn name(&self) -> &'static str {
        "generative"
    }
}

/// Summaries assembled from word lists, without any generation call.
///
/// Names are capitalised words that recur and are not articles; events are
/// sentences containing one of the pack's action verbs or emotion words.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSummary;

impl HeuristicSummary {
    const MAX_NAMES: usize = 6;
    const MAX_EVENTS: usize = 5;

    fn names(pack: &LanguagePack, text: &str) -> Vec<String> {
        let articles = pack.words().article_words();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for word in CAPITALISED.find_iter(text).map(|m| m.as_str()) {
            if articles.iter().any(|a| a == word) {
                continue;
            }
            let count = counts.entry(word).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }
        let mut names: Vec<&str> = order.into_iter().filter(|w| counts[w] >= 2).collect();
        names.sort_by_key(|w| std::cmp::Reverse(counts[w]));
        names
            .into_iter()
            .take(Self::MAX_NAMES)
            .map(str::to_string)
            .collect()
    }

    fn events(pack: &LanguagePack, text: &str) -> Vec<String> {
        let words = pack.words();
        let markers: Vec<String> = words
            .action_verbs()
            .iter()
            .chain(words.emotion_words())
            .map(|w| w.to_lowercase())
            .collect();
        let sentences: Vec<&str> = SENTENCE.find_iter(text).map(|m| m.as_str().trim()).collect();

        let mut events: Vec<String> = sentences
            .iter()
            .filter(|s| {
                s.split(|c: char| !c.is_alphanumeric())
                    .any(|token| markers.contains(&token.to_lowercase()))
            })
            .take(Self::MAX_EVENTS)
            .map(|s| s.to_string())
            .collect();
        if let Some(last) = sentences.last()
            && !events.iter().any(|e| e == last)
        {
            events.push(last.to_string());
        }
        events
    }

    fn describe(pack: &LanguagePack, text: &str) -> String {
        let names = Self::names(pack, text);
        let events = Self::events(pack, text);
        let mut out = String::new();
        if !names.is_empty() {
            out.push_str(&format!(
                "{}: {}.",
                pack.label(LabelKey::HeuristicCharacters),
                names.join(", ")
            ));
        }
        if !events.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!(
                "{}: {}",
                pack.label(LabelKey::HeuristicEvents),
                events.join(" ")
            ));
        }
        out
    }
}

#[async_trait]
impl SummaryStrategy for HeuristicSummary {
    async fn synopsis(
        &self,
        pack: &LanguagePack,
        text: &str,
        _number: usize,
    ) -> ScriptoriumResult<String> {
        Ok(Self::describe(pack, text))
    }

    async fn running_summary(
        &self,
        pack: &LanguagePack,
        previous: &str,
        text: &str,
        number: usize,
    ) -> ScriptoriumResult<String> {
        let entry = format!(
            "{} {}: {}",
            pack.label(LabelKey::SegmentWord),
            number,
            Self::describe(pack, text).replace('\n', " ")
        );
        if previous.trim().is_empty() {
            Ok(entry)
        } else {
            Ok(format!("{}\n{}", previous.trim_end(), entry))
        }
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// The verbatim ending of `text` carried into the next prompt.
///
/// Takes the last [`TAIL_CHARS`] characters; if a paragraph break lies more
/// than 30% into that window, the tail starts after it.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::extract_tail;
///
/// let text = format!("{}\n\nShe closed the door.", "x".repeat(1000));
/// assert_eq!(extract_tail(&text), "She closed the door.");
/// assert_eq!(extract_tail("  short  "), "short");
/// ```
pub fn extract_tail(text: &str) -> String {
    let text = text.trim();
    let total = text.chars().count();
    let start = text
        .char_indices()
        .nth(total.saturating_sub(TAIL_CHARS))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let window = &text[start..];

    let window_chars = window.chars().count();
    let tail = match window.rfind("\n\n") {
        Some(pos) if window[..pos].chars().count() as f64 > window_chars as f64 * TAIL_BREAK_RATIO => {
            &window[pos..]
        }
        _ => window,
    }
    .trim();

    let chars = tail.chars().count();
    if chars > TAIL_MAX_CHARS {
        tail.chars().skip(chars - TAIL_MAX_CHARS).collect()
    } else {
        tail.to_string()
    }
}

/// Remove a leading "Summary:"-style heading a model may have added.
fn strip_summary_label(text: &str, labels: &[String]) -> String {
    let mut rest = text.trim();
    for label in labels {
        let unwrapped = rest.trim_start_matches(['*', '#', ' ']);
        if unwrapped.len() >= label.len()
            && unwrapped.is_char_boundary(label.len())
            && unwrapped[..label.len()].eq_ignore_ascii_case(label)
        {
            rest = unwrapped[label.len()..].trim_start_matches(['*', ':', ' ', '\n', '\t']);
            break;
        }
    }
    rest.trim().to_string()
}

/// Maintains [`ContinuityContext`] with a [`SummaryStrategy`].
pub struct ContinuityManager {
    strategy: Arc<dyn SummaryStrategy>,
    pack: Arc<LanguagePack>,
}

impl std::fmt::Debug for ContinuityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuityManager")
            .field("strategy", &self.strategy.name())
            .field("language", &self.pack.language())
            .finish()
    }
}

impl ContinuityManager {
    /// Create a manager.
    pub fn new(strategy: Arc<dyn SummaryStrategy>, pack: Arc<LanguagePack>) -> Self {
        Self { strategy, pack }
    }

    /// Name of the strategy in use.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Context for the first segment.
    pub fn initial_context(&self) -> ContinuityContext {
        ContinuityContext::new(
            self.pack.label(LabelKey::FirstSegmentContext),
            "",
            self.summary_with_label(self.pack.label(LabelKey::RunningSummaryInitial)),
        )
    }

    /// Context after `segment` has been appended.
    ///
    /// Failed and rescued segments are not summarised: the running summary
    /// stays as it was and the predecessor becomes the fixed fallback.
    #[instrument(skip(self, context, segment), fields(segment = segment.index(), status = %segment.status()))]
    pub async fn update(&self, context: &ContinuityContext, segment: &Segment) -> ContinuityContext {
        if *segment.status() != SegmentStatus::Ok {
            warn!(
                segment = segment.index(),
                status = %segment.status(),
                "Skipping continuity update for degraded segment"
            );
            return ContinuityContext::new(
                self.compose_predecessor(self.pack.label(LabelKey::SynopsisFallback), ""),
                "",
                context.running_summary().clone(),
            );
        }

        let (predecessor, tail) = self
            .detailed_predecessor(segment.text(), *segment.index())
            .await;
        let running_summary = self
            .update_running_summary(context.running_summary(), segment.text(), *segment.index())
            .await;
        ContinuityContext::new(predecessor, tail, running_summary)
    }

    /// Synopsis plus verbatim ending of `text`, and the ending alone.
    pub async fn detailed_predecessor(&self, text: &str, number: usize) -> (String, String) {
        let tail = extract_tail(text);
        let fallback = self.pack.label(LabelKey::SynopsisFallback);

        if text.trim().chars().count() < MIN_SYNOPSIS_CHARS {
            warn!(segment = number, "Segment too short for a synopsis, using fallback");
            return (self.compose_predecessor(fallback, &tail), tail);
        }

        let synopsis = match self.strategy.synopsis(&self.pack, text, number).await {
            Ok(raw) => {
                let cleaned = strip_summary_label(&raw, self.pack.words().summary_labels());
                if cleaned.is_empty() {
                    warn!(segment = number, "Empty synopsis, using fallback");
                    fallback.to_string()
                } else {
                    info!(segment = number, strategy = self.strategy.name(), "Synopsis ready");
                    cleaned
                }
            }
            Err(e) => {
                warn!(segment = number, error = %e, "Synopsis failed, using fallback");
                fallback.to_string()
            }
        };
        (self.compose_predecessor(&synopsis, &tail), tail)
    }

    /// `previous` (label included) rewritten to cover segment `number`.
    ///
    /// Returns `previous` unchanged when the segment is too short, the
    /// strategy fails, or the result is empty.
    pub async fn update_running_summary(&self, previous: &str, text: &str, number: usize) -> String {
        if text.trim().chars().count() < MIN_RUNNING_SUMMARY_CHARS {
            warn!(segment = number, "Segment too short, keeping running summary");
            return previous.to_string();
        }

        let label = self.pack.label(LabelKey::RunningSummaryLabel);
        let body = previous.strip_prefix(label).unwrap_or(previous).trim();
        let body = if body == self.pack.label(LabelKey::RunningSummaryInitial) {
            ""
        } else {
            body
        };

        let updated = match self
            .strategy
            .running_summary(&self.pack, body, text, number)
            .await
        {
            Ok(raw) => strip_summary_label(&raw, self.pack.words().summary_labels()),
            Err(e) => {
                warn!(segment = number, error = %e, "Running summary update failed, keeping previous");
                return previous.to_string();
            }
        };
        if updated.is_empty() {
            warn!(segment = number, "Empty running summary, keeping previous");
            return previous.to_string();
        }

        let shrink = updated.chars().count() as f64 / body.chars().count().max(1) as f64;
        if number > 1 && !body.is_empty() && shrink < SUMMARY_SHRINK_WARNING {
            warn!(
                segment = number,
                previous_chars = body.chars().count(),
                new_chars = updated.chars().count(),
                "Running summary shrank noticeably"
            );
        }
        debug!(segment = number, chars = updated.len(), "Running summary updated");
        self.summary_with_label(&updated)
    }

    fn summary_with_label(&self, body: &str) -> String {
        format!("{}\n{}", self.pack.label(LabelKey::RunningSummaryLabel), body)
    }

    fn compose_predecessor(&self, synopsis: &str, tail: &str) -> String {
        let mut out = format!("{}\n{}", self.pack.label(LabelKey::SynopsisPrefix), synopsis);
        if !tail.is_empty() {
            out.push_str(&format!(
                "\n\n{}\n...{}\n{}",
                self.pack.label(LabelKey::TailMarkerStart),
                tail,
                self.pack.label(LabelKey::TailMarkerEnd)
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::Language;

    fn english() -> Arc<LanguagePack> {
        Arc::new(LanguagePack::bundled(Language::English).unwrap())
    }

    #[test]
    fn tail_ignores_early_paragraph_break() {
        let text = format!("Intro.\n\n{}", "y".repeat(900));
        assert_eq!(extract_tail(&text).chars().count(), 800);
    }

    #[test]
    fn tail_is_char_boundary_safe() {
        let text = "ü".repeat(900);
        assert_eq!(extract_tail(&text).chars().count(), 800);
    }

    #[test]
    fn summary_labels_are_stripped() {
        let labels = vec!["Updated Overall Summary".to_string(), "Summary".to_string()];
        assert_eq!(strip_summary_label("**Summary:** Vera boards.", &labels), "Vera boards.");
        assert_eq!(strip_summary_label("summary:\nVera boards.", &labels), "Vera boards.");
        assert_eq!(strip_summary_label("Vera boards.", &labels), "Vera boards.");
    }

    #[tokio::test]
    async fn heuristic_summary_collects_names_and_events() {
        let pack = english();
        let text = "Vera walked the corridor. The lamps flickered. Vera saw a shadow near Anton. \
                    Anton felt only fear as the train slowed.";
        let synopsis = HeuristicSummary.synopsis(&pack, text, 1).await.unwrap();
        assert!(synopsis.starts_with("Characters: Vera, Anton."));
        assert!(synopsis.contains("Vera saw a shadow near Anton."));
        assert!(synopsis.contains("Anton felt only fear as the train slowed."));
        assert!(!synopsis.contains("The lamps flickered."));
    }

    #[tokio::test]
    async fn heuristic_running_summary_replaces_initial_placeholder() {
        let pack = english();
        let manager = ContinuityManager::new(Arc::new(HeuristicSummary), pack.clone());
        let initial = manager.initial_context();
        let text = "Vera saw the shadow again and again. Vera ran down the corridor toward the engine.";
        let updated = manager
            .update_running_summary(initial.running_summary(), text, 1)
            .await;
        assert!(updated.starts_with(pack.label(LabelKey::RunningSummaryLabel)));
        assert!(!updated.contains(pack.label(LabelKey::RunningSummaryInitial)));
        assert!(updated.contains("Chapter 1:"));
    }

    #[tokio::test]
    async fn degraded_segment_keeps_summary_and_uses_fallback() {
        let pack = english();
        let manager = ContinuityManager::new(Arc::new(HeuristicSummary), pack.clone());
        let before = ContinuityContext::new("old", "old tail", "summary so far");
        let segment = Segment::new(2, 1000, "## Chapter 2: [Generation Error]", SegmentStatus::Failed);
        let after = manager.update(&before, &segment).await;
        assert_eq!(after.running_summary(), "summary so far");
        assert_eq!(
            after.predecessor(),
            &format!(
                "{}\n{}",
                pack.label(LabelKey::SynopsisPrefix),
                pack.label(LabelKey::SynopsisFallback)
            )
        );
        assert!(after.tail().is_empty());
    }
}
