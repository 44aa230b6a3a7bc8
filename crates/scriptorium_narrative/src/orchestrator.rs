//! The story orchestrator.
//!
//! Sequences every step of a run: decide between a single call and segmented
//! generation, plan segments, request an outline, generate each segment with
//! its outline slice and continuity context, add an epilogue and assemble the
//! document. Every generation step yields an [`Outcome`]; failures degrade the
//! affected unit to a placeholder or notice and the run always completes.
//! Only configuration problems, detected before planning, end a run early.

use crate::{
    BoundaryRepair, ContinuityContext, ContinuityManager, GenerativeSummary, HeuristicSummary,
    LabelKey, LanguagePack, PromptContext, SummaryStrategy, error_segment, extract_segment_slice,
    format_epilogue, format_segment, format_story, plan_segments,
};
use derive_getters::Getters;
use scriptorium_core::{
    GenerationRequest, Outcome, Segment, SegmentPlan, SegmentStatus, StoryBrief, word_count,
};
use scriptorium_error::{ConfigError, NarrativeError, NarrativeErrorKind, ScriptoriumResult};
use scriptorium_interface::{GenerationDriver, Persistence};
use scriptorium_retry::RetryExecutor;
use scriptorium_storage::artifact_name;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Partial output longer than this is rescued instead of discarded.
pub const MIN_CHARS_FOR_RESCUE: usize = 100;
/// Token headroom reserved for prompts when estimating single-call capacity.
const PROMPT_TOKEN_RESERVE: u32 = 1500;
/// Characters of the last segment used as epilogue context when no tail was kept.
const EPILOGUE_FALLBACK_TAIL_CHARS: usize = 500;

/// How summaries are produced between segments.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SummaryMode {
    /// Auxiliary generation calls
    #[default]
    Generative,
    /// Word-list heuristics, no extra calls
    Heuristic,
}

/// Tunable limits of a run, loaded from the `[generation]` table.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::{GenerationMode, OrchestratorSettings};
///
/// let settings = OrchestratorSettings::default();
/// assert_eq!(settings.buffered_words(1000), 2800);
/// assert_eq!(settings.decide_mode(2800).unwrap(), GenerationMode::Single);
/// assert_eq!(settings.decide_mode(12000).unwrap(), GenerationMode::Segmented);
///
/// let single_only = settings.with_segmenting_enabled(false);
/// assert!(single_only.decide_mode(12000).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Largest planned segment, in words
    max_words_per_segment: u32,
    /// Multiplier applied to the requested length
    word_count_buffer_factor: f64,
    /// Lower bound of the buffered length
    min_story_words: u32,
    /// Upper bound of the buffered length when segmenting is off
    max_story_words_single: u32,
    /// Estimated tokens per word
    token_word_ratio: f64,
    /// Upper bound on `max_tokens` of any call
    max_tokens_per_call: u32,
    /// Whether long works may be split into segments
    segmenting_enabled: bool,
    /// Summary strategy between segments
    summary: SummaryMode,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_words_per_segment: 3000,
            word_count_buffer_factor: 2.8,
            min_story_words: 500,
            max_story_words_single: 25_000,
            token_word_ratio: 1.6,
            max_tokens_per_call: 15_000,
            segmenting_enabled: true,
            summary: SummaryMode::Generative,
        }
    }
}

impl OrchestratorSettings {
    /// Requested length scaled by the buffer factor and clamped.
    pub fn buffered_words(&self, requested: u32) -> u32 {
        let buffered = (f64::from(requested) * self.word_count_buffer_factor).round() as u32;
        let buffered = buffered.max(self.min_story_words);
        if self.segmenting_enabled {
            buffered
        } else {
            buffered.min(self.max_story_words_single)
        }
    }

    /// Words one call can be expected to produce.
    pub fn single_call_capacity(&self) -> u32 {
        let tokens = self.max_tokens_per_call.saturating_sub(PROMPT_TOKEN_RESERVE);
        (f64::from(tokens) / self.token_word_ratio.max(f64::EPSILON)) as u32
    }

    /// Single call or segmented generation for a buffered length.
    pub fn decide_mode(&self, words: u32) -> ScriptoriumResult<GenerationMode> {
        let capacity = self.single_call_capacity();
        if self.segmenting_enabled && (words > self.max_words_per_segment || words > capacity) {
            return Ok(GenerationMode::Segmented);
        }
        if words > capacity {
            return Err(
                NarrativeError::new(NarrativeErrorKind::SingleCallCapacity { words, capacity }).into(),
            );
        }
        Ok(GenerationMode::Single)
    }

    /// `max_tokens` for a single-call story of `words` words.
    pub fn story_max_tokens(&self, words: u32) -> u32 {
        self.capped_tokens(f64::from(words) * self.token_word_ratio * 1.1)
    }

    /// `max_tokens` for a segment targeting `words` words.
    pub fn segment_max_tokens(&self, words: u32) -> u32 {
        self.capped_tokens(f64::from(words) * self.token_word_ratio * 1.4 + 600.0)
    }

    fn capped_tokens(&self, estimate: f64) -> u32 {
        (estimate.round() as u32).min(self.max_tokens_per_call)
    }
}

/// Whether a story is written in one call or in segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// One call for the whole story
    #[display("single")]
    Single,
    /// Outline, segments and epilogue
    #[display("segmented")]
    Segmented,
}

/// States of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum OrchestratorState {
    /// Deciding mode and segment plan
    #[display("planning")]
    Planning,
    /// Requesting the outline
    #[display("outline generation")]
    OutlineGeneration,
    /// Generating the segment with this 1-based index
    #[display("segment loop ({})", index)]
    SegmentLoop {
        /// Segment being generated
        index: usize,
    },
    /// Deciding whether an epilogue is written
    #[display("epilogue decision")]
    EpilogueDecision,
    /// Requesting the epilogue
    #[display("epilogue generation")]
    EpilogueGeneration,
    /// Joining the document
    #[display("assembly")]
    Assembly,
    /// Finished
    #[display("done")]
    Done,
}

/// The finished document and how it came about.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct StoryDocument {
    /// Story title
    title: String,
    /// Assembled text
    text: String,
    /// Mode the story was written in
    mode: GenerationMode,
    /// Segments in order; a single-call story is one segment
    segments: Vec<Segment>,
    /// Outline, when one was generated
    outline: Option<String>,
    /// Where the outline was saved, if it was
    outline_path: Option<PathBuf>,
    /// Epilogue status; `None` when it was skipped or not applicable
    epilogue: Option<SegmentStatus>,
    /// States visited, in order
    transitions: Vec<OrchestratorState>,
}

impl StoryDocument {
    /// Words in the assembled text.
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }

    /// Segments that fell back to a placeholder.
    pub fn failed_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| *s.status() == SegmentStatus::Failed)
            .count()
    }
}

struct ArtifactSink {
    persistence: Arc<dyn Persistence>,
    directory: PathBuf,
}

/// Writes one story from a [`StoryBrief`].
pub struct StoryOrchestrator<D> {
    driver: Arc<D>,
    executor: RetryExecutor,
    pack: Arc<LanguagePack>,
    settings: OrchestratorSettings,
    continuity: ContinuityManager,
    repair: BoundaryRepair,
    artifacts: Option<ArtifactSink>,
}

impl<D> std::fmt::Debug for StoryOrchestrator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryOrchestrator")
            .field("language", &self.pack.language())
            .field("settings", &self.settings)
            .field("continuity", &self.continuity)
            .field("artifacts", &self.artifacts.as_ref().map(|a| &a.directory))
            .finish()
    }
}

impl<D: GenerationDriver + 'static> StoryOrchestrator<D> {
    /// Create an orchestrator; the summary strategy follows `settings`.
    pub fn new(
        driver: Arc<D>,
        pack: Arc<LanguagePack>,
        settings: OrchestratorSettings,
        executor: RetryExecutor,
    ) -> Self {
        let strategy: Arc<dyn SummaryStrategy> = match settings.summary() {
            SummaryMode::Generative => {
                Arc::new(GenerativeSummary::new(driver.clone(), executor.clone()))
            }
            SummaryMode::Heuristic => Arc::new(HeuristicSummary),
        };
        Self {
            continuity: ContinuityManager::new(strategy, pack.clone()),
            repair: BoundaryRepair::for_pack(&pack),
            driver,
            executor,
            pack,
            settings,
            artifacts: None,
        }
    }

    /// Replace the summary strategy.
    pub fn with_summary_strategy(mut self, strategy: Arc<dyn SummaryStrategy>) -> Self {
        self.continuity = ContinuityManager::new(strategy, self.pack.clone());
        self
    }

    /// Save the outline to `directory` through `persistence`.
    pub fn with_artifacts(
        mut self,
        persistence: Arc<dyn Persistence>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        self.artifacts = Some(ArtifactSink {
            persistence,
            directory: directory.into(),
        });
        self
    }

    /// Settings in force.
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Write the story described by `brief`.
    ///
    /// Fails only on configuration problems: a brief in a language other than
    /// the pack's, or a length no single call can produce while segmenting
    /// is disabled.
    #[instrument(skip(self, brief), fields(title = %brief.title(), language = %brief.language()))]
    pub async fn write(&self, brief: &StoryBrief) -> ScriptoriumResult<StoryDocument> {
        if *brief.language() != self.pack.language() {
            return Err(ConfigError::new(format!(
                "Brief language {} does not match language pack {}",
                brief.language(),
                self.pack.language()
            ))
            .into());
        }
        let words = self.settings.buffered_words(*brief.target_words());
        let mode = self.settings.decide_mode(words)?;
        info!(
            requested = brief.target_words(),
            buffered = words,
            mode = %mode,
            provider = self.driver.provider_name(),
            model = self.driver.model_name(),
            "Writing story"
        );

        let document = match mode {
            GenerationMode::Single => self.write_single(brief, words).await,
            GenerationMode::Segmented => self.write_segmented(brief, words).await,
        };
        info!(
            words = document.word_count(),
            failed_segments = document.failed_segments(),
            "Story finished"
        );
        Ok(document)
    }

    async fn write_single(&self, brief: &StoryBrief, words: u32) -> StoryDocument {
        let mut run = Run::default();
        run.enter(OrchestratorState::Planning);

        let request = self.pack.request(
            &PromptContext::Story { brief, words },
            self.settings.story_max_tokens(words),
            0.75,
        );
        let title = brief.title().as_str();
        let outcome = self.generate_unit("story", &request).await;
        let text = match &outcome {
            Outcome::Ok(text) => {
                let generated = word_count(text) as f64;
                if generated < f64::from(words) * 0.7 {
                    warn!(generated, target = words, "Story shorter than requested");
                }
                self.repair.repair(&format_story(text, title))
            }
            Outcome::Rescued(text, _) => format!(
                "{}\n\n{}",
                self.repair.repair(&format_story(text, title)),
                self.pack.label(LabelKey::IncompleteStoryNotice)
            ),
            Outcome::Failed(_) => format!(
                "# {}\n\n{}",
                title.trim(),
                self.pack.label(LabelKey::ErrorStoryBody)
            ),
        };

        run.enter(OrchestratorState::Assembly);
        let segment = Segment::new(1, words, text.clone(), outcome.status());
        run.enter(OrchestratorState::Done);
        StoryDocument {
            title: title.to_string(),
            text,
            mode: GenerationMode::Single,
            segments: vec![segment],
            outline: None,
            outline_path: None,
            epilogue: None,
            transitions: run.transitions,
        }
    }

    async fn write_segmented(&self, brief: &StoryBrief, words: u32) -> StoryDocument {
        let mut run = Run::default();
        run.enter(OrchestratorState::Planning);
        let plan = plan_segments(words, *self.settings.max_words_per_segment());
        info!(
            segments = plan.segment_count(),
            per_segment = ?plan.words_per_segment(),
            "Segment plan ready"
        );

        run.enter(OrchestratorState::OutlineGeneration);
        let outline = self.generate_outline(brief, words, &plan).await;
        let outline_path = outline
            .as_deref()
            .and_then(|text| self.persist_outline(brief.title(), text));

        let segment_word = self.pack.label(LabelKey::SegmentWord);
        let total = plan.segment_count();
        let mut context = self.continuity.initial_context();
        let mut segments: Vec<Segment> = Vec::with_capacity(total);

        for (index, target) in plan.iter() {
            run.enter(OrchestratorState::SegmentLoop { index });
            let slice = outline
                .as_deref()
                .and_then(|text| extract_segment_slice(text, segment_word, index));
            if outline.is_some() && slice.is_none() {
                warn!(segment = index, "No outline slice found, using placeholder");
            }
            let slice = slice.unwrap_or_else(|| self.pack.label(LabelKey::SliceUnavailable).to_string());

            let segment = self
                .generate_segment(brief, index, total, target, &slice, &context)
                .await;
            context = self.continuity.update(&context, &segment).await;
            segments.push(segment);
        }

        run.enter(OrchestratorState::EpilogueDecision);
        let last_failed = segments
            .last()
            .is_some_and(|s| *s.status() == SegmentStatus::Failed);
        let epilogue = if last_failed {
            warn!("Last segment failed, skipping epilogue");
            None
        } else {
            run.enter(OrchestratorState::EpilogueGeneration);
            let outline_text = outline
                .as_deref()
                .unwrap_or_else(|| self.pack.label(LabelKey::OutlineUnavailable));
            Some(
                self.generate_epilogue(brief, outline_text, total, &context, &segments)
                    .await,
            )
        };

        run.enter(OrchestratorState::Assembly);
        let mut parts: Vec<&str> = segments.iter().map(|s| s.text().as_str()).collect();
        let notice = self.pack.label(LabelKey::IncompleteStoryNotice);
        let epilogue_status = match &epilogue {
            Some((status, text)) => {
                parts.push(text);
                Some(*status)
            }
            None => {
                parts.push(notice);
                None
            }
        };
        let text = self.repair.repair(&parts.join("\n\n"));
        run.enter(OrchestratorState::Done);

        StoryDocument {
            title: brief.title().clone(),
            text,
            mode: GenerationMode::Segmented,
            segments,
            outline,
            outline_path,
            epilogue: epilogue_status,
            transitions: run.transitions,
        }
    }

    /// Run one call under the retry policy and classify the result.
    async fn generate_unit(&self, label: &str, request: &GenerationRequest) -> Outcome {
        match self
            .executor
            .run(label, || self.driver.generate(request))
            .await
        {
            Ok(text) if !text.trim().is_empty() => Outcome::Ok(text),
            Ok(_) => {
                error!(label, "Backend returned empty text");
                Outcome::Failed("empty completion".to_string())
            }
            Err(e) => {
                let reason = e.to_string();
                match e.partial_output() {
                    Some(partial) if partial.trim().chars().count() > MIN_CHARS_FOR_RESCUE => {
                        warn!(
                            label,
                            rescued_chars = partial.len(),
                            error = %e,
                            "Rescuing partial output"
                        );
                        Outcome::Rescued(partial.to_string(), reason)
                    }
                    _ => {
                        error!(label, error = %e, "Generation failed");
                        Outcome::Failed(reason)
                    }
                }
            }
        }
    }

    async fn generate_outline(
        &self,
        brief: &StoryBrief,
        words: u32,
        plan: &SegmentPlan,
    ) -> Option<String> {
        let context = PromptContext::Outline {
            brief,
            words,
            segments: plan.segment_count(),
        };
        let request = self
            .pack
            .request(&context, 8000.min(*self.settings.max_tokens_per_call()), 0.7);
        match self
            .executor
            .run("outline", || self.driver.generate(&request))
            .await
        {
            Ok(text) if !text.trim().is_empty() => {
                debug!(chars = text.len(), "Outline ready");
                Some(text.trim().to_string())
            }
            Ok(_) => {
                warn!("Empty outline, continuing without one");
                None
            }
            Err(e) => {
                warn!(error = %e, "Outline generation failed, continuing without one");
                None
            }
        }
    }

    fn persist_outline(&self, title: &str, outline: &str) -> Option<PathBuf> {
        let sink = self.artifacts.as_ref()?;
        let document = format!(
            "# {} '{}'\n\n{}",
            self.pack.label(LabelKey::OutlineHeader),
            title,
            outline
        );
        match sink.persistence.persist(
            &document,
            &artifact_name("outline", title),
            &sink.directory,
        ) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Could not save outline");
                None
            }
        }
    }

    #[instrument(skip(self, brief, slice, context), fields(segment = index, target_words = target))]
    async fn generate_segment(
        &self,
        brief: &StoryBrief,
        index: usize,
        total: usize,
        target: u32,
        slice: &str,
        context: &ContinuityContext,
    ) -> Segment {
        let title = brief.title().as_str();
        let prompt = PromptContext::Segment {
            title,
            number: index,
            total,
            slice,
            running_summary: context.running_summary(),
            predecessor: context.predecessor(),
            words: target,
            instructions: brief.instructions().as_deref(),
        };
        let request = self
            .pack
            .request(&prompt, self.settings.segment_max_tokens(target), 0.75);
        let outcome = self
            .generate_unit(&format!("segment {}/{}", index, total), &request)
            .await;

        let segment_word = self.pack.label(LabelKey::SegmentWord);
        let text = match &outcome {
            Outcome::Ok(text) => {
                self.check_length(index, target, text);
                self.repair
                    .repair(&format_segment(text, index, title, segment_word))
            }
            Outcome::Rescued(text, _) => format!(
                "{}\n\n{}",
                self.repair
                    .repair(&format_segment(text, index, title, segment_word)),
                self.pack.label(LabelKey::RescuedSegmentNotice)
            ),
            Outcome::Failed(_) => error_segment(index, title, &self.pack),
        };
        let segment = Segment::new(index, target, text, outcome.status());
        info!(
            words = segment.word_count(),
            status = %segment.status(),
            "Segment appended"
        );
        segment
    }

    fn check_length(&self, index: usize, target: u32, text: &str) {
        let generated = word_count(text) as f64;
        let min = f64::from(target) * 0.7;
        let max = f64::from(target) * 1.6;
        if generated < min * 0.5 {
            warn!(segment = index, generated, min, "Segment far shorter than requested");
        } else if generated > max * 1.2 {
            warn!(segment = index, generated, max, "Segment far longer than requested");
        } else if generated < min {
            debug!(segment = index, generated, min, "Segment shorter than requested, accepted");
        }
    }

    async fn generate_epilogue(
        &self,
        brief: &StoryBrief,
        outline: &str,
        total: usize,
        context: &ContinuityContext,
        segments: &[Segment],
    ) -> (SegmentStatus, String) {
        let fallback_tail;
        let tail = if context.tail().is_empty() {
            fallback_tail = segments
                .last()
                .map(|s| last_chars(s.text(), EPILOGUE_FALLBACK_TAIL_CHARS))
                .unwrap_or_default();
            fallback_tail.as_str()
        } else {
            context.tail().as_str()
        };

        let prompt = PromptContext::Epilogue {
            title: brief.title(),
            outline,
            running_summary: context.running_summary(),
            predecessor: context.predecessor(),
            tail,
            total,
            instructions: brief.instructions().as_deref(),
        };
        let request = self
            .pack
            .request(&prompt, 3500.min(*self.settings.max_tokens_per_call()), 0.7);
        let outcome = self.generate_unit("epilogue", &request).await;

        let epilogue_word = self.pack.label(LabelKey::EpilogueWord);
        let notice = self.pack.label(LabelKey::IncompleteStoryNotice);
        let text = match &outcome {
            Outcome::Ok(text) => self
                .repair
                .repair(&format_epilogue(text, brief.title(), epilogue_word)),
            Outcome::Rescued(text, _) => format!(
                "{}\n\n{}",
                self.repair
                    .repair(&format_epilogue(text, brief.title(), epilogue_word)),
                notice
            ),
            Outcome::Failed(_) => notice.to_string(),
        };
        (outcome.status(), text)
    }
}

/// Visited states of one run.
#[derive(Debug, Default)]
struct Run {
    transitions: Vec<OrchestratorState>,
}

impl Run {
    fn enter(&mut self, state: OrchestratorState) {
        info!(state = %state, "Entering state");
        self.transitions.push(state);
    }
}

fn last_chars(text: &str, n: usize) -> String {
    let total = text.chars().count();
    text.chars().skip(total.saturating_sub(n)).collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_reserves_prompt_tokens() {
        assert_eq!(OrchestratorSettings::default().single_call_capacity(), 8437);
    }

    #[test]
    fn buffered_words_are_clamped() {
        let settings = OrchestratorSettings::default();
        assert_eq!(settings.buffered_words(10), 500);
        assert_eq!(settings.buffered_words(20_000), 56_000);
        let single = settings.with_segmenting_enabled(false);
        assert_eq!(single.buffered_words(20_000), 25_000);
    }

    #[test]
    fn token_budgets_are_capped() {
        let settings = OrchestratorSettings::default();
        assert_eq!(settings.segment_max_tokens(2400), 5976);
        assert_eq!(settings.segment_max_tokens(9000), 15_000);
        assert_eq!(settings.story_max_tokens(2800), 4928);
    }

    #[test]
    fn single_mode_over_capacity_is_a_configuration_error() {
        let settings = OrchestratorSettings::default().with_segmenting_enabled(false);
        let err = settings.decide_mode(9000).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("8437"));
    }

    #[test]
    fn summary_mode_parses_case_insensitively() {
        assert_eq!("Heuristic".parse::<SummaryMode>().ok(), Some(SummaryMode::Heuristic));
        assert_eq!(SummaryMode::Generative.to_string(), "generative");
    }

    #[test]
    fn settings_deserialize_partially() {
        let settings: OrchestratorSettings =
            toml::from_str("max_words_per_segment = 2000\nsummary = \"heuristic\"").unwrap();
        assert_eq!(*settings.max_words_per_segment(), 2000);
        assert_eq!(*settings.summary(), SummaryMode::Heuristic);
        assert_eq!(*settings.max_tokens_per_call(), 15_000);
    }

    #[test]
    fn last_chars_is_char_safe() {
        assert_eq!(last_chars("äöü", 2), "öü");
    }
}
