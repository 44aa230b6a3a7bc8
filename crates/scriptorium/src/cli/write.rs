//! Story writing command handler.

use super::{OutputTarget, WriteArgs, deliver, resolve_pack};
use scriptorium::{
    FileSystemPersistence, GenerationDriver, LabelKey, LanguagePack, NarrativeError,
    NarrativeErrorKind, OrchestratorSettings, RetryExecutor, ScriptoriumConfig, ScriptoriumResult,
    StoryBrief, StoryDocument, StoryOrchestrator, artifact_name,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Write one story and print or save it.
#[instrument(skip_all, fields(title = %args.title, words = args.words))]
pub async fn run_write(args: WriteArgs, config: &ScriptoriumConfig) -> ScriptoriumResult<()> {
    let pack = Arc::new(resolve_pack(
        args.language.as_deref(),
        args.language_pack.as_deref(),
    )?);

    let mut builder = StoryBrief::builder();
    builder
        .title(args.title.clone())
        .premise(args.premise.clone())
        .setting(args.setting.clone())
        .target_words(args.words)
        .language(pack.language());
    if let Some(instructions) = args.instructions.clone() {
        builder.instructions(instructions);
    }
    let brief = builder
        .build()
        .map_err(|e| NarrativeError::new(NarrativeErrorKind::InvalidBrief(e.to_string())))?;

    let mut settings = config.generation().clone();
    if args.no_segments {
        settings = settings.with_segmenting_enabled(false);
    }
    if let Some(max) = args.max_words_per_segment {
        settings = settings.with_max_words_per_segment(max);
    }
    if let Some(summary) = args.summary {
        settings = settings.with_summary(summary);
    }

    let mut backend = config.backend().clone();
    if let Some(model) = args.model.clone() {
        backend = backend.with_model(model);
    }
    let client = Arc::new(backend.client()?);
    let executor = RetryExecutor::new(config.retry().clone());

    let target = OutputTarget::new(
        args.output_dir
            .clone()
            .unwrap_or_else(|| config.output().directory().clone()),
    );
    compose_story(
        client,
        pack,
        settings,
        executor,
        &brief,
        args.save.then_some(&target),
    )
    .await?;
    Ok(())
}

/// Run the orchestrator for `brief`, then save the story under `target` or print it.
///
/// The outline is saved alongside when a target is given.
pub(crate) async fn compose_story<D: GenerationDriver + 'static>(
    driver: Arc<D>,
    pack: Arc<LanguagePack>,
    settings: OrchestratorSettings,
    executor: RetryExecutor,
    brief: &StoryBrief,
    target: Option<&OutputTarget>,
) -> ScriptoriumResult<StoryDocument> {
    let mut orchestrator = StoryOrchestrator::new(driver, pack.clone(), settings, executor);
    if let Some(target) = target {
        orchestrator =
            orchestrator.with_artifacts(Arc::new(FileSystemPersistence), target.artifacts());
    }

    let document = orchestrator.write(brief).await?;
    if document.failed_segments() > 0 {
        warn!(
            failed = document.failed_segments(),
            "Some segments could not be generated and contain placeholders"
        );
    }
    info!(
        mode = %document.mode(),
        segments = document.segments().len(),
        words = document.word_count(),
        "Story ready"
    );

    let name = artifact_name(pack.label(LabelKey::StoryFilePrefix), brief.title());
    deliver(document.text(), &name, target.map(OutputTarget::story));
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scriptorium::{GenerationMode, GenerationRequest, Language, RetryPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STORY: &str = "Vera boarded the night train at Irkutsk and found her compartment empty. \
        The lamps flickered as the carriage swayed east, and somewhere behind the wall a \
        voice hummed an old song. She listened until dawn and then she slept.";

    struct CannedDriver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationDriver for CannedDriver {
        async fn generate(&self, _request: &GenerationRequest) -> ScriptoriumResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(STORY.to_string())
        }

        fn provider_name(&self) -> &'static str {
            "canned"
        }

        fn model_name(&self) -> &str {
            "canned-1"
        }
    }

    fn brief() -> StoryBrief {
        StoryBrief::builder()
            .title("The Last Train")
            .premise("A conductor hears voices in an empty carriage.")
            .setting("Trans-Siberian railway, winter 1953")
            .target_words(600u32)
            .language(Language::English)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn story_is_saved_to_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let story_path = dir.path().join("train.txt");
        let target = OutputTarget::new(story_path.clone());
        let driver = Arc::new(CannedDriver {
            calls: AtomicUsize::new(0),
        });
        let pack = Arc::new(LanguagePack::bundled(Language::English).unwrap());

        let document = compose_story(
            driver.clone(),
            pack,
            OrchestratorSettings::default(),
            RetryExecutor::new(RetryPolicy::default()),
            &brief(),
            Some(&target),
        )
        .await
        .unwrap();

        assert_eq!(*document.mode(), GenerationMode::Single);
        assert_eq!(driver.calls.load(Ordering::SeqCst), 1);
        let saved = std::fs::read_to_string(&story_path).unwrap();
        assert_eq!(saved, format!("{}\n", document.text().trim_end()));
        assert!(saved.contains("She listened until dawn"));
    }
}
