//! Idea proposal command handler.

use super::{IdeasArgs, OutputTarget, compose_story, deliver, resolve_pack};
use scriptorium::{
    GenerationDriver, IdeaGenerator, LabelKey, LanguagePack, OrchestratorSettings, RetryExecutor,
    ScriptoriumConfig, ScriptoriumResult, StoryDocument, artifact_name, brief_from_idea,
    format_proposal, select_proposal,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Propose ideas, print or save each one, and optionally write one of them.
#[instrument(skip_all, fields(count = args.count))]
pub async fn run_ideas(args: IdeasArgs, config: &ScriptoriumConfig) -> ScriptoriumResult<()> {
    let pack = Arc::new(resolve_pack(
        args.language.as_deref(),
        args.language_pack.as_deref(),
    )?);

    let mut backend = config.backend().clone();
    if let Some(model) = args.model.clone() {
        backend = backend.with_model(model);
    }
    let target = OutputTarget::new(
        args.output_dir
            .clone()
            .unwrap_or_else(|| config.output().directory().clone()),
    );
    propose_and_write(
        Arc::new(backend.client()?),
        pack,
        config.generation().clone(),
        RetryExecutor::new(config.retry().clone()),
        &args,
        &target,
    )
    .await?;
    Ok(())
}

/// Present the proposals, then write the chosen one when `--write` is given.
async fn propose_and_write<D: GenerationDriver + 'static>(
    driver: Arc<D>,
    pack: Arc<LanguagePack>,
    settings: OrchestratorSettings,
    executor: RetryExecutor,
    args: &IdeasArgs,
    target: &OutputTarget,
) -> ScriptoriumResult<Option<StoryDocument>> {
    let generator = IdeaGenerator::new(driver.clone(), executor.clone());
    let ideas = generator
        .propose(args.count, &pack, args.genre.as_deref())
        .await?;
    if ideas.is_empty() {
        info!("No usable ideas in the response");
        return Ok(None);
    }

    for (number, idea) in ideas.iter().enumerate() {
        let name = artifact_name(pack.label(LabelKey::ProposalFilePrefix), idea.title());
        if !args.save {
            println!("[{}]", number + 1);
        }
        deliver(
            &format_proposal(idea, &pack),
            &name,
            args.save.then_some(target.artifacts()),
        );
    }

    let Some(choice) = args.write else {
        return Ok(None);
    };
    let idea = select_proposal(&ideas, choice)?;
    let brief = brief_from_idea(idea, pack.language())?;
    let document = compose_story(
        driver,
        pack,
        settings,
        executor,
        &brief,
        args.save.then_some(target),
    )
    .await?;
    Ok(Some(document))
}
