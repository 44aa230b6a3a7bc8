//! Idea proposals against a scripted backend.

mod test_utils;

use scriptorium_core::Language;
use scriptorium_error::GenerationErrorKind;
use scriptorium_narrative::{IDEA_WORD_RANGE, IdeaGenerator, LanguagePack};
use std::sync::Arc;
use test_utils::{MockDriver, MockResponse, fast_executor};

const TRUNCATED: &str = r#"Here are your ideas:
[
  {"title": "Salt", "premise": "A map drawn in salt.", "setting": "Drowned city", "genre": "Fantasy", "word_count": 6000},
  {"title": "The Ferry", "prompt": "A ferryman never speaks.", "setting": "Elbe, 1923"},
  {"title": "Cut off", "premise": "The response ends here"#;

#[tokio::test]
async fn test_truncated_response_yields_complete_ideas() {
    let driver = Arc::new(MockDriver::new_success(TRUNCATED));
    let pack = LanguagePack::bundled(Language::English).unwrap();
    let ideas = IdeaGenerator::new(driver.clone(), fast_executor())
        .propose(3, &pack, Some("Mystery"))
        .await
        .unwrap();

    assert_eq!(ideas.len(), 2);
    assert_eq!(ideas[0].title(), "Salt");
    assert_eq!(*ideas[0].word_count(), 6000);
    assert_eq!(ideas[1].premise(), "A ferryman never speaks.");
    assert_eq!(ideas[1].genre(), "[Unknown]");
    assert!(IDEA_WORD_RANGE.contains(ideas[1].word_count()));

    let request = &driver.requests()[0];
    assert_eq!(*request.max_tokens(), 1500);
    assert!(request.system_prompt().contains("Mystery"));
}

#[tokio::test]
async fn test_partial_output_is_salvaged() {
    let driver = Arc::new(MockDriver::new_routed(|_, _| MockResponse::Partial {
        error: GenerationErrorKind::StreamInterrupted("stream closed by peer".into()),
        text: TRUNCATED.to_string(),
    }));
    let pack = LanguagePack::bundled(Language::English).unwrap();
    let ideas = IdeaGenerator::new(driver, fast_executor())
        .propose(4, &pack, None)
        .await
        .unwrap();
    assert_eq!(ideas.len(), 2);
}

#[tokio::test]
async fn test_failure_without_output_is_an_error() {
    let driver = Arc::new(MockDriver::new_routed(|_, _| {
        MockResponse::Error(GenerationErrorKind::Backend("invalid api key".into()))
    }));
    let pack = LanguagePack::bundled(Language::English).unwrap();
    let result = IdeaGenerator::new(driver, fast_executor())
        .propose(2, &pack, None)
        .await;
    assert!(result.is_err());
}
