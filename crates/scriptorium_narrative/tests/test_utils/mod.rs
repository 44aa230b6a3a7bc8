//! Test utilities for the narrative crate.

#![allow(dead_code)]

pub mod mock_driver;

#[allow(unused_imports)]
pub use mock_driver::{MockDriver, MockResponse};

use scriptorium_core::{GenerationRequest, Language, StoryBrief};
use scriptorium_retry::{RetryExecutor, RetryPolicy};

/// What kind of call a request is, judged by its user prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Story,
    Outline,
    Segment(usize),
    Synopsis,
    RunningSummary,
    Epilogue,
    Ideas,
}

/// Classify an English-pack request.
pub fn call_kind(request: &GenerationRequest) -> CallKind {
    let user = request.user_prompt();
    if let Some(rest) = user.strip_prefix("Please write chapter ") {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        return CallKind::Segment(digits.parse().unwrap_or(0));
    }
    if user.contains("plot outline") {
        CallKind::Outline
    } else if user.contains("summarize the previous chapter") {
        CallKind::Synopsis
    } else if user.contains("running story summary") {
        CallKind::RunningSummary
    } else if user.contains("epilogue") {
        CallKind::Epilogue
    } else if user.contains("story ideas") {
        CallKind::Ideas
    } else {
        CallKind::Story
    }
}

/// An outline with one section per chapter and an epilogue section.
pub fn outline_for(segments: usize) -> String {
    let mut outline = String::from("**Main characters:** Vera, a conductor. Anton, a stowaway.\n\n");
    for n in 1..=segments {
        outline.push_str(&format!(
            "## Chapter {}: Station {}\n- Plot point for chapter {}.\n- Vera checks the carriages.\n\n",
            n, n, n
        ));
    }
    outline.push_str("## Epilogue\n- Spring arrives in Vladivostok.");
    outline
}

/// A well-formed chapter of prose.
pub fn chapter_text(number: usize) -> String {
    let paragraph = "Vera walked the length of the carriage and listened to the wheels. \
                     The lamps flickered as the train climbed into the hills, and Anton \
                     watched her from the shadows without a word.";
    format!(
        "## Chapter {}: Station {}\n\n{}\n\n{}\n\nShe closed the door of compartment {} behind her.",
        number, number, paragraph, paragraph, number
    )
}

/// Answer every English-pack call kind with plausible text.
pub fn happy_response(request: &GenerationRequest) -> MockResponse {
    match call_kind(request) {
        CallKind::Story => MockResponse::Success(format!(
            "# A Different Title\n\n{}",
            chapter_text(1).replace("## Chapter 1: Station 1\n\n", "")
        )),
        CallKind::Outline => MockResponse::Success(outline_for(5)),
        CallKind::Segment(n) => MockResponse::Success(chapter_text(n)),
        CallKind::Synopsis => {
            MockResponse::Success("Summary: Vera boarded the night train and heard a voice.".into())
        }
        CallKind::RunningSummary => MockResponse::Success(
            "Updated Overall Summary: Vera is travelling east with a stowaway.".into(),
        ),
        CallKind::Epilogue => MockResponse::Success(
            "## Epilogue\n\nIn spring the train reached the coast, and Vera finally slept.".into(),
        ),
        CallKind::Ideas => MockResponse::Success("[]".into()),
    }
}

/// Retry policy with millisecond delays.
pub fn fast_executor() -> RetryExecutor {
    RetryExecutor::new(
        RetryPolicy::default()
            .with_base_delay_ms(1)
            .with_jitter_min_ms(0)
            .with_jitter_max_ms(1),
    )
}

/// An English brief.
pub fn brief(target_words: u32) -> StoryBrief {
    StoryBrief::builder()
        .title("The Last Train")
        .premise("A conductor hears voices in an empty carriage.")
        .setting("Trans-Siberian railway, winter 1953")
        .target_words(target_words)
        .language(Language::English)
        .build()
        .expect("Failed to build test brief")
}
