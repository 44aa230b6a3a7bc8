//! Recovery of JSON records from truncated or prose-wrapped responses.
//!
//! Models asked for a JSON array often wrap it in explanations, fence it in
//! markdown, or run out of tokens halfway through the last object. The fast
//! path parses the first array it can find; when that fails, a brace scanner
//! pulls out every complete top-level object and parses each in isolation.

use derive_getters::Getters;
use rand::Rng;
use regex::Regex;
use scriptorium_core::StoryIdea;
use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use std::sync::LazyLock;
use tracing::{debug, warn};

static JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```|(\[.*\])").expect("Valid JSON array regex")
});

const TITLE_KEYS: &[&str] = &["title", "titel"];
const PREMISE_KEYS: &[&str] = &["premise", "prompt", "grundidee"];
const SETTING_KEYS: &[&str] = &["setting", "schauplatz"];
const GENRE_KEYS: &[&str] = &["genre"];
const WORD_COUNT_KEYS: &[&str] = &["word_count", "wordcount", "wortanzahl"];

/// Every complete JSON object found in `raw`, in order of appearance.
///
/// Never fails: an unparseable response yields an empty list.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::salvage_objects;
///
/// let raw = r#"Here you go: [{"a":1},{"b":2},{"c":"#;
/// let objects = salvage_objects(raw);
/// assert_eq!(objects.len(), 2);
/// assert_eq!(objects[1]["b"], 2);
/// ```
pub fn salvage_objects(raw: &str) -> Vec<Map<String, Value>> {
    if let Some(objects) = parse_array(raw) {
        debug!(count = objects.len(), "Parsed JSON array directly");
        return objects;
    }

    let objects = scan_objects(raw);
    if objects.is_empty() {
        warn!(chars = raw.len(), "No JSON objects could be salvaged");
    } else {
        debug!(count = objects.len(), "Salvaged JSON objects by brace scan");
    }
    objects
}

fn parse_array(raw: &str) -> Option<Vec<Map<String, Value>>> {
    let caps = JSON_ARRAY.captures(raw)?;
    let candidate = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let Value::Array(items) = serde_json::from_str::<Value>(candidate).ok()? else {
        return None;
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
    )
}

/// Linear scan for balanced `{...}` spans, string- and escape-aware.
fn scan_objects(raw: &str) -> Vec<Map<String, Value>> {
    let bytes = raw.as_bytes();
    let mut objects = Vec::new();
    let mut cursor = match raw.find(['[', '{']) {
        Some(start) => start,
        None => return objects,
    };

    while let Some(offset) = raw[cursor..].find('{') {
        let open = cursor + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut close = None;

        for (i, &b) in bytes.iter().enumerate().skip(open) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let Some(close) = close else {
            debug!(offset = open, "Discarding truncated object");
            break;
        };
        match serde_json::from_str::<Value>(&raw[open..=close]) {
            Ok(Value::Object(map)) => objects.push(map),
            _ => debug!(offset = open, "Discarding malformed object"),
        }
        cursor = close + 1;
    }
    objects
}

/// Fallbacks applied while normalising idea records.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct IdeaDefaults {
    /// Range a missing or invalid word count is drawn from
    word_range: RangeInclusive<u32>,
    /// Genre used when a record names none
    unknown_genre: String,
}

impl IdeaDefaults {
    /// Create defaults.
    pub fn new(word_range: RangeInclusive<u32>, unknown_genre: impl Into<String>) -> Self {
        Self {
            word_range,
            unknown_genre: unknown_genre.into(),
        }
    }
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    map.iter()
        .find(|(k, _)| keys.contains(&k.to_lowercase().as_str()))
        .and_then(|(_, v)| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn count_field(map: &Map<String, Value>) -> Option<u32> {
    let value = map
        .iter()
        .find(|(k, _)| WORD_COUNT_KEYS.contains(&k.to_lowercase().as_str()))
        .map(|(_, v)| v)?;
    let count = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(count).ok().filter(|c| *c > 0)
}

/// Turn one salvaged object into an idea, or drop it.
///
/// Field names are matched case-insensitively against their English and German
/// aliases. A missing or non-positive word count is drawn from the default
/// range; a missing genre becomes the unknown-genre label. Records without a
/// title, premise or setting are rejected.
pub fn normalize_idea(
    map: &Map<String, Value>,
    defaults: &IdeaDefaults,
    rng: &mut impl Rng,
) -> Option<StoryIdea> {
    let title = text_field(map, TITLE_KEYS)?;
    let premise = text_field(map, PREMISE_KEYS)?;
    let setting = text_field(map, SETTING_KEYS)?;
    let genre = text_field(map, GENRE_KEYS).unwrap_or_else(|| defaults.unknown_genre.clone());
    let word_count = count_field(map).unwrap_or_else(|| {
        let range = defaults.word_range.clone();
        if range.is_empty() {
            *range.start()
        } else {
            rng.gen_range(range)
        }
    });
    Some(StoryIdea::new(title, premise, setting, genre, word_count))
}

/// Salvage and normalise every usable idea in `raw`.
pub fn salvage_ideas(raw: &str, defaults: &IdeaDefaults) -> Vec<StoryIdea> {
    let mut rng = rand::thread_rng();
    let objects = salvage_objects(raw);
    let total = objects.len();
    let ideas: Vec<StoryIdea> = objects
        .iter()
        .filter_map(|map| normalize_idea(map, defaults, &mut rng))
        .collect();
    if ideas.len() < total {
        warn!(
            dropped = total - ideas.len(),
            kept = ideas.len(),
            "Dropped incomplete idea records"
        );
    }
    ideas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> IdeaDefaults {
        IdeaDefaults::new(5_000..=10_000, "[Unknown]")
    }

    #[test]
    fn truncated_tail_object_is_discarded() {
        let raw = r#"Sure! Here are the records: [{"a":1},{"b":2},{"c": and that's all."#;
        let objects = salvage_objects(raw);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["a"], 1);
        assert_eq!(objects[1]["b"], 2);
    }

    #[test]
    fn complete_array_in_prose_takes_fast_path() {
        let raw = "Intro text.\n```json\n[{\"a\":1},{\"b\":2}]\n```\nThanks.";
        assert_eq!(salvage_objects(raw).len(), 2);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_scanner() {
        let raw = r#"[{"t":"a } tricky \" { string"},{"u":2},{"v":"#;
        let objects = salvage_objects(raw);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["t"], "a } tricky \" { string");
    }

    #[test]
    fn nothing_salvageable_is_empty_not_error() {
        assert!(salvage_objects("I cannot help with that.").is_empty());
        assert!(salvage_objects("[{\"unterminated\": \"").is_empty());
    }

    #[test]
    fn german_aliases_are_normalised() {
        let raw = r#"[{"titel":"Die Fähre","prompt":"Ein Fährmann schweigt.","setting":"Elbe, 1923","genre":"Krimi","wortanzahl":"7200"}]"#;
        let ideas = salvage_ideas(raw, &defaults());
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].title(), "Die Fähre");
        assert_eq!(ideas[0].premise(), "Ein Fährmann schweigt.");
        assert_eq!(*ideas[0].word_count(), 7200);
    }

    #[test]
    fn missing_fields_are_defaulted_or_dropped() {
        let raw = r#"[
            {"title":"Salt","premise":"A map drawn in salt.","setting":"Drowned city","word_count":-3},
            {"title":"","premise":"No title.","setting":"Nowhere"},
            {"title":"No setting","premise":"Missing a place."}
        ]"#;
        let ideas = salvage_ideas(raw, &defaults());
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].genre(), "[Unknown]");
        assert!((5_000..=10_000).contains(ideas[0].word_count()));
    }
}
