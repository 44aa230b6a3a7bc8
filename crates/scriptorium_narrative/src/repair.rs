//! Boundary repair: make generated text end on a complete sentence.
//!
//! Generation can stop anywhere: mid-sentence, inside an open quotation or
//! after a stray fragment. [`BoundaryRepair::repair`] trims such endings back
//! to the last point that reads as finished. Every pass only ever shortens the
//! text, and the passes are re-applied until nothing changes, so repairing an
//! already repaired text is a no-op. A short final paragraph is only dropped
//! after a full paragraph, so a closing run of short dialogue lines survives.

use crate::LanguagePack;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Lowercase word, optional comma, then a dangling capitalised word at the very end.
static DANGLING_CAPITAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Ll}[,;]?\s+\p{Lu}\p{Ll}+\s*$").expect("Valid dangling capital regex")
});

/// Texts shorter than this are left alone.
const MIN_REPAIR_CHARS: usize = 33;
/// A trailing paragraph with fewer words is a fragment.
const MIN_PARAGRAPH_WORDS: usize = 4;
/// A trailing line shorter than this is dropped when no terminator exists.
const MAX_STRAY_LINE_CHARS: usize = 50;

const TERMINATORS: &[&str] = &[
    ". ", "! ", "? ", ".\" ", "!\" ", "?\" ", ".” ", "!” ", "?” ", "\n\n",
];
/// Punctuation a closing straight single quote may follow.
const QUOTE_CLOSING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '…'];
const CLOSING_QUOTES: &[char] = &['"', '\'', '”', '’', '“', '«', '»'];
const FINAL_PUNCTUATION: &[char] = &['.', '!', '?', '"', '\'', '”', '’', '“', '…', '«', '»'];

/// Trims truncated endings from generated text.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::BoundaryRepair;
///
/// let repair = BoundaryRepair::new(["and", "but"]);
/// let text = "The hall was silent, and the door swung open. She stepped into the Room";
/// assert_eq!(repair.repair(text), "The hall was silent, and the door swung open.");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BoundaryRepair {
    conjunctions: Vec<String>,
}

impl BoundaryRepair {
    /// Create a repairer that treats `conjunctions` as words no paragraph ends on.
    pub fn new<I, S>(conjunctions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            conjunctions: conjunctions
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Repairer using the pack's closing conjunctions.
    pub fn for_pack(pack: &LanguagePack) -> Self {
        Self::new(pack.words().closing_conjunctions())
    }

    /// Apply every pass until the text stops changing.
    pub fn repair(&self, text: &str) -> String {
        let mut current = text.trim_end().to_string();
        loop {
            if current.trim().chars().count() < MIN_REPAIR_CHARS {
                return current;
            }
            let mut next = trim_dangling_capital(&current);
            next = trim_unterminated(&next);
            next = trim_open_quote(&next);
            next = self.trim_fragment_paragraph(&next);
            if next == current {
                return current;
            }
            debug!(
                removed_chars = current.len() - next.len(),
                "Trimmed truncated ending"
            );
            current = next;
        }
    }

    fn trim_fragment_paragraph(&self, text: &str) -> String {
        let Some(split) = text.rfind("\n\n") else {
            return text.to_string();
        };
        let (head, last) = (text[..split].trim_end(), text[split..].trim());
        let previous = head.rsplit("\n\n").next().unwrap_or(head).trim();
        if previous.is_empty() || previous.starts_with('#') {
            return text.to_string();
        }

        let words = last.split_whitespace().count();
        let last_word = last
            .split_whitespace()
            .next_back()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .unwrap_or_default();
        let ends_conjunction = self.conjunctions.iter().any(|c| *c == last_word);
        let previous_ok = ends_finished(previous);
        if previous.split_whitespace().count() < MIN_PARAGRAPH_WORDS {
            return text.to_string();
        }

        let fragment = words < MIN_PARAGRAPH_WORDS || ends_conjunction;
        if (fragment && previous_ok) || (words < 2 && !previous_ok) {
            head.to_string()
        } else {
            text.to_string()
        }
    }
}

fn ends_finished(text: &str) -> bool {
    text.trim_end()
        .chars()
        .next_back()
        .is_some_and(|c| FINAL_PUNCTUATION.contains(&c))
}

/// Byte offset just past the last sentence terminator in `text`, if any.
fn last_terminator_cut(text: &str) -> Option<usize> {
    TERMINATORS
        .iter()
        .filter_map(|t| {
            text.rfind(t).map(|i| {
                if *t == "\n\n" {
                    i
                } else {
                    i + t.len() - 1
                }
            })
        })
        .max()
}

fn extend_over_quotes(text: &str, mut cut: usize) -> usize {
    for c in text[cut..].chars() {
        if CLOSING_QUOTES.contains(&c) {
            cut += c.len_utf8();
        } else {
            break;
        }
    }
    cut
}

/// Last `.`, `!` or `?` in `text`, cut just past it and any closing quotes.
fn last_punctuation_cut(text: &str) -> Option<usize> {
    text.rfind(['.', '!', '?'])
        .map(|i| extend_over_quotes(text, i + 1))
}

fn non_empty_prefix(text: &str, cut: usize) -> Option<String> {
    let kept = text[..cut].trim_end();
    (!kept.trim().is_empty()).then(|| kept.to_string())
}

fn trim_dangling_capital(text: &str) -> String {
    let Some(found) = DANGLING_CAPITAL.find(text) else {
        return text.to_string();
    };
    last_terminator_cut(&text[..found.start()])
        .and_then(|cut| non_empty_prefix(text, cut))
        .unwrap_or_else(|| text.to_string())
}

fn trim_unterminated(text: &str) -> String {
    let ends_alphanumeric = text.chars().next_back().is_some_and(char::is_alphanumeric);
    if !ends_alphanumeric {
        return text.to_string();
    }

    let cut = [last_punctuation_cut(text), text.rfind("\n\n")]
        .into_iter()
        .flatten()
        .max();
    if let Some(kept) = cut.and_then(|cut| non_empty_prefix(text, cut)) {
        return kept;
    }

    match text.rfind('\n') {
        Some(i) if text[i + 1..].trim().chars().count() < MAX_STRAY_LINE_CHARS => {
            non_empty_prefix(text, i).unwrap_or_else(|| text.to_string())
        }
        _ => text.to_string(),
    }
}

/// Byte offset, within `paragraph`, of the earliest quotation mark left open.
fn dangling_quote(paragraph: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut stack: Vec<(char, usize)> = Vec::new();

    for (n, &(pos, c)) in chars.iter().enumerate() {
        let top = stack.last().map(|(open, _)| *open);
        match c {
            '"' if top == Some('"') => {
                stack.pop();
            }
            '"' | '„' | '‘' | '»' => stack.push((c, pos)),
            '“' if top == Some('„') => {
                stack.pop();
            }
            '“' => stack.push((c, pos)),
            '”' if top == Some('“') => {
                stack.pop();
            }
            '’' if top == Some('‘') => {
                stack.pop();
            }
            '«' if top == Some('»') => {
                stack.pop();
            }
            '\'' => {
                let previous = n.checked_sub(1).and_then(|i| chars.get(i)).map(|(_, p)| *p);
                let before = previous.is_some_and(char::is_alphanumeric);
                let closes_after =
                    before || previous.is_some_and(|p| QUOTE_CLOSING_PUNCTUATION.contains(&p));
                let after = chars.get(n + 1).is_some_and(|(_, p)| p.is_alphanumeric());
                if !closes_after && after {
                    stack.push((c, pos));
                } else if closes_after && !after && top == Some('\'') {
                    stack.pop();
                }
            }
            _ => {}
        }
    }
    stack.first().map(|(_, pos)| *pos)
}

fn trim_open_quote(text: &str) -> String {
    let start = text.rfind("\n\n").map(|i| i + 2).unwrap_or(0);
    let paragraph = &text[start..];
    let Some(open) = dangling_quote(paragraph) else {
        return text.to_string();
    };

    let before_quote = &paragraph[..open];
    if let Some(kept) = last_punctuation_cut(before_quote)
        .and_then(|cut| non_empty_prefix(text, start + cut))
    {
        return kept;
    }
    non_empty_prefix(text, start).unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> BoundaryRepair {
        BoundaryRepair::new(["and", "but", "or", "because"])
    }

    #[test]
    fn dangling_capitalised_word_is_cut() {
        let text = "It was late and the house was quiet, and the door swung open. She stepped into the Room";
        assert_eq!(
            english().repair(text),
            "It was late and the house was quiet, and the door swung open."
        );
    }

    #[test]
    fn unterminated_paragraph_is_dropped() {
        let text = "The storm had passed by morning. Nobody spoke of it again.\n\nHe said, \"I will never";
        assert_eq!(
            english().repair(text),
            "The storm had passed by morning. Nobody spoke of it again."
        );
    }

    #[test]
    fn open_quote_truncates_to_sentence_before_it() {
        let text = "The first paragraph ends here properly.\n\nHe nodded slowly toward the dark window. \"Come closer. The door is open.";
        assert_eq!(
            english().repair(text),
            "The first paragraph ends here properly.\n\nHe nodded slowly toward the dark window."
        );
    }

    #[test]
    fn open_quote_without_prior_sentence_drops_paragraph() {
        let text = "The first paragraph ends here properly.\n\nShe whispered, \"Come closer. The door is open.";
        assert_eq!(english().repair(text), "The first paragraph ends here properly.");
    }

    #[test]
    fn balanced_quotes_and_apostrophes_are_untouched() {
        let texts = [
            "Sie sagte: „Ich komme morgen wieder.“ Dann ging sie langsam zur Tür hinaus.",
            "Tom's dog didn't bark at the stranger that night, not once.",
            "“We leave at dawn,” she said. ‘Fine,’ he answered, and went to pack his bag.",
        ];
        for text in texts {
            assert_eq!(english().repair(text), text);
        }
    }

    #[test]
    fn short_trailing_paragraph_is_dropped() {
        let text = "The night was long and nobody slept at all.\n\nSilence. Then.";
        assert_eq!(english().repair(text), "The night was long and nobody slept at all.");
    }

    #[test]
    fn conjunction_ending_paragraph_is_dropped() {
        let text = "The night was long and nobody slept at all.\n\nThey waited by the fire for the dawn to come, but.";
        assert_eq!(english().repair(text), "The night was long and nobody slept at all.");
    }

    #[test]
    fn straight_single_quotes_after_punctuation_close() {
        let text = "The night was long and nobody slept at all.\n\nHe nodded once. 'Fine,' he answered, and went to pack his bag.";
        assert_eq!(english().repair(text), text);
        assert_eq!(dangling_quote("'Stop!' she cried, and he did."), None);
        assert_eq!(dangling_quote("He said, 'Wait for me"), Some(9));
    }

    #[test]
    fn closing_run_of_short_dialogue_is_kept() {
        let text = "Vera stood at the window and watched the last lamps slide past the empty platform.\n\n\"Stay,\" he said.\n\n\"No.\"\n\n\"Please.\"\n\nShe left.";
        assert_eq!(english().repair(text), text);
    }

    #[test]
    fn heading_before_short_body_is_kept() {
        let text = "## Chapter 2: The Long Road Home\n\nShort.";
        assert_eq!(english().repair(text), text);
    }

    #[test]
    fn short_text_is_left_alone() {
        assert_eq!(english().repair("and then the"), "and then the");
    }

    #[test]
    fn repair_is_idempotent() {
        let samples = [
            "It was late. She stepped into the Room",
            "First line of the story.\n\nSecond paragraph without an end and",
            "A quiet start to things.\n\n\"Wait,\" she said. \"Don't",
            "No punctuation at all in this rather long line of prose here",
            "Good ending paragraph here.\n\nAnother good one follows it.\n\nOk.",
            "Er öffnete die Tür. „Wer ist da?“, fragte er leise in die Dunkelheit hinein",
            "Vera stood at the window and watched the platform.\n\n\"Stay,\" he said.\n\n\"No.\"\n\n\"Please.\"\n\nShe left.",
            "The night was long and nobody slept.\n\nHe nodded once. 'Fine,' he answered, and went",
        ];
        let repair = english();
        for sample in samples {
            let once = repair.repair(sample);
            assert_eq!(repair.repair(&once), once, "not idempotent for {:?}", sample);
        }
    }
}
