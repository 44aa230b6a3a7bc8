//! Heading normalisation for generated units.
//!
//! Models decorate their output with titles and headings of varying shape.
//! These helpers strip whatever leading headings a unit came with and put
//! back exactly one canonical heading, so formatting twice changes nothing.

use crate::{LabelKey, LanguagePack};
use regex::Regex;

/// Normalise a single-call story to `# {title}` followed by the body.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::format_story;
///
/// let text = "# A Different Title\n\nThe train left at dawn.";
/// assert_eq!(format_story(text, "Night Train"), "# Night Train\n\nThe train left at dawn.");
/// ```
pub fn format_story(text: &str, title: &str) -> String {
    let body = strip_leading(text, |line| is_title_heading(line));
    format!("# {}\n\n{}", title.trim(), body)
}

/// Normalise one segment to `## {word} {n}[: subtitle]`, preceded by the story
/// title heading for segment 1.
///
/// A subtitle the model supplied on its own segment heading is kept.
pub fn format_segment(text: &str, number: usize, title: &str, segment_word: &str) -> String {
    let pattern = format!(
        r"(?i)^[#*\s]*{}\s+{}\b\s*[:.\-–]?\s*(.*)$",
        regex::escape(segment_word),
        number
    );
    let heading = Regex::new(&pattern).ok();
    let base = format!("{} {}", segment_word, number);

    let mut subtitle: Option<String> = None;
    let body = strip_leading(text, |line| {
        if let Some(caps) = heading.as_ref().and_then(|re| re.captures(line))
            && (is_heading(line) || line.chars().count() < 80)
        {
            if subtitle.is_none() {
                let candidate = caps
                    .get(1)
                    .map(|m| m.as_str().trim().trim_matches('*').trim())
                    .unwrap_or_default();
                if !candidate.is_empty() && !candidate.eq_ignore_ascii_case(&base) {
                    subtitle = Some(candidate.to_string());
                }
            }
            return true;
        }
        is_heading(line)
    });

    let mut out = String::new();
    if number == 1 {
        out.push_str(&format!("# {}\n\n", title.trim()));
    }
    out.push_str("## ");
    out.push_str(&base);
    if let Some(sub) = subtitle {
        out.push_str(": ");
        out.push_str(&sub);
    }
    if !body.is_empty() {
        out.push_str("\n\n");
        out.push_str(&body);
    }
    out
}

/// Normalise the epilogue to `## {epilogue_word}[: subtitle]` followed by the body.
///
/// A model-supplied subtitle is kept unless it merely repeats the story title.
pub fn format_epilogue(text: &str, title: &str, epilogue_word: &str) -> String {
    let pattern = format!(
        r"(?i)^[#*\s]*{}\b\s*[:.\-–]?\s*(.*)$",
        regex::escape(epilogue_word)
    );
    let heading = Regex::new(&pattern).ok();

    let mut subtitle: Option<String> = None;
    let body = strip_leading(text, |line| {
        if !is_heading(line) && !line.starts_with("**") {
            return false;
        }
        if subtitle.is_none()
            && let Some(caps) = heading.as_ref().and_then(|re| re.captures(line))
        {
            let candidate = caps
                .get(1)
                .map(|m| m.as_str().trim().trim_matches('*').trim())
                .unwrap_or_default();
            if !candidate.is_empty() && !candidate.eq_ignore_ascii_case(title.trim()) {
                subtitle = Some(candidate.to_string());
            }
        }
        true
    });

    let mut out = format!("## {}", epilogue_word);
    if let Some(sub) = subtitle {
        out.push_str(": ");
        out.push_str(&sub);
    }
    if !body.is_empty() {
        out.push_str("\n\n");
        out.push_str(&body);
    }
    out
}

/// Placeholder text for a segment that produced nothing usable.
pub fn error_segment(number: usize, title: &str, pack: &LanguagePack) -> String {
    let section = format!(
        "## {} {}: {}\n\n{}",
        pack.label(LabelKey::SegmentWord),
        number,
        pack.label(LabelKey::ErrorSegmentTitle),
        pack.label(LabelKey::ErrorSegmentBody)
    );
    if number == 1 {
        format!("# {}\n\n{}", title.trim(), section)
    } else {
        section
    }
}

fn is_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_title_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("# ") || trimmed == "#"
}

/// Drop leading blank lines and lines `drop` accepts; return the trimmed rest.
fn strip_leading(text: &str, mut drop: impl FnMut(&str) -> bool) -> String {
    let mut rest = text.trim();
    while !rest.is_empty() {
        let (line, tail) = rest.split_once('\n').unwrap_or((rest, ""));
        if line.trim().is_empty() || drop(line.trim()) {
            rest = tail.trim_start();
        } else {
            break;
        }
    }
    rest.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::Language;

    #[test]
    fn first_segment_gets_title_and_keeps_subtitle() {
        let raw = "# Wrong Title\n\n## Chapter 1: The Platform\n\nSnow fell on the rails.";
        let formatted = format_segment(raw, 1, "Night Train", "Chapter");
        assert_eq!(
            formatted,
            "# Night Train\n\n## Chapter 1: The Platform\n\nSnow fell on the rails."
        );
        assert_eq!(format_segment(&formatted, 1, "Night Train", "Chapter"), formatted);
    }

    #[test]
    fn later_segment_drops_foreign_headings() {
        let raw = "## Part Two\n**Chapter 3.** \n\nThe conductor woke.";
        assert_eq!(
            format_segment(raw, 3, "Night Train", "Chapter"),
            "## Chapter 3\n\nThe conductor woke."
        );
    }

    #[test]
    fn prose_starting_with_segment_word_is_kept() {
        let raw = "Chapter 2 of his life began, he thought, the moment the whistle blew over the frozen plain.";
        let formatted = format_segment(raw, 2, "T", "Chapter");
        assert!(formatted.ends_with(raw));
    }

    #[test]
    fn german_heading_matches_case_insensitively() {
        let raw = "KAPITEL 4 - Die Brücke\n\nEs regnete.";
        assert_eq!(
            format_segment(raw, 4, "Titel", "Kapitel"),
            "## Kapitel 4: Die Brücke\n\nEs regnete."
        );
    }

    #[test]
    fn epilogue_heading_is_canonical() {
        let formatted = format_epilogue("### Epilogue: After\n\nSpring came.", "Night Train", "Epilogue");
        assert_eq!(formatted, "## Epilogue: After\n\nSpring came.");
        assert_eq!(format_epilogue(&formatted, "Night Train", "Epilogue"), formatted);

        let repeated = format_epilogue("# Night Train\n## Epilogue: Night Train\nEnd.", "Night Train", "Epilogue");
        assert_eq!(repeated, "## Epilogue\n\nEnd.");
    }

    #[test]
    fn error_segment_for_first_position_carries_title() {
        let pack = LanguagePack::bundled(Language::English).unwrap();
        let text = error_segment(1, "Night Train", &pack);
        assert!(text.starts_with("# Night Train\n\n## Chapter 1: [Generation Error]"));
        assert!(error_segment(2, "Night Train", &pack).starts_with("## Chapter 2"));
    }

    #[test]
    fn story_title_replaced_but_chapters_kept() {
        let text = "# Old\n## Scene\nBody.";
        assert_eq!(format_story(text, "New"), "# New\n\n## Scene\nBody.");
    }
}
