//! Slicing a free-text outline into per-segment excerpts.

use regex::Regex;
use tracing::debug;

/// Section names that end the last segment's excerpt.
const CLOSING_SECTIONS: &str = "epilog|epilogue|fazit|gesamtfazit|conclusion|summary|final thoughts";

/// The part of `outline` describing segment `number`, if one can be found.
///
/// The excerpt starts at a heading line such as `## Chapter 3: Snow` or
/// `**Kapitel 3**`, keeps the heading's own title, and ends before the heading
/// of the next segment or a closing section (epilogue, conclusion, summary).
/// When no such heading exists, a bare `3.` or `3:` line start is tried
/// instead. Returns `None` when nothing usable is found; callers substitute a
/// placeholder.
///
/// # Examples
///
/// ```
/// use scriptorium_narrative::extract_segment_slice;
///
/// let outline = "Characters...\n\n## Chapter 1: Departure\n- The train leaves.\n\n## Chapter 2\n- It stops.\n\n## Epilogue\n- Spring.";
/// assert_eq!(
///     extract_segment_slice(outline, "Chapter", 1).as_deref(),
///     Some("Departure\n- The train leaves.")
/// );
/// assert_eq!(extract_segment_slice(outline, "Chapter", 2).as_deref(), Some("- It stops."));
/// assert_eq!(extract_segment_slice(outline, "Chapter", 3), None);
/// ```
pub fn extract_segment_slice(outline: &str, segment_word: &str, number: usize) -> Option<String> {
    let word = regex::escape(segment_word);
    let start = Regex::new(&format!(r"(?im)^[#*\s]*{}\s+{}\b([^\n]*)$", word, number)).ok()?;
    let fallback = Regex::new(&format!(r"(?m)^[#*\s]*{}[.:][ \t]*", number)).ok()?;
    let end = Regex::new(&format!(
        r"(?im)^[#*\s]*(?:{}\s+{}\b|\d+[.:]|(?:{})\b)",
        word,
        number + 1,
        CLOSING_SECTIONS
    ))
    .ok()?;

    let (body_start, title, via_fallback) = match start.captures(outline) {
        Some(caps) => {
            let heading = caps.get(0)?;
            let title = caps
                .get(1)
                .map(|m| clean_heading_title(m.as_str()))
                .unwrap_or_default();
            (heading.end(), title, false)
        }
        None => (fallback.find(outline)?.end(), String::new(), true),
    };
    let rest = &outline[body_start..];

    let stop = end
        .find_iter(rest)
        .find(|m| via_fallback || !is_bare_number(m.as_str()))
        .map(|m| m.start())
        .unwrap_or(rest.len());

    let body = rest[..stop].trim();
    let slice = match (title.is_empty(), body.is_empty()) {
        (_, true) => String::new(),
        (true, false) => body.to_string(),
        (false, false) => format!("{}\n{}", title, body),
    };
    debug!(number, chars = slice.len(), via_fallback, "Extracted outline slice");
    (!slice.is_empty()).then_some(slice)
}

fn clean_heading_title(raw: &str) -> String {
    raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | '.' | '-' | '–' | '*' | '#')
    })
    .to_string()
}

fn is_bare_number(matched: &str) -> bool {
    matched
        .trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace())
        .starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTLINE: &str = "\
**Main characters:** Vera, a conductor.

### Kapitel 1: Abfahrt
1. Der Zug verlässt Moskau.
2. Vera hört eine Stimme.

**Kapitel 2 - Schnee**
- Der Zug bleibt stehen.

## Gesamtfazit
Alles endet gut.";

    #[test]
    fn numbered_plot_points_stay_inside_the_slice() {
        let slice = extract_segment_slice(OUTLINE, "Kapitel", 1).unwrap();
        assert_eq!(
            slice,
            "Abfahrt\n1. Der Zug verlässt Moskau.\n2. Vera hört eine Stimme."
        );
    }

    #[test]
    fn last_segment_stops_at_closing_section() {
        assert_eq!(
            extract_segment_slice(OUTLINE, "kapitel", 2).as_deref(),
            Some("Schnee\n- Der Zug bleibt stehen.")
        );
    }

    #[test]
    fn bare_numbers_are_a_fallback() {
        let outline = "Plan:\n1. The departure at dawn.\n2. The storm.\n3: The arrival.";
        assert_eq!(
            extract_segment_slice(outline, "Chapter", 2).as_deref(),
            Some("The storm.")
        );
        assert_eq!(
            extract_segment_slice(outline, "Chapter", 3).as_deref(),
            Some("The arrival.")
        );
    }

    #[test]
    fn heading_without_body_is_none() {
        let outline = "## Chapter 1: Empty\n## Chapter 2\nText.";
        assert_eq!(extract_segment_slice(outline, "Chapter", 1), None);
    }

    #[test]
    fn chapter_ten_is_not_chapter_one() {
        let outline = "## Chapter 10: Late\nLate things.";
        assert_eq!(extract_segment_slice(outline, "Chapter", 1), None);
    }
}
