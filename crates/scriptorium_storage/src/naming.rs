//! File naming helpers.

use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use std::sync::LazyLock;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("Valid character class regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Valid whitespace regex"));

const MAX_SAFE_CHARS: usize = 50;

/// Reduce a title to a portable file name stem.
///
/// Drops everything but word characters, whitespace and hyphens, joins words
/// with underscores and keeps at most 50 characters.
///
/// # Examples
///
/// ```
/// use scriptorium_storage::safe_filename;
///
/// assert_eq!(safe_filename("Der Weg nach Süden: Teil 1!"), "Der_Weg_nach_Süden_Teil_1");
/// assert_eq!(safe_filename("  ?!  "), "");
/// ```
pub fn safe_filename(title: &str) -> String {
    let stripped = UNSAFE_CHARS.replace_all(title, "");
    let joined = WHITESPACE.replace_all(stripped.trim(), "_");
    joined.chars().take(MAX_SAFE_CHARS).collect()
}

/// `{prefix}_{safe_title}_{YYYYmmdd_HHMMSS}.txt` for the current local time.
pub fn artifact_name(prefix: &str, title: &str) -> String {
    artifact_name_at(prefix, title, &Local::now())
}

/// [`artifact_name`] for an explicit timestamp.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use scriptorium_storage::artifact_name_at;
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 17, 9, 3, 0).unwrap();
/// assert_eq!(
///     artifact_name_at("outline", "Night Train", &at),
///     "outline_Night_Train_20240517_090300.txt"
/// );
/// ```
pub fn artifact_name_at<Tz: TimeZone>(prefix: &str, title: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stem = safe_filename(title);
    let stem = if stem.is_empty() { "untitled".to_string() } else { stem };
    format!("{}_{}_{}.txt", prefix, stem, at.format("%Y%m%d_%H%M%S"))
}
