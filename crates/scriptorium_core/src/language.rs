//! Supported output languages.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// Language a story is written in.
///
/// Parsing accepts codes and names in either language, case-insensitively.
///
/// # Examples
///
/// ```
/// use scriptorium_core::Language;
///
/// assert_eq!("de".parse::<Language>().unwrap(), Language::German);
/// assert_eq!("Englisch".parse::<Language>().unwrap(), Language::English);
/// assert!("klingon".parse::<Language>().is_err());
/// assert_eq!(Language::German.code(), "de");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Default,
    EnumIter,
    EnumString,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Language {
    /// English
    #[strum(serialize = "en", serialize = "english", serialize = "englisch")]
    #[display("English")]
    English,
    /// German
    #[default]
    #[strum(serialize = "de", serialize = "german", serialize = "deutsch")]
    #[display("Deutsch")]
    German,
}

impl Language {
    /// Two-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
        }
    }

    /// Every accepted spelling, for help and error messages.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Language::English => &["en", "english", "englisch"],
            Language::German => &["de", "german", "deutsch"],
        }
    }

    /// Comma-separated list of supported codes.
    pub fn supported() -> String {
        Language::iter()
            .map(|l| l.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("DEUTSCH".parse::<Language>().ok(), Some(Language::German));
        assert_eq!("En".parse::<Language>().ok(), Some(Language::English));
    }

    #[test]
    fn every_alias_parses_back() {
        for language in Language::iter() {
            for alias in language.aliases() {
                assert_eq!(alias.parse::<Language>().ok(), Some(language));
            }
        }
    }

    #[test]
    fn supported_lists_codes() {
        assert_eq!(Language::supported(), "en, de");
    }
}
