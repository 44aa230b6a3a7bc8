//! Language listing.

use scriptorium::Language;
use strum::IntoEnumIterator;

/// Print every supported language with its aliases.
pub fn list_languages() {
    for language in Language::iter() {
        let marker = if language == Language::default() {
            " (default)"
        } else {
            ""
        };
        println!(
            "{}\t{}{}\t{}",
            language.code(),
            language,
            marker,
            language.aliases().join(", ")
        );
    }
}
