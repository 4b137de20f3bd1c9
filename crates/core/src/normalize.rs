//! Text normalization applied before similarity scoring.
//!
//! Back-translations and slide text often differ only in case, Unicode
//! composition or spacing; none of those should count against a row.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of whitespace (including line breaks) into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a string for similarity comparison.
///
/// Applies NFC composition, trims, lowercases and collapses whitespace runs.
pub fn normalize_for_similarity(text: &str) -> String {
    let composed: String = text.nfc().collect();
    let lowered = composed.trim().to_lowercase();
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(&lowered, " ")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_and_lowercase() {
        assert_eq!(normalize_for_similarity("  Hello World \n"), "hello world");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(normalize_for_similarity("a \t b\n\nc"), "a b c");
    }

    #[test]
    fn test_nfc_composition() {
        // "é" as e + combining acute accent
        let decomposed = "Caf\u{0065}\u{0301}";
        assert_eq!(normalize_for_similarity(decomposed), "caf\u{00e9}");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize_for_similarity("   "), "");
        assert_eq!(normalize_for_similarity(""), "");
    }
}
