// src/keywords.rs
//! Keyword extraction: free text → canonical keyword set.
//!
//! Tokens are maximal runs of Unicode letters/digits (combining marks stay
//! attached to their base letter), lowercased. Stop words
//! and short tokens (fewer than [`MIN_KEYWORD_CHARS`] characters) are dropped.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// Tokens shorter than this (in chars, not bytes) are never keywords.
pub const MIN_KEYWORD_CHARS: usize = 4;

/// German function words plus the "new" adjectives that show up in most
/// headlines without saying anything about the topic.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "der", "die", "das", "ein", "eine", "und", "oder", "für", "mit", "von", "zu", "im", "am",
    "ist", "sind", "wird", "werden", "kann", "könnte", "neue", "neuer", "neues",
];

fn word_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{M}\p{N}]+").expect("keyword regex"))
}

#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stop_words: HashSet<String>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied())
    }
}

impl KeywordExtractor {
    /// Stop words are case-folded on the way in.
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        word_regex()
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|t| t.chars().count() >= MIN_KEYWORD_CHARS && !self.is_stop_word(t))
            .collect()
    }
}

/// Join a keyword set back into text (space separated, sorted).
pub fn keywords_as_text(keywords: &BTreeSet<String>) -> String {
    keywords
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn drops_stop_words_and_short_tokens() {
        let ex = KeywordExtractor::default();
        let out = ex.extract("Neue Erkenntnisse zum Klimawandel und die Folgen für uns");
        assert_eq!(out, set(&["erkenntnisse", "folgen", "klimawandel"]));
    }

    #[test]
    fn unicode_words_are_case_folded_and_collapsed() {
        let ex = KeywordExtractor::default();
        let out = ex.extract("Künstliche Intelligenz: KÜNSTLICHE Intelligenz, 2025!");
        assert_eq!(out, set(&["2025", "intelligenz", "künstliche"]));
    }

    #[test]
    fn length_is_counted_in_chars() {
        let ex = KeywordExtractor::new(Vec::<String>::new());
        // "größ" is 4 chars but 6 bytes; "über" likewise.
        assert_eq!(ex.extract("größ für über"), set(&["größ", "über"]));
    }

    #[test]
    fn combining_marks_do_not_split_words() {
        let ex = KeywordExtractor::default();
        let out = ex.extract("Mu\u{0308}nchen und Bru\u{0308}cke");
        assert_eq!(out, set(&["bru\u{0308}cke", "mu\u{0308}nchen"]));
    }

    #[test]
    fn empty_text_yields_empty_set() {
        let ex = KeywordExtractor::default();
        assert!(ex.extract("").is_empty());
        assert!(ex.extract(" ... !!! ").is_empty());
    }

    #[test]
    fn custom_stop_words_are_case_insensitive() {
        let ex = KeywordExtractor::new(["Galileo"]);
        assert_eq!(ex.extract("GALILEO testet Raketen"), set(&["raketen", "testet"]));
    }

    #[test]
    fn re_extraction_is_idempotent() {
        let ex = KeywordExtractor::default();
        for s in [
            "Quantencomputer Durchbruch München",
            "Plastik Meer Mikroplastik Strände Nordsee",
            "Schwarze Löcher Einführung Teleskop 2025",
        ] {
            let once = ex.extract(s);
            let twice = ex.extract(&keywords_as_text(&once));
            assert_eq!(once, twice, "input: {s}");
        }
    }
}
