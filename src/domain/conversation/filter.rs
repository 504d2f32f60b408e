//! Banned-phrase filtering for generated responses.
//!
//! Runs over the complete response during finalization, never on partial
//! streamed text. Substitutions are word-boundary-safe and case-insensitive,
//! and no replacement contains a banned phrase, so the filter is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Exact phrase substitutions, applied first.
///
/// Covers the loop detector's full filler vocabulary plus the worst
/// therapist cliches.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("walking on eggshells", "navigating carefully"),
    ("draining", "wearing me down"),
    ("exhausting", "leaving me spent"),
    ("overwhelming", "a lot to hold"),
    ("so tired of it", "worn thin by it"),
    ("can't take it anymore", "past what I can carry"),
    ("at my wit's end", "out of answers"),
    ("i hear you", "i'm with you"),
];

/// Looser patterns for partial variants, applied after the exact table.
const LOOSE_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)\bit sounds\b", "help me understand"),
    (r"(?i)\bthat sounds\b", "that seems"),
];

static EXACT_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    SUBSTITUTIONS
        .iter()
        .map(|(phrase, replacement)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(phrase));
            // The vocabulary is static, so the pattern is known-valid.
            (Regex::new(&pattern).unwrap(), *replacement)
        })
        .collect()
});

static LOOSE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    LOOSE_PATTERNS
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), *replacement))
        .collect()
});

/// Applies the banned-phrase substitution table to finalized responses.
#[derive(Debug, Clone, Default)]
pub struct ResponseFilter;

impl ResponseFilter {
    pub fn new() -> Self {
        Self
    }

    /// Rewrites every banned phrase in `text`.
    ///
    /// Exact table first, then the looser partial variants.
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, replacement) in EXACT_RULES.iter() {
            result = pattern.replace_all(&result, *replacement).into_owned();
        }
        for (pattern, replacement) in LOOSE_RULES.iter() {
            result = pattern.replace_all(&result, *replacement).into_owned();
        }
        result
    }

    /// Returns true if `text` still contains a banned phrase.
    pub fn contains_banned(&self, text: &str) -> bool {
        EXACT_RULES.iter().any(|(pattern, _)| pattern.is_match(text))
            || LOOSE_RULES.iter().any(|(pattern, _)| pattern.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::loop_detector::FILLER_PHRASES;
    use proptest::prelude::*;

    #[test]
    fn replaces_eggshells_with_navigating_carefully() {
        let filter = ResponseFilter::new();
        let out = filter.apply("I feel like I'm walking on eggshells at home.");
        assert!(!out.contains("walking on eggshells"));
        assert!(out.contains("navigating carefully"));
    }

    #[test]
    fn replacement_is_case_insensitive() {
        let filter = ResponseFilter::new();
        let out = filter.apply("Honestly it is EXHAUSTING.");
        assert!(!out.to_lowercase().contains("exhausting"));
        assert!(out.contains("leaving me spent"));
    }

    #[test]
    fn word_boundaries_protect_larger_words() {
        let filter = ResponseFilter::new();
        // "drainingly" is not the banned word "draining".
        let out = filter.apply("The pipe was drainingly slow.");
        assert_eq!(out, "The pipe was drainingly slow.");
    }

    #[test]
    fn loose_variant_rewrites_it_sounds() {
        let filter = ResponseFilter::new();
        let out = filter.apply("It sounds like things got difficult.");
        assert!(out.to_lowercase().contains("help me understand"));
        assert!(!out.to_lowercase().contains("it sounds"));
    }

    #[test]
    fn untouched_text_passes_through() {
        let filter = ResponseFilter::new();
        let text = "Tell me about the morning it happened.";
        assert_eq!(filter.apply(text), text);
        assert!(!filter.contains_banned(text));
    }

    #[test]
    fn every_filler_phrase_has_a_substitution() {
        let filter = ResponseFilter::new();
        for phrase in FILLER_PHRASES {
            let out = filter.apply(&format!("They said it was {} today.", phrase));
            assert!(
                !out.to_lowercase().contains(phrase),
                "'{}' survived filtering: {}",
                phrase,
                out
            );
        }
    }

    #[test]
    fn no_replacement_reintroduces_a_banned_phrase() {
        let filter = ResponseFilter::new();
        for (_, replacement) in super::SUBSTITUTIONS {
            assert!(
                !filter.contains_banned(replacement),
                "replacement '{}' is itself banned",
                replacement
            );
        }
        for (_, replacement) in super::LOOSE_PATTERNS {
            assert!(!filter.contains_banned(replacement));
        }
    }

    #[test]
    fn applying_twice_equals_applying_once() {
        let filter = ResponseFilter::new();
        let text = "It sounds draining, like walking on eggshells all week.";
        let once = filter.apply(text);
        let twice = filter.apply(&once);
        assert_eq!(once, twice);
    }

    proptest! {
        /// Idempotence holds for arbitrary ascii input.
        #[test]
        fn filter_is_idempotent(text in "[ -~]{0,200}") {
            let filter = ResponseFilter::new();
            let once = filter.apply(&text);
            let twice = filter.apply(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
