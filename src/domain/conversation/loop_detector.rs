//! Conversational loop detection.
//!
//! Scans a recent message window for vague filler phrases and coarse theme
//! repetition. A detected loop asks the turn executor to inject an
//! intervention instruction; the 30-second cooldown between interventions
//! is enforced by the caller, not here.

use std::collections::{BTreeSet, HashMap};

use crate::domain::conversation::Message;

/// Vague filler phrases that signal the conversation is circling.
///
/// Every entry has a substitution in the response filter, so a detected
/// phrase can always be rewritten out of a generated response.
pub(crate) const FILLER_PHRASES: &[&str] = &[
    "draining",
    "exhausting",
    "walking on eggshells",
    "overwhelming",
    "so tired of it",
    "can't take it anymore",
    "at my wit's end",
];

/// Coarse conversational themes, bucketed by keyword membership.
const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "family conflict",
        &[
            "family", "mother", "father", "mom", "dad", "sister", "brother", "parents", "in-laws",
        ],
    ),
    (
        "exhaustion",
        &["tired", "exhausted", "drained", "sleep", "no energy", "worn out"],
    ),
    (
        "arguments",
        &["argue", "argument", "fight", "fighting", "yelling", "shouting", "screaming"],
    ),
];

/// Counts filler-phrase occurrences in one text, case-insensitively.
pub(crate) fn filler_occurrences(text: &str) -> usize {
    let lower = text.to_lowercase();
    FILLER_PHRASES
        .iter()
        .map(|phrase| lower.matches(phrase).count())
        .sum()
}

/// Result of scanning a message window for loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    /// Filler phrases seen at least once, with occurrence counts.
    pub repetitions: HashMap<String, usize>,
    /// Distinct themes detected in the window.
    pub themes: BTreeSet<String>,
    /// Any single filler phrase repeated past the threshold.
    pub has_loop: bool,
    /// The window keeps returning to the same few themes.
    pub theme_repetition: bool,
    /// The next turn should carry an intervention instruction.
    pub needs_intervention: bool,
}

impl LoopReport {
    /// Returns the repeated phrases (count past threshold), most repeated first.
    pub fn repeated_phrases(&self, threshold: usize) -> Vec<(&str, usize)> {
        let mut phrases: Vec<(&str, usize)> = self
            .repetitions
            .iter()
            .filter(|(_, &count)| count >= threshold)
            .map(|(phrase, &count)| (phrase.as_str(), count))
            .collect();
        phrases.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        phrases
    }
}

/// Detects conversational loops over a recent message window.
#[derive(Debug, Clone)]
pub struct LoopDetector {
    /// How many trailing messages to scan.
    window: usize,
    /// Occurrences of one phrase that count as a loop.
    phrase_repeat_threshold: usize,
    /// Minimum window size before theme repetition can trigger.
    theme_window_min: usize,
    /// Distinct-theme ceiling for theme repetition.
    theme_ceiling: usize,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self {
            window: 6,
            phrase_repeat_threshold: 2,
            theme_window_min: 4,
            theme_ceiling: 2,
        }
    }
}

impl LoopDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the scan window size.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Overrides the per-phrase repetition threshold.
    pub fn with_phrase_repeat_threshold(mut self, threshold: usize) -> Self {
        self.phrase_repeat_threshold = threshold;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn phrase_repeat_threshold(&self) -> usize {
        self.phrase_repeat_threshold
    }

    /// Scans the trailing window of `messages` for loops.
    ///
    /// The caller passes the full transcript slice; only the last
    /// `window` entries are considered.
    pub fn analyze(&self, messages: &[Message]) -> LoopReport {
        let start = messages.len().saturating_sub(self.window);
        let window = &messages[start..];

        let mut repetitions: HashMap<String, usize> = HashMap::new();
        let mut themes: BTreeSet<String> = BTreeSet::new();

        for message in window {
            let lower = message.text().to_lowercase();

            for phrase in FILLER_PHRASES {
                let count = lower.matches(phrase).count();
                if count > 0 {
                    *repetitions.entry((*phrase).to_string()).or_insert(0) += count;
                }
            }

            for (theme, keywords) in THEME_KEYWORDS {
                if keywords.iter().any(|kw| lower.contains(kw)) {
                    themes.insert((*theme).to_string());
                }
            }
        }

        let has_loop = repetitions
            .values()
            .any(|&count| count >= self.phrase_repeat_threshold);

        // A window with no thematic content at all is not repetition.
        let theme_repetition = !themes.is_empty()
            && themes.len() <= self.theme_ceiling
            && window.len() >= self.theme_window_min;

        let needs_intervention = has_loop || theme_repetition;

        LoopReport {
            repetitions,
            themes,
            has_loop,
            theme_repetition,
            needs_intervention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Speaker;

    fn patient(text: &str) -> Message {
        Message::sent(Speaker::Patient, text).unwrap()
    }

    fn therapist(text: &str) -> Message {
        Message::sent(Speaker::Therapist, text).unwrap()
    }

    mod phrase_loops {
        use super::*;

        #[test]
        fn single_occurrence_is_not_a_loop() {
            let messages = vec![patient("It's been draining lately.")];
            let report = LoopDetector::new().analyze(&messages);

            assert_eq!(report.repetitions.get("draining"), Some(&1));
            assert!(!report.has_loop);
        }

        #[test]
        fn repeated_phrase_across_messages_is_a_loop() {
            let messages = vec![
                patient("Work has been so draining."),
                therapist("What makes it draining for you?"),
            ];
            let report = LoopDetector::new().analyze(&messages);

            assert_eq!(report.repetitions.get("draining"), Some(&2));
            assert!(report.has_loop);
            assert!(report.needs_intervention);
        }

        #[test]
        fn repeated_phrase_within_one_message_counts_each_occurrence() {
            let messages = vec![patient(
                "It's exhausting, truly exhausting, every single day.",
            )];
            let report = LoopDetector::new().analyze(&messages);

            assert_eq!(report.repetitions.get("exhausting"), Some(&2));
            assert!(report.has_loop);
        }

        #[test]
        fn detection_is_case_insensitive() {
            let messages = vec![
                patient("I'm Walking On Eggshells at home."),
                patient("Still walking on eggshells."),
            ];
            let report = LoopDetector::new().analyze(&messages);

            assert_eq!(report.repetitions.get("walking on eggshells"), Some(&2));
            assert!(report.has_loop);
        }

        #[test]
        fn eggshells_repeated_three_times_tallies_three() {
            let text = "I've been feeling exhausted walking on eggshells lately";
            let messages = vec![patient(text), patient(text), patient(text)];
            let report = LoopDetector::new().analyze(&messages);

            assert!(report.has_loop);
            assert_eq!(report.repetitions.get("walking on eggshells"), Some(&3));
        }

        #[test]
        fn clean_conversation_has_no_loop() {
            let messages = vec![
                patient("Last Tuesday my sister visited and we cooked together."),
                therapist("What did you cook?"),
            ];
            let report = LoopDetector::new().analyze(&messages);

            assert!(report.repetitions.is_empty());
            assert!(!report.has_loop);
        }
    }

    mod theme_repetition {
        use super::*;

        #[test]
        fn few_themes_over_long_window_triggers() {
            let messages = vec![
                patient("My mother keeps calling."),
                patient("Then my father joined in."),
                patient("The whole family was there."),
                patient("My parents will not let it go."),
            ];
            let report = LoopDetector::new().analyze(&messages);

            assert!(report.themes.contains("family conflict"));
            assert_eq!(report.themes.len(), 1);
            assert!(report.theme_repetition);
            assert!(report.needs_intervention);
        }

        #[test]
        fn short_window_does_not_trigger_theme_repetition() {
            let messages = vec![
                patient("My mother keeps calling."),
                patient("My father too."),
            ];
            let report = LoopDetector::new().analyze(&messages);

            assert!(!report.theme_repetition);
        }

        #[test]
        fn themeless_window_does_not_trigger() {
            let messages = vec![
                patient("The weather was nice."),
                patient("I walked to the shop."),
                patient("Bought some bread."),
                patient("Came back home."),
            ];
            let report = LoopDetector::new().analyze(&messages);

            assert!(report.themes.is_empty());
            assert!(!report.theme_repetition);
            assert!(!report.needs_intervention);
        }

        #[test]
        fn varied_themes_do_not_trigger() {
            let messages = vec![
                patient("My mother keeps calling."),
                patient("I'm so tired, I barely sleep."),
                patient("We had a huge fight about it."),
                patient("Then another argument yesterday."),
            ];
            let report = LoopDetector::new().analyze(&messages);

            assert_eq!(report.themes.len(), 3);
            assert!(!report.theme_repetition);
        }
    }

    mod window_handling {
        use super::*;

        #[test]
        fn only_trailing_window_is_scanned() {
            let mut messages: Vec<Message> = (0..6)
                .map(|i| patient(&format!("Neutral filler message {}", i)))
                .collect();
            messages.insert(0, patient("So draining. Everything is draining."));

            let report = LoopDetector::new().analyze(&messages);

            assert!(report.repetitions.is_empty());
            assert!(!report.has_loop);
        }

        #[test]
        fn repeated_phrases_sorted_by_count() {
            let messages = vec![
                patient("Draining, draining, draining."),
                patient("It's exhausting and exhausting."),
            ];
            let report = LoopDetector::new().analyze(&messages);
            let repeated = report.repeated_phrases(2);

            assert_eq!(repeated[0].0, "draining");
            assert_eq!(repeated[0].1, 3);
            assert_eq!(repeated[1].0, "exhausting");
        }
    }

    #[test]
    fn filler_occurrences_counts_across_vocabulary() {
        assert_eq!(
            filler_occurrences("It's draining and exhausting, draining really"),
            3
        );
        assert_eq!(filler_occurrences("A calm, specific story"), 0);
    }
}
