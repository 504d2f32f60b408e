//! Natural-completion detection.
//!
//! Decides whether the simulated session has reached a satisfying end, from
//! explicit closing phrases and resolution/hope keywords in the patient's
//! recent messages. Rules are evaluated in order; the first match wins.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Message, SessionPhase, Speaker};

/// Explicit closing phrases in patient text.
const COMPLETION_SIGNALS: &[&str] = &[
    "i feel better",
    "thank you for listening",
    "this really helped",
    "i think i understand now",
    "i feel lighter",
    "i know what to do now",
];

/// Keywords that indicate the story has moved toward resolution.
const RESOLUTION_KEYWORDS: &[&str] = &[
    "hope",
    "future",
    "next week",
    "strength",
    "better",
    "forward",
    "progress",
    "plan",
    "grateful",
];

/// Keywords that indicate hope specifically.
///
/// Kept disjoint from the plain-substring "hope" so one word never counts
/// twice within this list.
const HOPE_KEYWORDS: &[&str] = &[
    "hopeful",
    "optimistic",
    "looking forward",
    "brighter",
    "lighter",
    "confident",
];

/// Counts resolution-indicator keyword occurrences in one text.
pub(crate) fn resolution_indicator_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    RESOLUTION_KEYWORDS
        .iter()
        .map(|kw| lower.matches(kw).count())
        .sum()
}

/// Counts hope-indicator keyword occurrences in one text.
pub(crate) fn hope_indicator_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    HOPE_KEYWORDS
        .iter()
        .map(|kw| lower.matches(kw).count())
        .sum()
}

/// Whether the session is complete, and why.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionDecision {
    pub completed: bool,
    /// Empty while the session should continue.
    pub reason: String,
}

impl CompletionDecision {
    /// The session should continue.
    pub fn not_yet() -> Self {
        Self::default()
    }

    /// The session has reached a natural end.
    pub fn completed(reason: impl Into<String>) -> Self {
        Self {
            completed: true,
            reason: reason.into(),
        }
    }
}

/// Detects natural conversation completion.
#[derive(Debug, Clone)]
pub struct CompletionDetector {
    /// No session completes before this many turns.
    min_turns: u32,
    /// How many trailing messages to scan for patient text.
    window: usize,
}

impl Default for CompletionDetector {
    fn default() -> Self {
        Self {
            min_turns: 8,
            window: 4,
        }
    }
}

impl CompletionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the minimum turn count.
    pub fn with_min_turns(mut self, min_turns: u32) -> Self {
        self.min_turns = min_turns;
        self
    }

    /// Evaluates the completion rules against the full message history.
    pub fn detect(
        &self,
        messages: &[Message],
        phase: SessionPhase,
        turn_count: u32,
    ) -> CompletionDecision {
        if turn_count < self.min_turns {
            return CompletionDecision::not_yet();
        }

        let start = messages.len().saturating_sub(self.window);
        let mut has_completion_signal = false;
        let mut resolution_score = 0usize;
        let mut hope_score = 0usize;

        for message in &messages[start..] {
            if message.speaker() != Speaker::Patient {
                continue;
            }
            let lower = message.text().to_lowercase();
            if COMPLETION_SIGNALS.iter().any(|sig| lower.contains(sig)) {
                has_completion_signal = true;
            }
            resolution_score += resolution_indicator_count(message.text());
            hope_score += hope_indicator_count(message.text());
        }

        let has_indicators = resolution_score >= 2 || hope_score >= 2;

        if has_completion_signal && has_indicators {
            return CompletionDecision::completed(
                "natural completion with resolution indicators",
            );
        }

        if phase.is_resolution() && turn_count >= 10 && has_indicators {
            return CompletionDecision::completed(
                "resolution phase completed with hope elements",
            );
        }

        if turn_count >= 12 && (resolution_score >= 3 || hope_score >= 3) {
            return CompletionDecision::completed("extended conversation reached resolution");
        }

        CompletionDecision::not_yet()
    }
}
