//! Response quality scoring.
//!
//! Produces three weighted sub-scores over a recent message window and
//! keeps a rolling history of the 10 most recent snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::conversation::completion::resolution_indicator_count;
use crate::domain::conversation::loop_detector::filler_occurrences;
use crate::domain::conversation::{Message, SessionPhase, Speaker, StoryExtractor};

/// Snapshots kept in the rolling history.
const MAX_HISTORY: usize = 10;

/// Phrases a therapist response should use to elicit concrete stories.
const STORY_PROMPTS: &[&str] = &[
    "tell me about",
    "tell me more",
    "describe",
    "what happened",
    "when did",
    "where were",
    "where did",
    "who was",
    "walk me through",
    "what was that like",
    "give me an example",
];

/// Returns true if `text` contains at least one story-eliciting phrase.
pub fn contains_story_prompt(text: &str) -> bool {
    let lower = text.to_lowercase();
    STORY_PROMPTS.iter().any(|p| lower.contains(p))
}

/// One scoring pass over the session. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySnapshot {
    pub turn: u32,
    pub story_extraction: u32,
    pub loop_breaking: u32,
    pub phase_progression: u32,
    pub overall: u32,
}

/// Scores conversation quality over a trailing message window.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    /// How many trailing messages to score.
    window: usize,
    story_weight: f64,
    loop_weight: f64,
    progression_weight: f64,
    extractor: StoryExtractor,
    history: VecDeque<QualitySnapshot>,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self {
            window: 6,
            story_weight: 0.4,
            loop_weight: 0.4,
            progression_weight: 0.2,
            extractor: StoryExtractor::new(),
            history: VecDeque::new(),
        }
    }
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the sub-score weights.
    ///
    /// Weights are expected to sum to 1.0; callers validate via config.
    pub fn with_weights(mut self, story: f64, loop_breaking: f64, progression: f64) -> Self {
        self.story_weight = story;
        self.loop_weight = loop_breaking;
        self.progression_weight = progression;
        self
    }

    /// Scores the trailing window and appends a snapshot to the history.
    pub fn score(
        &mut self,
        messages: &[Message],
        phase: SessionPhase,
        turn_count: u32,
    ) -> QualitySnapshot {
        let start = messages.len().saturating_sub(self.window);
        let window = &messages[start..];

        let story_extraction = self.story_extraction_score(window);
        let loop_breaking = self.loop_breaking_score(window);
        let phase_progression = self.phase_progression_score(window, phase);

        let overall = (self.story_weight * f64::from(story_extraction)
            + self.loop_weight * f64::from(loop_breaking)
            + self.progression_weight * f64::from(phase_progression))
        .round() as u32;

        let snapshot = QualitySnapshot {
            turn: turn_count,
            story_extraction,
            loop_breaking,
            phase_progression,
            overall,
        };

        self.history.push_back(snapshot);
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }

        snapshot
    }

    /// The rolling snapshot history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &QualitySnapshot> {
        self.history.iter()
    }

    /// The most recent snapshot, if any scoring has run.
    pub fn latest(&self) -> Option<&QualitySnapshot> {
        self.history.back()
    }

    /// Fraction of therapist messages using a story-eliciting phrase, x100.
    fn story_extraction_score(&self, window: &[Message]) -> u32 {
        let therapist: Vec<&Message> = window
            .iter()
            .filter(|m| m.speaker() == Speaker::Therapist)
            .collect();
        if therapist.is_empty() {
            return 0;
        }
        let eliciting = therapist
            .iter()
            .filter(|m| contains_story_prompt(m.text()))
            .count();
        ((eliciting as f64 / therapist.len() as f64) * 100.0).round() as u32
    }

    /// Starts at 100, minus 20 per filler-phrase occurrence in therapist text.
    fn loop_breaking_score(&self, window: &[Message]) -> u32 {
        let occurrences: usize = window
            .iter()
            .filter(|m| m.speaker() == Speaker::Therapist)
            .map(|m| filler_occurrences(m.text()))
            .sum();
        100u32.saturating_sub(20 * occurrences as u32)
    }

    /// Average story richness of patient messages, plus resolution credit.
    fn phase_progression_score(&self, window: &[Message], phase: SessionPhase) -> u32 {
        let patient: Vec<&Message> = window
            .iter()
            .filter(|m| m.speaker() == Speaker::Patient)
            .collect();
        if patient.is_empty() {
            return 0;
        }

        let total: usize = patient
            .iter()
            .map(|m| {
                let elements = self.extractor.extract(m.text());
                (elements.depth() * 25).min(100) + (elements.completeness() * 5).min(50)
            })
            .sum();
        let mut score = total as f64 / patient.len() as f64;

        if phase.is_resolution() {
            let indicators: usize = patient
                .iter()
                .map(|m| resolution_indicator_count(m.text()))
                .sum();
            score += 10.0 * indicators as f64;
        }

        score.clamp(0.0, 100.0).round() as u32
    }
}
