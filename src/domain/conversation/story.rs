//! Story-element extraction.
//!
//! Measures how much concrete narrative a message carries: when and where
//! something happened, who was there, what was sensed, said, felt, and
//! thought. Extraction is recomputed from raw text each time it is needed;
//! nothing here is persisted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::conversation::SessionPhase;

/// The narrative categories a message can touch.
///
/// Ordered by the priority used when asking for missing detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryCategory {
    Time,
    Location,
    People,
    Sensory,
    Dialogue,
    Emotion,
    InnerThought,
}

impl StoryCategory {
    /// Prompt-priority order for deepening questions.
    const PROMPT_PRIORITY: &'static [StoryCategory] = &[
        StoryCategory::Time,
        StoryCategory::Location,
        StoryCategory::People,
        StoryCategory::Sensory,
        StoryCategory::Dialogue,
        StoryCategory::Emotion,
    ];

    /// The missing-detail wording used in deepening questions.
    fn missing_detail(&self) -> &'static str {
        match self {
            StoryCategory::Time => "when this happened",
            StoryCategory::Location => "where you were",
            StoryCategory::People => "who was there with you",
            StoryCategory::Sensory => "what you noticed in your body",
            StoryCategory::Dialogue => "what was actually said",
            StoryCategory::Emotion => "what you were feeling in that moment",
            StoryCategory::InnerThought => "what was going through your mind",
        }
    }
}

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(yesterday|today|tonight|this (morning|afternoon|evening|week)|last (night|week|month|year|time)|on (monday|tuesday|wednesday|thursday|friday|saturday|sunday)|\d+ (days?|weeks?|months?|years?) ago|when i was|at \d{1,2}(:\d{2})?\s?(am|pm)?)\b",
    )
    .unwrap()
});

static LOCATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(at (work|home|school|church)|in the (kitchen|car|office|bedroom|living room|garden|hallway)|at the (house|apartment|office|hospital|park|store|table)|outside|upstairs|downstairs|in my (room|car|apartment))\b",
    )
    .unwrap()
});

static PEOPLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(my (mother|father|mom|dad|sister|brother|husband|wife|partner|boss|friend|coworker|son|daughter|neighbor|therapist|doctor)|mother|father|mom|dad|sister|brother|husband|wife|partner|boss|coworker|neighbor)\b",
    )
    .unwrap()
});

static SENSORY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    // Includes physical-sensation cues; both tally into the sensory category.
    Regex::new(
        r"(?i)\b(i (saw|heard|smelled|watched|noticed)|loud|quiet|bright|dark|cold|warm|heart (was )?(racing|pounding)|hands (were )?(shaking|trembling)|stomach (dropped|turned|was in knots)|chest (felt )?tight|couldn't breathe|short of breath|tense|sweating)\b",
    )
    .unwrap()
});

static DIALOGUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)("[^"]+"|“[^”]+”|\b(he|she|they|i) (said|told me|asked|yelled|shouted|whispered)\b)"#)
        .unwrap()
});

static EMOTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(angry|furious|sad|scared|afraid|terrified|anxious|ashamed|guilty|lonely|frustrated|hurt|happy|relieved|jealous|embarrassed|i felt|felt like)\b",
    )
    .unwrap()
});

static INNER_THOUGHT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(i (thought|wondered|realized|kept thinking|told myself|couldn't stop thinking)|part of me|in my head|in the back of my mind)\b",
    )
    .unwrap()
});

/// Per-message extraction result: match counts for each category.
///
/// `depth` is the number of distinct categories present (0-7);
/// `completeness` is the total match count across categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoryElements {
    pub time: usize,
    pub location: usize,
    pub people: usize,
    pub sensory: usize,
    pub dialogue: usize,
    pub emotion: usize,
    pub inner_thought: usize,
}

impl StoryElements {
    /// Match count for one category.
    pub fn count(&self, category: StoryCategory) -> usize {
        match category {
            StoryCategory::Time => self.time,
            StoryCategory::Location => self.location,
            StoryCategory::People => self.people,
            StoryCategory::Sensory => self.sensory,
            StoryCategory::Dialogue => self.dialogue,
            StoryCategory::Emotion => self.emotion,
            StoryCategory::InnerThought => self.inner_thought,
        }
    }

    /// Number of distinct non-empty categories, 0-7.
    pub fn depth(&self) -> usize {
        [
            self.time,
            self.location,
            self.people,
            self.sensory,
            self.dialogue,
            self.emotion,
            self.inner_thought,
        ]
        .iter()
        .filter(|&&count| count > 0)
        .count()
    }

    /// Sum of all category counts.
    pub fn completeness(&self) -> usize {
        self.time
            + self.location
            + self.people
            + self.sensory
            + self.dialogue
            + self.emotion
            + self.inner_thought
    }

    /// Returns true if the message needs a deepening follow-up.
    pub fn needs_deepening(&self) -> bool {
        self.depth() < 3 || self.completeness() < 5
    }

    /// The missing categories, in prompt-priority order.
    pub fn missing_categories(&self) -> Vec<StoryCategory> {
        StoryCategory::PROMPT_PRIORITY
            .iter()
            .copied()
            .filter(|&category| self.count(category) == 0)
            .collect()
    }
}

/// Extracts story elements from message text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoryExtractor;

impl StoryExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Runs every category matcher over `text`.
    pub fn extract(&self, text: &str) -> StoryElements {
        StoryElements {
            time: TIME_PATTERN.find_iter(text).count(),
            location: LOCATION_PATTERN.find_iter(text).count(),
            people: PEOPLE_PATTERN.find_iter(text).count(),
            sensory: SENSORY_PATTERN.find_iter(text).count(),
            dialogue: DIALOGUE_PATTERN.find_iter(text).count(),
            emotion: EMOTION_PATTERN.find_iter(text).count(),
            inner_thought: INNER_THOUGHT_PATTERN.find_iter(text).count(),
        }
    }

    /// Builds one clarifying follow-up naming up to two missing categories.
    ///
    /// Falls back to a phase-appropriate generic question when nothing is
    /// missing.
    pub fn deepening_prompt(&self, elements: &StoryElements, phase: SessionPhase) -> String {
        let missing = elements.missing_categories();
        match missing.as_slice() {
            [] => phase.deepening_question().to_string(),
            [only] => format!("Could you tell me more about {}?", only.missing_detail()),
            [first, second, ..] => format!(
                "Could you tell me more about {} and {}?",
                first.missing_detail(),
                second.missing_detail()
            ),
        }
    }
}
