//! Narrative phases of a roleplay session.
//!
//! Unlike message status (which tracks delivery), the phase determines what
//! kind of dialogue the personas should engage in. The phase is a pure
//! function of the cumulative turn count and is never set directly.

use serde::{Deserialize, Serialize};

/// The narrative stage of a session, derived from the turn count.
///
/// Sessions move forward only:
/// - `Diagnosis` (turns 1-4): surface the presenting problem
/// - `StoryDevelopment` (turns 5-8): draw out a concrete narrative
/// - `Resolution` (turns 9+): consolidate insight and look forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Early turns: identify what brought the patient in.
    #[default]
    Diagnosis,

    /// Middle turns: develop one specific story in sensory detail.
    StoryDevelopment,

    /// Late turns: reflect, find strengths, orient toward the future.
    Resolution,
}

impl SessionPhase {
    /// Derives the phase for a cumulative turn count.
    ///
    /// A fresh session (turn 0) is in `Diagnosis`.
    pub fn for_turn(turn_count: u32) -> Self {
        match turn_count {
            0..=4 => Self::Diagnosis,
            5..=8 => Self::StoryDevelopment,
            _ => Self::Resolution,
        }
    }

    /// Returns the generation directive for this phase.
    ///
    /// This guides the tone and purpose of the persona's responses.
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Diagnosis => {
                "Explore what brought the patient here. Ask open questions about \
                 the presenting problem and listen for a specific situation worth \
                 examining."
            }
            Self::StoryDevelopment => {
                "Develop one concrete story. Ask for the time, the place, who was \
                 there, what was said, and what it felt like in the body."
            }
            Self::Resolution => {
                "Consolidate what the story revealed. Reflect strengths, invite \
                 hope, and orient the patient toward the coming week."
            }
        }
    }

    /// Returns a short label for UI badges.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Diagnosis => "Diagnosis",
            Self::StoryDevelopment => "Story Development",
            Self::Resolution => "Resolution",
        }
    }

    /// Returns a generic deepening question appropriate for this phase.
    ///
    /// Used when a response already covers every story category but still
    /// needs a follow-up.
    pub fn deepening_question(&self) -> &'static str {
        match self {
            Self::Diagnosis => "What feels most pressing about that right now?",
            Self::StoryDevelopment => {
                "If I had been standing next to you in that moment, what would I have seen?"
            }
            Self::Resolution => "What would you want to carry forward from this?",
        }
    }

    /// Returns true if this is the final narrative stage.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution)
    }
}
