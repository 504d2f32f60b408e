//! Loop, repetition, and completion detection thresholds

use serde::Deserialize;

use super::error::ValidationError;

/// Detection threshold configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Trailing messages scanned by the loop detector
    #[serde(default = "default_loop_window")]
    pub loop_window: usize,

    /// Occurrences of one filler phrase that count as a loop
    #[serde(default = "default_phrase_repeat_threshold")]
    pub phrase_repeat_threshold: usize,

    /// Same-role responses in a row that stop the session as repetitive
    #[serde(default = "default_repetition_run")]
    pub repetition_run: usize,

    /// Shared-prefix length marking near-identical responses
    #[serde(default = "default_repetition_prefix_chars")]
    pub repetition_prefix_chars: usize,

    /// Turns before the completion detector may fire
    #[serde(default = "default_min_completion_turns")]
    pub min_completion_turns: u32,
}

impl DetectionConfig {
    /// Validate detection configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.loop_window == 0 {
            return Err(ValidationError::InvalidDetectionWindow);
        }
        if self.phrase_repeat_threshold < 2 || self.repetition_run < 2 {
            return Err(ValidationError::InvalidRepetitionThreshold);
        }
        Ok(())
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            loop_window: default_loop_window(),
            phrase_repeat_threshold: default_phrase_repeat_threshold(),
            repetition_run: default_repetition_run(),
            repetition_prefix_chars: default_repetition_prefix_chars(),
            min_completion_turns: default_min_completion_turns(),
        }
    }
}

fn default_loop_window() -> usize {
    6
}

fn default_phrase_repeat_threshold() -> usize {
    2
}

fn default_repetition_run() -> usize {
    3
}

fn default_repetition_prefix_chars() -> usize {
    50
}

fn default_min_completion_turns() -> u32 {
    8
}
