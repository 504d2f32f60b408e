//! Quality scoring weights

use serde::Deserialize;

use super::error::ValidationError;

/// Quality scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Weight of the story-extraction sub-score
    #[serde(default = "default_story_extraction_weight")]
    pub story_extraction_weight: f64,

    /// Weight of the loop-breaking sub-score
    #[serde(default = "default_loop_breaking_weight")]
    pub loop_breaking_weight: f64,

    /// Weight of the phase-progression sub-score
    #[serde(default = "default_phase_progression_weight")]
    pub phase_progression_weight: f64,
}

impl ScoringConfig {
    /// Validate scoring configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let weights = [
            self.story_extraction_weight,
            self.loop_breaking_weight,
            self.phase_progression_weight,
        ];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(ValidationError::WeightOutOfRange);
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ValidationError::WeightsDoNotSumToOne);
        }
        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            story_extraction_weight: default_story_extraction_weight(),
            loop_breaking_weight: default_loop_breaking_weight(),
            phase_progression_weight: default_phase_progression_weight(),
        }
    }
}

fn default_story_extraction_weight() -> f64 {
    0.4
}

fn default_loop_breaking_weight() -> f64 {
    0.4
}

fn default_phase_progression_weight() -> f64 {
    0.2
}
