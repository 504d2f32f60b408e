//! Session loop configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Session loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Maximum automated turns before the loop stops on its own
    #[serde(default = "default_exchange_budget")]
    pub exchange_budget: u32,

    /// Pause between turns, in milliseconds
    #[serde(default = "default_inter_turn_delay_ms")]
    pub inter_turn_delay_ms: u64,

    /// Minimum wall-clock seconds between loop interventions
    #[serde(default = "default_intervention_cooldown_secs")]
    pub intervention_cooldown_secs: u64,

    /// Messages of history handed to the generation collaborator
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl SessionConfig {
    /// Get the inter-turn delay as a Duration
    pub fn inter_turn_delay(&self) -> Duration {
        Duration::from_millis(self.inter_turn_delay_ms)
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.exchange_budget == 0 {
            return Err(ValidationError::InvalidExchangeBudget);
        }
        if self.intervention_cooldown_secs == 0 {
            return Err(ValidationError::InvalidInterventionCooldown);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exchange_budget: default_exchange_budget(),
            inter_turn_delay_ms: default_inter_turn_delay_ms(),
            intervention_cooldown_secs: default_intervention_cooldown_secs(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_exchange_budget() -> u32 {
    20
}

fn default_inter_turn_delay_ms() -> u64 {
    2000
}

fn default_intervention_cooldown_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    12
}
