//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Exchange budget must be at least 1")]
    InvalidExchangeBudget,

    #[error("Intervention cooldown must be nonzero")]
    InvalidInterventionCooldown,

    #[error("Detection window must be at least 1 message")]
    InvalidDetectionWindow,

    #[error("Repetition threshold must be at least 2")]
    InvalidRepetitionThreshold,

    #[error("Scoring weights must each be in [0, 1]")]
    WeightOutOfRange,

    #[error("Scoring weights must sum to 1.0")]
    WeightsDoNotSumToOne,
}
