//! Engine configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `MINDSTAGE` prefix and nested values use double
//! underscores as separators.
//!
//! Every tuning constant of the session engine lives here with its product
//! default, so deployments can adjust thresholds without code changes.
//!
//! # Example
//!
//! ```no_run
//! use mindstage::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Exchange budget: {}", config.session.exchange_budget);
//! ```

mod detection;
mod error;
mod scoring;
mod session;

pub use detection::DetectionConfig;
pub use error::{ConfigError, ValidationError};
pub use scoring::ScoringConfig;
pub use session::SessionConfig;

use serde::Deserialize;

/// Root engine configuration
///
/// Contains all configuration sections for the session engine. Load using
/// [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Session loop configuration (budget, delays, cooldowns)
    #[serde(default)]
    pub session: SessionConfig,

    /// Loop/repetition and completion detection thresholds
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Quality scoring weights
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `MINDSTAGE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `MINDSTAGE__SESSION__EXCHANGE_BUDGET=24` -> `session.exchange_budget = 24`
    /// - `MINDSTAGE__SCORING__LOOP_BREAKING_WEIGHT=0.5` -> `scoring.loop_breaking_weight = 0.5`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into the expected
    /// types. Every value has a default, so an empty environment is valid.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MINDSTAGE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.session.validate()?;
        self.detection.validate()?;
        self.scoring.validate()?;
        Ok(())
    }
}
