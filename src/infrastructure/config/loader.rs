use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Score weights must sum to 1.0, got {0}")]
    InvalidScoreWeights(f64),

    #[error("Selection reputation floor {floor} exceeds the high-value floor {high_value}")]
    InvertedReputationFloors { floor: f64, high_value: f64 },

    #[error("Invalid history window: {0}. Must be at least 1")]
    InvalidHistoryWindow(usize),

    #[error("Invalid execution timeout: {0}. Must be positive")]
    InvalidExecutionTimeout(u64),

    #[error("Invalid impact multiplier cap: {0}. Must be at least 1.0")]
    InvalidImpactCap(f64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .apiary/config.yaml (project config)
    /// 3. .apiary/local.yaml (project local overrides, optional)
    /// 4. Environment variables (APIARY_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".apiary/config.yaml"))
            .merge(Yaml::file(".apiary/local.yaml"))
            .merge(Env::prefixed("APIARY_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let weight_sum = config.rewards.score_weights.sum();
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidScoreWeights(weight_sum));
        }

        if config.selection.min_reputation > config.selection.high_value_min_reputation {
            return Err(ConfigError::InvertedReputationFloors {
                floor: config.selection.min_reputation,
                high_value: config.selection.high_value_min_reputation,
            });
        }

        if config.selection.max_impact_multiplier < 1.0 {
            return Err(ConfigError::InvalidImpactCap(
                config.selection.max_impact_multiplier,
            ));
        }

        if config.performance.history_window == 0 {
            return Err(ConfigError::InvalidHistoryWindow(
                config.performance.history_window,
            ));
        }

        if config.scheduler.execution_timeout_secs == 0 {
            return Err(ConfigError::InvalidExecutionTimeout(
                config.scheduler.execution_timeout_secs,
            ));
        }

        Ok(())
    }
}
