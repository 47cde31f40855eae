//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::convergence::{ConvergenceConfig, DEFAULT_DAMPING, DEFAULT_TOLERANCE};

/// Errors raised while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the camera engine.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Convergence tick period in milliseconds (default: 100)
    pub tick_period_ms: u64,

    /// Fraction of the remaining gap closed per tick (default: 0.1)
    pub damping: f64,

    /// Per-axis convergence tolerance (default: 0.01)
    pub tolerance: f64,

    /// Duration of a line's start -> end playback in milliseconds (default: 2000)
    pub playback_duration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            damping: DEFAULT_DAMPING,
            tolerance: DEFAULT_TOLERANCE,
            playback_duration_ms: 2_000,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::Invalid("tick_period_ms must be > 0".to_string()));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        if self.playback_duration_ms == 0 {
            return Err(ConfigError::Invalid("playback_duration_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Convergence tuning derived from this config.
    pub fn convergence(&self) -> ConvergenceConfig {
        ConvergenceConfig {
            tick_period: Duration::from_millis(self.tick_period_ms),
            damping: self.damping,
            tolerance: self.tolerance,
        }
    }

    pub fn playback_duration(&self) -> Duration {
        Duration::from_millis(self.playback_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_period_ms, 100);
        assert_eq!(config.damping, 0.1);
        assert_eq!(config.tolerance, 0.01);
        assert!(config.validate().is_ok());
        assert_eq!(config.convergence(), ConvergenceConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_json_str(r#"{"tick_period_ms": 16}"#).unwrap();
        assert_eq!(config.tick_period_ms, 16);
        assert_eq!(config.playback_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"damping": 0.0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"damping": 1.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"tolerance": -1}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"tick_period_ms": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
