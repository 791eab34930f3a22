//! Engine configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! [scoring.thresholds]
//! pass = 0.6
//!
//! [consensus]
//! majority_threshold = 0.5
//! critic_ids = ["critic", "validator"]
//!
//! [trust]
//! damping = 0.85
//! iterations = 20
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationOptions, UncertaintyBand};
use crate::consensus::ConsensusConfig;
use crate::domain::{MeshError, Result};
use crate::scoring::ScoringModel;
use crate::trust::TrustConfig;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringModel,
    pub consensus: ConsensusConfig,
    pub trust: TrustConfig,
    pub active_learning: UncertaintyBand,
    pub calibration: CalibrationOptions,
}

fn unit(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MeshError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn invalid(msg: impl Into<String>) -> MeshError {
    MeshError::InvalidConfig(msg.into())
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let weights = self.scoring.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("scoring weights must be finite and non-negative"));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(invalid("scoring weights must not all be zero"));
        }
        let t = &self.scoring.thresholds;
        unit("scoring.thresholds.pass", t.pass)?;
        unit("scoring.thresholds.citation_floor", t.citation_floor)?;
        unit("scoring.thresholds.context_floor", t.context_floor)?;
        unit("scoring.thresholds.source_floor", t.source_floor)?;
        unit("scoring.thresholds.relevance_floor", t.relevance_floor)?;

        unit("consensus.majority_threshold", self.consensus.majority_threshold)?;
        if self.consensus.majority_threshold >= 1.0 {
            return Err(invalid("consensus.majority_threshold must be below 1"));
        }
        if self.consensus.critic_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(invalid("consensus.critic_ids must name at least one critic"));
        }

        let trust = &self.trust;
        if !(trust.damping > 0.0 && trust.damping < 1.0) {
            return Err(invalid(format!(
                "trust.damping must be within (0, 1), got {}",
                trust.damping
            )));
        }
        if trust.iterations == 0 {
            return Err(invalid("trust.iterations must be at least 1"));
        }
        if trust.write_attempts == 0 {
            return Err(invalid("trust.write_attempts must be at least 1"));
        }
        if trust.precision > 12 {
            return Err(invalid("trust.precision must be at most 12"));
        }

        let band = &self.active_learning;
        unit("active_learning.low", band.low)?;
        unit("active_learning.high", band.high)?;
        unit("active_learning.min_confidence", band.min_confidence)?;
        if band.low > band.high {
            return Err(invalid("active_learning.low must not exceed active_learning.high"));
        }

        let cal = &self.calibration;
        unit("calibration.target_acc", cal.target_acc)?;
        if cal.min_samples == 0 {
            return Err(invalid("calibration.min_samples must be at least 1"));
        }
        if !(cal.learning_rate.is_finite() && cal.learning_rate > 0.0) {
            return Err(invalid("calibration.learning_rate must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.trust.iterations, 20);
        assert_eq!(config.calibration.min_samples, 50);
        assert_eq!(config.scoring.thresholds.pass, 0.55);
    }

    #[test]
    fn test_partial_sections_override() {
        let raw = r#"
            [scoring.thresholds]
            pass = 0.6

            [consensus]
            critic_ids = ["reviewer"]

            [trust]
            damping = 0.9
        "#;
        let config = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.scoring.thresholds.pass, 0.6);
        assert_eq!(config.scoring.thresholds.citation_floor, 0.5);
        assert_eq!(config.consensus.critic_ids, vec!["reviewer".to_string()]);
        assert_eq!(config.consensus.majority_threshold, 0.5);
        assert_eq!(config.trust.damping, 0.9);
        assert_eq!(config.trust.iterations, 20);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for raw in [
            "[trust]\ndamping = 1.0",
            "[trust]\niterations = 0",
            "[scoring.weights]\ncitation = -1.0",
            "[scoring.weights]\ncitation = 0.0\ncontext = 0.0\nsource = 0.0\nrelevance = 0.0",
            "[active_learning]\nlow = 0.7\nhigh = 0.6",
            "[consensus]\ncritic_ids = []",
        ] {
            assert!(
                matches!(
                    EngineConfig::from_toml_str(raw),
                    Err(MeshError::InvalidConfig(_))
                ),
                "accepted: {raw}"
            );
        }
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("[trust\n"),
            Err(MeshError::Config(_))
        ));
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        assert!(matches!(
            EngineConfig::from_path("/definitely/not/here.toml"),
            Err(MeshError::Io(_))
        ));
    }
}
