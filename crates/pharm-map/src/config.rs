//! Matching configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! top_k = 10
//! learning_threshold = 0.85
//! mrp_deviation_slope = 3.0
//!
//! [name_weights]
//! sequence = 0.25
//! edit_distance = 0.20
//! token_overlap = 0.20
//! phonetic = 0.15
//! component_bonus = 0.20
//!
//! [tiers]
//! auto_ok = 0.80
//! check = 0.60
//!
//! [learning]
//! initial_confidence = 0.90
//! confirmation_decay = 0.5
//! unconfirmed_confidence = 0.50
//!
//! [cost]
//! exact_within = 0.10
//! near_within = 0.40
//! near_score = 0.5
//! ```

use std::fs;
use std::path::Path;

use pharm_learn::LearningPolicy;
use serde::{Deserialize, Serialize};

use crate::classify::TierThresholds;
use crate::combine::{CostBands, NameWeights, ScoreCombiner};
use crate::error::{MatchError, Result};

const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Candidates retrieved per line (default: 10).
    pub top_k: usize,
    /// Minimum learned confidence that bypasses scoring (default: 0.85).
    pub learning_threshold: f64,
    pub name_weights: NameWeights,
    pub tiers: TierThresholds,
    pub learning: LearningPolicy,
    pub cost: CostBands,
    /// Slope of the MRP consistency penalty (default: 3.0).
    pub mrp_deviation_slope: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            learning_threshold: 0.85,
            name_weights: NameWeights::default(),
            tiers: TierThresholds::default(),
            learning: LearningPolicy::default(),
            cost: CostBands::default(),
            mrp_deviation_slope: 3.0,
        }
    }
}

impl MatchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| MatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| MatchError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded match config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return invalid("top_k must be at least 1");
        }
        let weights = [
            self.name_weights.sequence,
            self.name_weights.edit_distance,
            self.name_weights.token_overlap,
            self.name_weights.phonetic,
            self.name_weights.component_bonus,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid("name weights must be non-negative");
        }
        let sum = self.name_weights.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return invalid(&format!("name weights must sum to 1.0, got {sum}"));
        }
        for (name, value) in [
            ("learning_threshold", self.learning_threshold),
            ("tiers.auto_ok", self.tiers.auto_ok),
            ("tiers.check", self.tiers.check),
            ("cost.near_score", self.cost.near_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(&format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if self.tiers.check > self.tiers.auto_ok {
            return invalid("tiers.check must not exceed tiers.auto_ok");
        }
        if !(self.cost.exact_within >= 0.0 && self.cost.near_within >= self.cost.exact_within) {
            return invalid("cost bands must satisfy 0 <= exact_within <= near_within");
        }
        if !(self.mrp_deviation_slope.is_finite() && self.mrp_deviation_slope >= 0.0) {
            return invalid("mrp_deviation_slope must be non-negative");
        }
        self.learning
            .validate()
            .map_err(|err| MatchError::InvalidConfig {
                message: err.to_string(),
            })
    }

    pub fn combiner(&self) -> ScoreCombiner {
        ScoreCombiner {
            name_weights: self.name_weights,
            cost_bands: self.cost,
            mrp_slope: self.mrp_deviation_slope,
        }
    }
}

fn invalid(message: &str) -> Result<()> {
    Err(MatchError::InvalidConfig {
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        MatchConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = MatchConfig::default();
        config.name_weights.sequence = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"), "{err}");
    }

    #[test]
    fn rejects_inverted_tiers() {
        let mut config = MatchConfig::default();
        config.tiers.check = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        let config = MatchConfig {
            top_k: 0,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: MatchConfig = toml::from_str("top_k = 5\n[tiers]\nauto_ok = 0.9\n").unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.tiers.auto_ok, 0.9);
        assert_eq!(config.tiers.check, 0.60);
        assert_eq!(config.learning_threshold, 0.85);
    }
}
