//! Confidence policy for learned mappings.

use serde::{Deserialize, Serialize};

use crate::error::{LearnError, Result};

/// How confidence is assigned to a learned mapping.
///
/// A human-confirmed mapping starts at `initial_confidence` and closes the gap
/// to 1.0 by `confirmation_decay` with every further confirmation:
///
/// ```text
/// confidence(n) = 1 - (1 - initial_confidence) * confirmation_decay^(n - 1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningPolicy {
    /// Confidence after the first human confirmation (default: 0.90).
    pub initial_confidence: f64,
    /// Share of the remaining gap kept per confirmation (default: 0.5).
    pub confirmation_decay: f64,
    /// Confidence of a mapping only ever recorded without human
    /// confirmation (default: 0.50).
    pub unconfirmed_confidence: f64,
}

impl Default for LearningPolicy {
    fn default() -> Self {
        Self {
            initial_confidence: 0.90,
            confirmation_decay: 0.5,
            unconfirmed_confidence: 0.50,
        }
    }
}

impl LearningPolicy {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("initial_confidence", self.initial_confidence),
            ("confirmation_decay", self.confirmation_decay),
            ("unconfirmed_confidence", self.unconfirmed_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LearnError::InvalidPolicy {
                    message: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Confidence of a mapping with `times_confirmed` human confirmations.
    #[must_use]
    pub fn confidence_for(&self, times_confirmed: u64) -> f64 {
        if times_confirmed == 0 {
            return self.unconfirmed_confidence;
        }
        let exponent = i32::try_from(times_confirmed - 1).unwrap_or(i32::MAX);
        let gap = (1.0 - self.initial_confidence) * self.confirmation_decay.powi(exponent);
        (1.0 - gap).clamp(0.0, 1.0)
    }
}
