//! Final score to action tier.

use pharm_model::Tier;
use serde::{Deserialize, Serialize};

/// Boundary-inclusive tier thresholds.
///
/// - At or above `auto_ok`: [`Tier::AutoOk`]
/// - At or above `check`: [`Tier::Check`]
/// - Below `check`: [`Tier::NoMatch`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Minimum score to accept without review (default: 0.80).
    pub auto_ok: f64,
    /// Minimum score worth suggesting (default: 0.60).
    pub check: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            auto_ok: 0.80,
            check: 0.60,
        }
    }
}

impl TierThresholds {
    #[must_use]
    pub fn classify(&self, final_score: f64) -> Tier {
        if final_score >= self.auto_ok {
            Tier::AutoOk
        } else if final_score >= self.check {
            Tier::Check
        } else {
            Tier::NoMatch
        }
    }
}
