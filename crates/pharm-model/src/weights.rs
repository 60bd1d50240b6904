//! Final-score weighting regimes.
//!
//! The regime is picked from the shape of the evidence (is an MRP comparison
//! possible?) and each regime carries its own complete weight set. There is
//! no shared weight table that gets patched when a signal is missing.

use serde::{Deserialize, Serialize};

/// Weights applied to the four top-level signals of one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeWeights {
    pub name: f64,
    pub supplier: f64,
    pub mrp: f64,
    pub cost: f64,
}

impl RegimeWeights {
    pub fn sum(&self) -> f64 {
        self.name + self.supplier + self.mrp + self.cost
    }
}

/// Named weighting strategy for the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingRegime {
    /// Invoice and catalog both carry an MRP.
    WithMrp,
    /// No MRP comparison possible; its weight is redistributed.
    WithoutMrp,
}

impl WeightingRegime {
    pub const ALL: [Self; 2] = [Self::WithMrp, Self::WithoutMrp];

    /// Pick the regime from MRP availability.
    pub fn select(mrp_available: bool) -> Self {
        if mrp_available {
            Self::WithMrp
        } else {
            Self::WithoutMrp
        }
    }

    pub const fn weights(self) -> RegimeWeights {
        match self {
            Self::WithMrp => RegimeWeights {
                name: 0.45,
                supplier: 0.25,
                mrp: 0.20,
                cost: 0.10,
            },
            Self::WithoutMrp => RegimeWeights {
                name: 0.55,
                supplier: 0.30,
                mrp: 0.0,
                cost: 0.15,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WithMrp => "with_mrp",
            Self::WithoutMrp => "without_mrp",
        }
    }
}
