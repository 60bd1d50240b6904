//! Merging name, supplier, MRP and cost evidence into one confidence.

use pharm_model::{CatalogItem, InvoiceLine, SignalVector, WeightingRegime, unit};
use serde::{Deserialize, Serialize};

/// Weights of the five ensemble signals in the name score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameWeights {
    pub sequence: f64,
    pub edit_distance: f64,
    pub token_overlap: f64,
    pub phonetic: f64,
    pub component_bonus: f64,
}

impl Default for NameWeights {
    fn default() -> Self {
        Self {
            sequence: 0.25,
            edit_distance: 0.20,
            token_overlap: 0.20,
            phonetic: 0.15,
            component_bonus: 0.20,
        }
    }
}

impl NameWeights {
    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    fn as_array(&self) -> [f64; 5] {
        [
            self.sequence,
            self.edit_distance,
            self.token_overlap,
            self.phonetic,
            self.component_bonus,
        ]
    }

    /// Weighted sum of the signals.
    pub fn name_score(&self, signals: &SignalVector) -> f64 {
        let values = signals.clamped().labelled();
        let score: f64 = self
            .as_array()
            .iter()
            .zip(values)
            .map(|(weight, (_, value))| weight * value)
            .sum();
        unit(score)
    }
}

/// Step function for unit-cost deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostBands {
    /// Relative deviation scoring 1.0 (default: 0.10).
    pub exact_within: f64,
    /// Relative deviation scoring `near_score` (default: 0.40).
    pub near_within: f64,
    /// Score inside the near band (default: 0.5).
    pub near_score: f64,
}

impl Default for CostBands {
    fn default() -> Self {
        Self {
            exact_within: 0.10,
            near_within: 0.40,
            near_score: 0.5,
        }
    }
}

/// Invoice MRP (VAT-inclusive) against the catalog MRP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MrpEvidence {
    pub invoice_mrp: f64,
    pub master_mrp: f64,
    /// VAT as a fraction.
    pub vat_rate: f64,
}

impl MrpEvidence {
    /// Evidence for a line/item pair, when both sides carry an MRP.
    pub fn for_pair(line: &InvoiceLine, item: &CatalogItem) -> Option<Self> {
        Some(Self {
            invoice_mrp: line.invoice_mrp.filter(|mrp| mrp.is_finite() && *mrp > 0.0)?,
            master_mrp: item.master_mrp()?,
            vat_rate: line.normalized_vat_rate(),
        })
    }

    pub fn adjusted_invoice_mrp(&self) -> f64 {
        self.invoice_mrp / (1.0 + self.vat_rate)
    }
}

/// Effective invoice unit price against the catalog buy rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEvidence {
    pub unit_price: f64,
    pub buy_rate: f64,
}

impl CostEvidence {
    pub fn for_pair(line: &InvoiceLine, item: &CatalogItem) -> Option<Self> {
        Some(Self {
            unit_price: line.effective_unit_price()?,
            buy_rate: item.buy_rate.filter(|rate| rate.is_finite() && *rate > 0.0)?,
        })
    }
}

/// `max(0, 1 - slope * |a - b| / max(a, b))`; `None` unless both are positive.
pub fn mrp_consistency(invoice: f64, master: f64, slope: f64) -> Option<f64> {
    if !(invoice.is_finite() && master.is_finite() && invoice > 0.0 && master > 0.0) {
        return None;
    }
    let deviation = (invoice - master).abs() / invoice.max(master);
    Some(unit(1.0 - slope * deviation))
}

/// Banded score of `|price / buy_rate - 1|`; `None` unless both are positive.
pub fn cost_consistency(unit_price: f64, buy_rate: f64, bands: &CostBands) -> Option<f64> {
    if !(unit_price.is_finite() && buy_rate.is_finite() && unit_price > 0.0 && buy_rate > 0.0) {
        return None;
    }
    let deviation = (unit_price / buy_rate - 1.0).abs();
    Some(if deviation <= bands.exact_within {
        1.0
    } else if deviation <= bands.near_within {
        bands.near_score
    } else {
        0.0
    })
}

/// Every component of a combined score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combined {
    pub name_score: f64,
    pub supplier_score: f64,
    /// `None` when no MRP comparison was possible.
    pub mrp_score: Option<f64>,
    /// `None` when no cost comparison was possible.
    pub cost_score: Option<f64>,
    pub regime: WeightingRegime,
    pub final_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCombiner {
    pub name_weights: NameWeights,
    pub cost_bands: CostBands,
    pub mrp_slope: f64,
}

impl Default for ScoreCombiner {
    fn default() -> Self {
        Self {
            name_weights: NameWeights::default(),
            cost_bands: CostBands::default(),
            mrp_slope: 3.0,
        }
    }
}

impl ScoreCombiner {
    pub fn combine(
        &self,
        signals: &SignalVector,
        supplier_score: f64,
        mrp: Option<MrpEvidence>,
        cost: Option<CostEvidence>,
    ) -> Combined {
        let name_score = self.name_weights.name_score(signals);
        let mrp_score = mrp.and_then(|mrp| {
            mrp_consistency(mrp.adjusted_invoice_mrp(), mrp.master_mrp, self.mrp_slope)
        });
        let cost_score =
            cost.and_then(|cost| cost_consistency(cost.unit_price, cost.buy_rate, &self.cost_bands));
        let (regime, final_score) = weigh(name_score, supplier_score, mrp_score, cost_score);
        Combined {
            name_score,
            supplier_score: unit(supplier_score),
            mrp_score,
            cost_score,
            regime,
            final_score,
        }
    }
}

/// Final score from already computed components.
///
/// The regime is picked by whether an MRP score exists; an absent cost score
/// contributes 0.
pub fn weigh(
    name_score: f64,
    supplier_score: f64,
    mrp_score: Option<f64>,
    cost_score: Option<f64>,
) -> (WeightingRegime, f64) {
    let regime = WeightingRegime::select(mrp_score.is_some());
    let weights = regime.weights();
    let score = weights.name * unit(name_score)
        + weights.supplier * unit(supplier_score)
        + weights.mrp * mrp_score.map_or(0.0, unit)
        + weights.cost * cost_score.map_or(0.0, unit);
    (regime, unit(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_weights_sum_to_one() {
        assert!((NameWeights::default().sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_signals_give_perfect_name_score() {
        let signals = SignalVector {
            sequence: 1.0,
            edit_distance: 1.0,
            token_overlap: 1.0,
            phonetic: 1.0,
            component_bonus: 1.0,
        };
        assert!((NameWeights::default().name_score(&signals) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mrp_consistency_falls_with_deviation() {
        assert_eq!(mrp_consistency(10.0, 10.0, 3.0), Some(1.0));
        let score = mrp_consistency(9.0, 10.0, 3.0).unwrap();
        assert!((score - 0.7).abs() < 1e-12);
        assert_eq!(mrp_consistency(5.0, 10.0, 3.0), Some(0.0));
        assert_eq!(mrp_consistency(0.0, 10.0, 3.0), None);
    }

    #[test]
    fn cost_bands() {
        let bands = CostBands::default();
        assert_eq!(cost_consistency(10.5, 10.0, &bands), Some(1.0));
        assert_eq!(cost_consistency(13.0, 10.0, &bands), Some(0.5));
        assert_eq!(cost_consistency(20.0, 10.0, &bands), Some(0.0));
        assert_eq!(cost_consistency(10.0, -1.0, &bands), None);
    }

    #[test]
    fn without_mrp_redistributes() {
        let (regime, score) = weigh(0.9, 0.0, None, Some(0.8));
        assert_eq!(regime, WeightingRegime::WithoutMrp);
        assert!((score - 0.615).abs() < 1e-12);
    }

    #[test]
    fn with_mrp_uses_all_four() {
        let (regime, score) = weigh(1.0, 1.0, Some(1.0), Some(1.0));
        assert_eq!(regime, WeightingRegime::WithMrp);
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn vat_is_removed_before_mrp_comparison() {
        let evidence = MrpEvidence {
            invoice_mrp: 10.5,
            master_mrp: 10.0,
            vat_rate: 0.05,
        };
        let combined =
            ScoreCombiner::default().combine(&SignalVector::default(), 0.0, Some(evidence), None);
        let mrp_score = combined.mrp_score.unwrap();
        assert!((mrp_score - 1.0).abs() < 1e-9, "{mrp_score}");
        assert_eq!(combined.regime, WeightingRegime::WithMrp);
    }
}
