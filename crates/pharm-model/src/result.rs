//! Per-line match results and their explainable score breakdown.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;
use crate::invoice::{InvoiceLine, MrpStatus};
use crate::weights::WeightingRegime;

/// Action tier derived from the final confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Safe to accept without review.
    AutoOk,
    /// Plausible, a reviewer should confirm.
    Check,
    /// No usable suggestion.
    NoMatch,
}

impl Tier {
    pub const ALL: [Self; 3] = [Self::AutoOk, Self::Check, Self::NoMatch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoOk => "AUTO_OK",
            Self::Check => "CHECK",
            Self::NoMatch => "NO_MATCH",
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::AutoOk => "safe to auto-accept",
            Self::Check => "review recommended",
            Self::NoMatch => "needs correction",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name-similarity signals for one (query, candidate) pair, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalVector {
    /// Longest-common-subsequence ratio of the full strings.
    pub sequence: f64,
    /// `1 - levenshtein / max_len` of the cleaned names.
    pub edit_distance: f64,
    /// Jaccard index of the token sets.
    pub token_overlap: f64,
    /// Share of tokens with a matching phonetic code.
    pub phonetic: f64,
    /// Agreement of extracted dosage, form and pack size.
    pub component_bonus: f64,
}

impl SignalVector {
    /// Labelled values in a fixed order, for explanations.
    pub fn labelled(&self) -> [(&'static str, f64); 5] {
        [
            ("Seq", self.sequence),
            ("Lev", self.edit_distance),
            ("Jac", self.token_overlap),
            ("Pho", self.phonetic),
            ("Cmp", self.component_bonus),
        ]
    }

    /// Copy with every signal clipped to `[0, 1]` (NaN becomes 0).
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            sequence: unit(self.sequence),
            edit_distance: unit(self.edit_distance),
            token_overlap: unit(self.token_overlap),
            phonetic: unit(self.phonetic),
            component_bonus: unit(self.component_bonus),
        }
    }
}

/// Clip to `[0, 1]`, mapping NaN to 0.
pub fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Where the final score of a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Candidate retrieval plus the similarity ensemble.
    Ensemble,
    /// A learned mapping short-circuited scoring.
    Learned,
    /// Nothing to score: no candidates were retrieved.
    NoCandidates,
}

/// A scoring stage that did not contribute to the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkippedComponent {
    /// No MRP on the invoice or the catalog item; the no-MRP regime applied.
    MrpConsistency,
    /// No effective unit price or buy rate; cost contributed 0.
    CostConsistency,
    /// The learning store could not be read.
    LearningStore,
    /// Candidate retrieval and ensemble scoring were bypassed.
    Ensemble,
}

impl SkippedComponent {
    pub fn description(&self) -> &'static str {
        match self {
            Self::MrpConsistency => "MRP missing, weight redistributed",
            Self::CostConsistency => "cost data missing",
            Self::LearningStore => "learning store unavailable",
            Self::Ensemble => "ensemble bypassed by learned mapping",
        }
    }
}

/// Evidence carried over from a learned mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnedEvidence {
    pub confidence: f64,
    pub times_confirmed: u64,
}

/// Explainable decomposition of a final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub source: ScoreSource,
    /// Ensemble signals of the winning candidate.
    pub signals: Option<SignalVector>,
    pub name_score: Option<f64>,
    pub supplier_score: Option<f64>,
    pub mrp_score: Option<f64>,
    pub cost_score: Option<f64>,
    pub regime: Option<WeightingRegime>,
    pub learned: Option<LearnedEvidence>,
    /// Number of shortlisted candidates that were scored.
    pub candidates_considered: usize,
    pub skipped: Vec<SkippedComponent>,
}

impl ScoreBreakdown {
    pub fn empty(source: ScoreSource) -> Self {
        Self {
            source,
            signals: None,
            name_score: None,
            supplier_score: None,
            mrp_score: None,
            cost_score: None,
            regime: None,
            learned: None,
            candidates_considered: 0,
            skipped: Vec::new(),
        }
    }

    pub fn is_skipped(&self, component: SkippedComponent) -> bool {
        self.skipped.contains(&component)
    }

    /// One-line human-readable explanation.
    pub fn explain(&self) -> String {
        let mut parts = Vec::new();
        match self.source {
            ScoreSource::Learned => {
                if let Some(learned) = self.learned {
                    parts.push(format!(
                        "LEARNED (confirmed {}x, confidence {:.2})",
                        learned.times_confirmed, learned.confidence
                    ));
                }
            }
            ScoreSource::NoCandidates => parts.push("no candidates".to_string()),
            ScoreSource::Ensemble => {
                if let Some(signals) = &self.signals {
                    parts.push(
                        signals
                            .labelled()
                            .iter()
                            .map(|(label, value)| format!("{label}:{value:.2}"))
                            .collect::<Vec<_>>()
                            .join(" "),
                    );
                }
                if let Some(supplier) = self.supplier_score {
                    parts.push(format!("Sup:{supplier:.2}"));
                }
                if let Some(mrp) = self.mrp_score {
                    parts.push(format!("Mrp:{mrp:.2}"));
                }
                if let Some(cost) = self.cost_score {
                    parts.push(format!("Cost:{cost:.2}"));
                }
            }
        }
        for skipped in &self.skipped {
            parts.push(format!("[{}]", skipped.description()));
        }
        parts.join(" ")
    }
}

/// Most recent purchase of the suggested item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastPurchase {
    pub supplier: String,
    pub date: Option<NaiveDate>,
    pub rate: Option<f64>,
}

/// Outcome of matching one invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub invoice_line: InvoiceLine,
    pub suggested_item: Option<CatalogItem>,
    pub final_score: f64,
    pub tier: Tier,
    pub breakdown: ScoreBreakdown,
    pub from_learning: bool,
    /// MRP review status of the suggestion, when both MRPs are known.
    pub mrp_status: Option<MrpStatus>,
    pub last_purchase: Option<LastPurchase>,
}

impl MatchResult {
    /// Result for a line nothing could be suggested for.
    pub fn no_match(invoice_line: InvoiceLine, breakdown: ScoreBreakdown) -> Self {
        Self {
            invoice_line,
            suggested_item: None,
            final_score: 0.0,
            tier: Tier::NoMatch,
            breakdown,
            from_learning: false,
            mrp_status: None,
            last_purchase: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_clips_and_drops_nan() {
        assert_eq!(unit(1.5), 1.0);
        assert_eq!(unit(-0.2), 0.0);
        assert_eq!(unit(f64::NAN), 0.0);
        assert_eq!(unit(0.42), 0.42);
    }

    #[test]
    fn explain_lists_signals_and_skips() {
        let mut breakdown = ScoreBreakdown::empty(ScoreSource::Ensemble);
        breakdown.signals = Some(SignalVector {
            sequence: 0.9,
            edit_distance: 1.0,
            token_overlap: 1.0,
            phonetic: 1.0,
            component_bonus: 1.0,
        });
        breakdown.supplier_score = Some(0.0);
        breakdown.skipped.push(SkippedComponent::MrpConsistency);
        let text = breakdown.explain();
        assert!(text.starts_with("Seq:0.90 Lev:1.00"), "{text}");
        assert!(text.contains("Sup:0.00"));
        assert!(text.contains("MRP missing"));
    }

    #[test]
    fn tier_serializes_in_screaming_case() {
        let json = serde_json::to_string(&Tier::AutoOk).unwrap();
        assert_eq!(json, "\"AUTO_OK\"");
    }
}
