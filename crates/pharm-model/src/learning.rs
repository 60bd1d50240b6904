//! Learned mappings and the corrections that feed them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, PatternKey};
use crate::invoice::InvoiceLine;

/// A confirmed association between an invoice pattern and a catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedMapping {
    pub pattern_key: PatternKey,
    pub item_id: ItemId,
    /// Confidence in `[0, 1]`; grows with repeated confirmation.
    pub confidence: f64,
    /// How often the mapping was produced or used.
    pub times_seen: u64,
    /// How often a human confirmed it.
    pub times_confirmed: u64,
    pub last_updated: DateTime<Utc>,
}

/// A reviewer's verdict on one invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub line: InvoiceLine,
    pub corrected_item_id: ItemId,
    /// What the matcher had suggested, if anything.
    #[serde(default)]
    pub suggested_item_id: Option<ItemId>,
    #[serde(default)]
    pub suggested_score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    /// False for feedback that did not come from a person (e.g. accepted
    /// `AUTO_OK` results fed back in bulk).
    #[serde(default = "default_confirmed_by_human")]
    pub confirmed_by_human: bool,
}

fn default_confirmed_by_human() -> bool {
    true
}

impl Correction {
    pub fn new(line: InvoiceLine, corrected_item_id: ItemId) -> Self {
        Self {
            line,
            corrected_item_id,
            suggested_item_id: None,
            suggested_score: None,
            reason: None,
            confirmed_by_human: true,
        }
    }

    /// Whether the reviewer picked something other than the suggestion.
    pub fn overrides_suggestion(&self) -> bool {
        self.suggested_item_id
            .as_ref()
            .is_none_or(|suggested| suggested != &self.corrected_item_id)
    }
}
