//! Immutable history entries of the learning store.

use chrono::{DateTime, Utc};
use pharm_model::{Correction, ItemId, PatternKey};
use serde::{Deserialize, Serialize};

/// Context recorded with a correction for later audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionAudit {
    pub raw_text: Option<String>,
    pub supplier: Option<String>,
    pub invoice_no: Option<String>,
    pub line_no: Option<String>,
    pub suggested_item_id: Option<ItemId>,
    pub suggested_score: Option<f64>,
    pub reason: Option<String>,
}

impl CorrectionAudit {
    /// Audit payload carried by a reviewer correction.
    pub fn from_correction(correction: &Correction) -> Self {
        Self {
            raw_text: Some(correction.line.raw_item_name.clone()),
            supplier: Some(correction.line.supplier.clone()),
            invoice_no: correction.line.invoice_no.clone(),
            line_no: correction.line.line_no.clone(),
            suggested_item_id: correction.suggested_item_id.clone(),
            suggested_score: correction.suggested_score,
            reason: correction.reason.clone(),
        }
    }
}

/// What happened to a pattern key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A correction pointing the key at an item.
    Correction {
        item_id: ItemId,
        confirmed_by_human: bool,
        #[serde(default)]
        audit: CorrectionAudit,
    },
    /// The active mapping was used to answer a lookup.
    Seen { item_id: ItemId },
    /// The key was removed by hand.
    Deleted {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correction { .. } => "correction",
            Self::Seen { .. } => "seen",
            Self::Deleted { .. } => "deleted",
        }
    }
}

/// One entry of the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    /// Position in the log, starting at 1 and strictly increasing.
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub pattern_key: PatternKey,
    #[serde(flatten)]
    pub kind: EventKind,
}
