//! Data model shared by the invoice matching crates.

pub mod catalog;
pub mod error;
pub mod ids;
pub mod invoice;
pub mod learning;
pub mod result;
pub mod weights;

pub use catalog::{CatalogItem, validate_catalog};
pub use error::{ModelError, Result};
pub use ids::{ItemId, PATTERN_KEY_SEPARATOR, PatternKey};
pub use invoice::{InvoiceLine, MrpStatus, validate_invoice};
pub use learning::{Correction, LearnedMapping};
pub use result::{
    LastPurchase, LearnedEvidence, MatchResult, ScoreBreakdown, ScoreSource, SignalVector,
    SkippedComponent, Tier, unit,
};
pub use weights::{RegimeWeights, WeightingRegime};
