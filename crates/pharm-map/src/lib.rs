//! Invoice-line to catalog-item matching.
//!
//! Per line, [`MatchEngine`] consults the learning store first; without a
//! trusted mapping it retrieves a shortlist from the [`CandidateIndex`],
//! scores every candidate with the [`SimilarityEnsemble`], merges the name
//! score with supplier, MRP and cost evidence in the [`ScoreCombiner`] and
//! classifies the best candidate with [`TierThresholds`].

pub mod catalog;
pub mod classify;
pub mod combine;
pub mod config;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod history;
pub mod index;
pub mod phonetic;

pub use catalog::{Candidate, IndexedCatalog};
pub use classify::TierThresholds;
pub use combine::{
    Combined, CostBands, CostEvidence, MrpEvidence, NameWeights, ScoreCombiner, cost_consistency,
    mrp_consistency, weigh,
};
pub use config::MatchConfig;
pub use engine::{LearnSummary, MatchEngine, RunSummary};
pub use ensemble::{SignalScorer, SimilarityEnsemble};
pub use error::{MatchError, Result};
pub use history::{NoHistory, PurchaseHistory, PurchaseRecord, SupplierSignal};
pub use index::{CandidateIndex, IndexHit};
