//! Name-similarity signals between a query and a candidate.

use std::collections::BTreeSet;

use pharm_model::SignalVector;
use pharm_normalize::{ExtractedFields, NormalizedText};
use rapidfuzz::distance::{indel, levenshtein};

use crate::phonetic;

const DOSAGE_WEIGHT: f64 = 0.6;
const FORM_WEIGHT: f64 = 0.2;
const PACK_WEIGHT: f64 = 0.2;

/// Computes the name-similarity signals for one (query, candidate) pair.
pub trait SignalScorer: Send + Sync {
    fn score(&self, query: &NormalizedText, candidate: &NormalizedText) -> SignalVector;
}

/// The five-signal ensemble.
///
/// Every signal is independent of the others and is 0 when either side has
/// nothing to compare.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityEnsemble;

impl SignalScorer for SimilarityEnsemble {
    fn score(&self, query: &NormalizedText, candidate: &NormalizedText) -> SignalVector {
        SignalVector {
            sequence: sequence_similarity(&query.full, &candidate.full),
            edit_distance: edit_similarity(&query.clean, &candidate.clean),
            token_overlap: token_overlap(&query.tokens, &candidate.tokens),
            phonetic: phonetic::similarity(&query.clean, &candidate.clean),
            component_bonus: component_bonus(&query.fields, &candidate.fields),
        }
        .clamped()
    }
}

/// `2 * LCS / (len(a) + len(b))`.
pub fn sequence_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    indel::normalized_similarity(a.chars(), b.chars())
}

/// `1 - levenshtein / max(len(a), len(b))`.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    levenshtein::normalized_similarity(a.chars(), b.chars())
}

/// Jaccard index of the token sets.
pub fn token_overlap(a: &[String], b: &[String]) -> f64 {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if a.is_empty() || b.is_empty() || union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Agreement of the extracted fields present on both sides.
///
/// Dosage weighs 0.6 (partial credit for partially matching dosage lists),
/// form and pack size 0.2 each. Fields missing on either side are left out
/// and the remaining weights renormalized; with nothing comparable the bonus
/// is 0.
pub fn component_bonus(query: &ExtractedFields, candidate: &ExtractedFields) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;

    if !query.dosages.is_empty() && !candidate.dosages.is_empty() {
        let matches = query
            .dosages
            .iter()
            .filter(|dosage| candidate.dosages.contains(dosage))
            .count();
        let longest = query.dosages.len().max(candidate.dosages.len());
        weighted += DOSAGE_WEIGHT * matches as f64 / longest as f64;
        total += DOSAGE_WEIGHT;
    }
    if let (Some(a), Some(b)) = (&query.form, &candidate.form) {
        if a == b {
            weighted += FORM_WEIGHT;
        }
        total += FORM_WEIGHT;
    }
    if let (Some(a), Some(b)) = (&query.pack_size, &candidate.pack_size) {
        if a == b {
            weighted += PACK_WEIGHT;
        }
        total += PACK_WEIGHT;
    }

    if total == 0.0 { 0.0 } else { weighted / total }
}
