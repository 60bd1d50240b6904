//! Per-line orchestration: learned lookup, retrieval, scoring, classification.

use std::sync::Arc;

use pharm_learn::{CorrectionAudit, MappingStore};
use pharm_model::{
    CatalogItem, Correction, InvoiceLine, LearnedEvidence, LearnedMapping, MatchResult,
    PatternKey, ScoreBreakdown, ScoreSource, SignalVector, SkippedComponent, Tier,
    WeightingRegime, validate_catalog, validate_invoice,
};
use pharm_normalize::{Normalize, NormalizedText};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::IndexedCatalog;
use crate::combine::{Combined, CostEvidence, MrpEvidence, ScoreCombiner};
use crate::config::MatchConfig;
use crate::ensemble::{SignalScorer, SimilarityEnsemble};
use crate::error::Result;
use crate::history::{NoHistory, SupplierSignal};

/// Matches invoice lines against one catalog.
///
/// The engine is immutable once built and shared by reference across the
/// worker threads of [`MatchEngine::match_all`]. The learning store is the
/// only mutable collaborator and serializes its own writes.
pub struct MatchEngine {
    config: MatchConfig,
    combiner: ScoreCombiner,
    normalizer: Arc<dyn Normalize>,
    catalog: IndexedCatalog,
    scorer: Arc<dyn SignalScorer>,
    history: Arc<dyn SupplierSignal>,
    store: Option<Arc<dyn MappingStore>>,
}

/// Outcome of a corrections pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnSummary {
    pub recorded: usize,
    /// Corrections naming an item that is not in the catalog.
    pub unknown_item: usize,
    /// Corrections whose text normalized to nothing.
    pub empty_pattern: usize,
    /// Corrections the store failed to record.
    pub failed: usize,
}

/// Counters over a batch of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub auto_ok: usize,
    pub check: usize,
    pub no_match: usize,
    /// Results answered by a learned mapping.
    pub learned: usize,
    /// Results whose MRP status needs review.
    pub mrp_review: usize,
}

impl RunSummary {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.tier {
                Tier::AutoOk => summary.auto_ok += 1,
                Tier::Check => summary.check += 1,
                Tier::NoMatch => summary.no_match += 1,
            }
            summary.learned += usize::from(result.from_learning);
            summary.mrp_review += usize::from(
                result
                    .mrp_status
                    .is_some_and(|status| status.needs_review()),
            );
        }
        summary
    }

    pub fn count(&self, tier: Tier) -> usize {
        match tier {
            Tier::AutoOk => self.auto_ok,
            Tier::Check => self.check,
            Tier::NoMatch => self.no_match,
        }
    }

    /// Share of lines that need no review.
    pub fn automation_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.auto_ok as f64 / self.total as f64
        }
    }
}

impl MatchEngine {
    /// Build an engine over a validated catalog.
    ///
    /// Fails on an invalid configuration or a catalog rejected by
    /// [`validate_catalog`]. Defaults to the five-signal ensemble, no
    /// purchase history and no learning store.
    pub fn new(
        catalog: Vec<CatalogItem>,
        normalizer: Arc<dyn Normalize>,
        config: MatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_catalog(&catalog)?;
        let catalog = IndexedCatalog::build(catalog, normalizer.as_ref());
        tracing::info!(
            items = catalog.len(),
            top_k = config.top_k,
            "prepared catalog for matching"
        );
        Ok(Self {
            combiner: config.combiner(),
            config,
            normalizer,
            catalog,
            scorer: Arc::new(SimilarityEnsemble),
            history: Arc::new(NoHistory),
            store: None,
        })
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn SignalScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn SupplierSignal>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn MappingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &IndexedCatalog {
        &self.catalog
    }

    pub fn normalizer(&self) -> &dyn Normalize {
        self.normalizer.as_ref()
    }

    /// Pattern key of a line: normalized text plus simplified supplier.
    ///
    /// `None` when the item text normalizes to nothing.
    pub fn pattern_key(&self, line: &InvoiceLine) -> Option<PatternKey> {
        let text = self.normalizer.normalize(&line.raw_item_name);
        let supplier = self.normalizer.normalize_supplier(&line.supplier);
        PatternKey::derive(&text.full, &supplier).ok()
    }

    /// Match every line in parallel; results keep the input order.
    pub fn match_all(&self, lines: &[InvoiceLine]) -> Result<Vec<MatchResult>> {
        self.match_all_with(lines, |_| {})
    }

    /// Like [`Self::match_all`], calling `observe` as each line finishes.
    pub fn match_all_with<F>(&self, lines: &[InvoiceLine], observe: F) -> Result<Vec<MatchResult>>
    where
        F: Fn(&MatchResult) + Sync,
    {
        validate_invoice(lines)?;
        tracing::info!(lines = lines.len(), "matching invoice lines");
        let results: Vec<MatchResult> = lines
            .par_iter()
            .enumerate()
            .map(|(line_index, line)| {
                let span = tracing::debug_span!("match_line", line_index);
                let _enter = span.enter();
                let result = self.match_line(line);
                observe(&result);
                result
            })
            .collect();
        let summary = RunSummary::from_results(&results);
        tracing::info!(
            total = summary.total,
            auto_ok = summary.auto_ok,
            check = summary.check,
            no_match = summary.no_match,
            learned = summary.learned,
            "matched invoice lines"
        );
        Ok(results)
    }

    /// Match one line. Never fails: missing data and store outages degrade
    /// the result and are listed in its breakdown.
    pub fn match_line(&self, line: &InvoiceLine) -> MatchResult {
        let query = self.normalizer.normalize(&line.raw_item_name);
        let supplier = self.normalizer.normalize_supplier(&line.supplier);
        tracing::trace!(tokens = query.tokens.len(), "normalized line");

        let mut skipped = Vec::new();
        if let Some(result) = self.learned_match(line, &query, &supplier, &mut skipped) {
            return result;
        }

        let candidates = self.catalog.candidates(&query, self.config.top_k);
        let mut best: Option<(&CatalogItem, SignalVector, Combined)> = None;
        for candidate in &candidates {
            let signals = self.scorer.score(&query, candidate.name).clamped();
            let combined = self.combiner.combine(
                &signals,
                self.history.supplier_score(&supplier, &candidate.item.id),
                MrpEvidence::for_pair(line, candidate.item),
                CostEvidence::for_pair(line, candidate.item),
            );
            // Strictly greater: ties keep the better retrieval rank.
            if best
                .as_ref()
                .is_none_or(|(_, _, current)| combined.final_score > current.final_score)
            {
                best = Some((candidate.item, signals, combined));
            }
        }

        let Some((item, signals, combined)) = best else {
            tracing::debug!("no candidates retrieved");
            let mut breakdown = ScoreBreakdown::empty(ScoreSource::NoCandidates);
            breakdown.skipped = skipped;
            return MatchResult::no_match(line.clone(), breakdown);
        };

        if combined.regime == WeightingRegime::WithoutMrp {
            skipped.push(SkippedComponent::MrpConsistency);
        }
        if combined.cost_score.is_none() {
            skipped.push(SkippedComponent::CostConsistency);
        }
        let tier = self.config.tiers.classify(combined.final_score);
        tracing::debug!(
            item_id = %item.id,
            final_score = combined.final_score,
            tier = tier.as_str(),
            candidates = candidates.len(),
            "scored line"
        );

        MatchResult {
            invoice_line: line.clone(),
            suggested_item: Some(item.clone()),
            final_score: combined.final_score,
            tier,
            breakdown: ScoreBreakdown {
                source: ScoreSource::Ensemble,
                signals: Some(signals),
                name_score: Some(combined.name_score),
                supplier_score: Some(combined.supplier_score),
                mrp_score: combined.mrp_score,
                cost_score: combined.cost_score,
                regime: Some(combined.regime),
                learned: None,
                candidates_considered: candidates.len(),
                skipped,
            },
            from_learning: false,
            mrp_status: line.mrp_status(item.master_mrp()),
            last_purchase: self.history.last_purchase(&supplier, &item.id),
        }
    }

    /// Fast path: a trusted learned mapping answers the line directly.
    fn learned_match(
        &self,
        line: &InvoiceLine,
        query: &NormalizedText,
        supplier: &str,
        skipped: &mut Vec<SkippedComponent>,
    ) -> Option<MatchResult> {
        let store = self.store.as_ref()?;
        let (key, mapping) = lookup_learned(store.as_ref(), query, supplier, skipped)?;
        if mapping.confidence < self.config.learning_threshold {
            tracing::debug!(
                pattern_key = %key,
                confidence = mapping.confidence,
                "learned mapping below threshold"
            );
            return None;
        }
        let Some(item) = self.catalog.get(&mapping.item_id) else {
            tracing::warn!(
                pattern_key = %key,
                item_id = %mapping.item_id,
                "learned item no longer in catalog, scoring instead"
            );
            return None;
        };
        if let Err(err) = store.record_seen(&key, &mapping.item_id) {
            tracing::warn!(pattern_key = %key, error = %err, "failed to record learned hit");
        }
        Some(self.learned_result(line, supplier, item, &mapping))
    }

    fn learned_result(
        &self,
        line: &InvoiceLine,
        supplier: &str,
        item: &CatalogItem,
        mapping: &LearnedMapping,
    ) -> MatchResult {
        let mut breakdown = ScoreBreakdown::empty(ScoreSource::Learned);
        breakdown.learned = Some(LearnedEvidence {
            confidence: mapping.confidence,
            times_confirmed: mapping.times_confirmed,
        });
        breakdown.skipped.push(SkippedComponent::Ensemble);
        tracing::debug!(
            pattern_key = %mapping.pattern_key,
            item_id = %item.id,
            confidence = mapping.confidence,
            "answered from learned mapping"
        );
        MatchResult {
            invoice_line: line.clone(),
            suggested_item: Some(item.clone()),
            final_score: mapping.confidence,
            tier: self.config.tiers.classify(mapping.confidence),
            breakdown,
            from_learning: true,
            mrp_status: line.mrp_status(item.master_mrp()),
            last_purchase: self.history.last_purchase(supplier, &item.id),
        }
    }

    /// Feed reviewer corrections into the learning store, in order.
    pub fn learn_from(&self, corrections: &[Correction]) -> LearnSummary {
        let mut summary = LearnSummary::default();
        let Some(store) = self.store.as_ref() else {
            tracing::warn!(
                corrections = corrections.len(),
                "no learning store configured, corrections dropped"
            );
            summary.failed = corrections.len();
            return summary;
        };

        for correction in corrections {
            if self.catalog.get(&correction.corrected_item_id).is_none() {
                tracing::warn!(
                    item_id = %correction.corrected_item_id,
                    "correction names an item outside the catalog, skipped"
                );
                summary.unknown_item += 1;
                continue;
            }
            let Some(key) = self.pattern_key(&correction.line) else {
                summary.empty_pattern += 1;
                continue;
            };
            match store.record_correction(
                &key,
                &correction.corrected_item_id,
                correction.confirmed_by_human,
                CorrectionAudit::from_correction(correction),
            ) {
                Ok(mapping) => {
                    tracing::debug!(
                        pattern_key = %key,
                        item_id = %mapping.item_id,
                        times_confirmed = mapping.times_confirmed,
                        confidence = mapping.confidence,
                        "learned correction"
                    );
                    summary.recorded += 1;
                }
                Err(err) => {
                    tracing::warn!(pattern_key = %key, error = %err, "failed to record correction");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            recorded = summary.recorded,
            unknown_item = summary.unknown_item,
            empty_pattern = summary.empty_pattern,
            failed = summary.failed,
            "processed corrections"
        );
        summary
    }
}

/// Supplier-specific mapping first, then one learned without a supplier.
fn lookup_learned(
    store: &dyn MappingStore,
    query: &NormalizedText,
    supplier: &str,
    skipped: &mut Vec<SkippedComponent>,
) -> Option<(PatternKey, LearnedMapping)> {
    let mut keys = vec![PatternKey::derive(&query.full, supplier).ok()?];
    if !supplier.is_empty() {
        keys.extend(PatternKey::derive(&query.full, "").ok());
    }
    for key in keys {
        match store.lookup(&key) {
            Ok(Some(mapping)) => return Some((key, mapping)),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "learning store unavailable, scoring instead");
                skipped.push(SkippedComponent::LearningStore);
                return None;
            }
        }
    }
    None
}
