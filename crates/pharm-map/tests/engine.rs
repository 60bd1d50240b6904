//! End-to-end tests for the matching engine.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pharm_learn::{CorrectionAudit, LearnError, LearningPolicy, LearningStore, MappingStore};
use pharm_map::{MatchConfig, MatchEngine, MatchError, SignalScorer, TierThresholds, weigh};
use pharm_model::{
    CatalogItem, Correction, InvoiceLine, ItemId, LearnedMapping, ModelError, PatternKey,
    ScoreSource, SignalVector, SkippedComponent, Tier, WeightingRegime,
};
use pharm_normalize::{Normalize, NormalizedText, Normalizer, Vocabulary};
use proptest::prelude::*;
use tracing::Level;

fn normalizer() -> Arc<dyn Normalize> {
    Arc::new(Normalizer::new(Vocabulary::default()).expect("default vocabulary"))
}

fn id(value: &str) -> ItemId {
    ItemId::new(value).expect("item id")
}

fn item(code: &str, name: &str) -> CatalogItem {
    CatalogItem::new(id(code), name, "")
}

fn catalog() -> Vec<CatalogItem> {
    vec![
        item("P500", "Panadol Tab 500mg 24s").with_buy_rate(10.0),
        item("PX", "Panadol Extra Tab 500mg 24s").with_buy_rate(14.0),
        item("BR400", "Brufen Tab 400mg 30s").with_buy_rate(8.0),
        item("AMX250", "Amoxil Cap 250mg 20s").with_buy_rate(6.5),
    ]
}

fn engine(config: MatchConfig) -> MatchEngine {
    MatchEngine::new(catalog(), normalizer(), config).expect("engine")
}

fn panadol_line() -> InvoiceLine {
    InvoiceLine::new("City Pharma LLC", "PANADOL TAB 500MG 24S")
        .with_quantities(1.0, 0.0)
        .with_unit_price(12.0)
}

/// Returns the same signals for every pair.
struct FixedScorer(f64);

impl SignalScorer for FixedScorer {
    fn score(&self, _query: &NormalizedText, _candidate: &NormalizedText) -> SignalVector {
        SignalVector {
            sequence: self.0,
            edit_distance: self.0,
            token_overlap: self.0,
            phonetic: self.0,
            component_bonus: self.0,
        }
    }
}

/// Counts how often scoring was requested.
#[derive(Default)]
struct CountingScorer {
    calls: AtomicUsize,
}

impl SignalScorer for CountingScorer {
    fn score(&self, _query: &NormalizedText, _candidate: &NormalizedText) -> SignalVector {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SignalVector::default()
    }
}

/// A store whose backend is down.
struct FailingStore;

impl FailingStore {
    fn down() -> LearnError {
        LearnError::Unavailable {
            reason: "backend offline".to_string(),
        }
    }
}

impl MappingStore for FailingStore {
    fn lookup(&self, _key: &PatternKey) -> pharm_learn::Result<Option<LearnedMapping>> {
        Err(Self::down())
    }

    fn record_seen(&self, _key: &PatternKey, _item_id: &ItemId) -> pharm_learn::Result<()> {
        Err(Self::down())
    }

    fn record_correction(
        &self,
        _key: &PatternKey,
        _item_id: &ItemId,
        _confirmed_by_human: bool,
        _audit: CorrectionAudit,
    ) -> pharm_learn::Result<LearnedMapping> {
        Err(Self::down())
    }

    fn export_all(&self) -> pharm_learn::Result<Vec<LearnedMapping>> {
        Err(Self::down())
    }
}

fn learning_store() -> Arc<LearningStore> {
    Arc::new(LearningStore::in_memory(LearningPolicy::default()).expect("store"))
}

#[test]
fn fixed_signals_with_near_cost_land_in_check() {
    let mut config = MatchConfig::default();
    config.cost.near_score = 0.8;
    let engine = engine(config).with_scorer(Arc::new(FixedScorer(0.9)));

    let result = engine.match_line(&panadol_line());

    // 0.55 * 0.9 + 0.30 * 0 + 0.15 * 0.8
    assert!((result.final_score - 0.615).abs() < 1e-9, "{}", result.final_score);
    assert_eq!(result.tier, Tier::Check);
    assert_eq!(result.breakdown.regime, Some(WeightingRegime::WithoutMrp));
    assert_eq!(result.breakdown.supplier_score, Some(0.0));
    assert_eq!(result.breakdown.cost_score, Some(0.8));
    assert!(result.breakdown.is_skipped(SkippedComponent::MrpConsistency));
    assert!(!result.from_learning);
}

#[test]
fn ensemble_prefers_the_exact_product() {
    let engine = engine(MatchConfig::default());
    let line = InvoiceLine::new("City Pharma", "PANADOL TAB 500MG 24S")
        .with_quantities(2.0, 0.0)
        .with_unit_price(10.0);

    let result = engine.match_line(&line);

    let suggested = result.suggested_item.as_ref().expect("suggestion");
    assert_eq!(suggested.id, id("P500"));
    assert_eq!(result.breakdown.source, ScoreSource::Ensemble);
    let signals = result.breakdown.signals.expect("signals");
    for (label, value) in signals.labelled() {
        assert!(value > 0.7, "{label} = {value}");
    }
    let name = result.breakdown.name_score.expect("name score");
    assert_eq!(result.breakdown.cost_score, Some(1.0));
    assert!((result.final_score - (0.55 * name + 0.15)).abs() < 1e-9);
    // Without supplier history the no-MRP ceiling is 0.70.
    assert_eq!(result.tier, Tier::Check);
    assert!(result.breakdown.candidates_considered >= 2);
}

#[test]
fn mrp_on_both_sides_selects_the_mrp_regime() {
    let items = vec![
        item("P500", "Panadol Tab 500mg 24s")
            .with_buy_rate(10.0)
            .with_sell_rate(20.0),
    ];
    let engine = MatchEngine::new(items, normalizer(), MatchConfig::default()).unwrap();
    let line = panadol_line().with_mrp(21.0, Some(5.0));

    let result = engine.match_line(&line);

    assert_eq!(result.breakdown.regime, Some(WeightingRegime::WithMrp));
    let mrp = result.breakdown.mrp_score.expect("mrp score");
    assert!((mrp - 1.0).abs() < 1e-9, "{mrp}");
    assert!(!result.breakdown.is_skipped(SkippedComponent::MrpConsistency));
    assert!(result.mrp_status.is_some());
}

#[test]
fn trusted_learned_mapping_skips_scoring() {
    let scorer = Arc::new(CountingScorer::default());
    let store = learning_store();
    let engine = engine(MatchConfig::default())
        .with_scorer(scorer.clone())
        .with_store(store.clone());

    let line = panadol_line();
    let summary = engine.learn_from(&[Correction::new(line.clone(), id("PX"))]);
    assert_eq!(summary.recorded, 1);

    let result = engine.match_line(&line);

    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    assert!(result.from_learning);
    assert_eq!(result.suggested_item.unwrap().id, id("PX"));
    assert_eq!(result.breakdown.source, ScoreSource::Learned);
    assert!(result.breakdown.is_skipped(SkippedComponent::Ensemble));
    assert!((result.final_score - 0.90).abs() < 1e-9);
    assert_eq!(result.tier, Tier::AutoOk);

    let key = engine.pattern_key(&line).unwrap();
    let mapping = store.lookup(&key).unwrap().unwrap();
    assert_eq!(mapping.times_seen, 2);
}

#[test]
fn untrusted_learned_mapping_falls_back_to_scoring() {
    let scorer = Arc::new(CountingScorer::default());
    let store = learning_store();
    let engine = engine(MatchConfig::default())
        .with_scorer(scorer.clone())
        .with_store(store);

    let line = panadol_line();
    let mut correction = Correction::new(line.clone(), id("PX"));
    correction.confirmed_by_human = false;
    engine.learn_from(&[correction]);

    let result = engine.match_line(&line);

    assert!(!result.from_learning);
    assert!(scorer.calls.load(Ordering::SeqCst) > 0);
}

#[test]
fn store_outage_degrades_to_scoring() {
    let engine = engine(MatchConfig::default()).with_store(Arc::new(FailingStore));

    let result = engine.match_line(&panadol_line());

    assert_eq!(result.breakdown.source, ScoreSource::Ensemble);
    assert!(result.breakdown.is_skipped(SkippedComponent::LearningStore));
    assert!(result.suggested_item.is_some());

    let summary = engine.learn_from(&[Correction::new(panadol_line(), id("P500"))]);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.recorded, 0);
}

#[test]
fn learned_item_missing_from_catalog_is_ignored() {
    let store = learning_store();
    let first = engine(MatchConfig::default()).with_store(store.clone());
    let line = panadol_line();
    let key = first.pattern_key(&line).unwrap();
    store
        .record_correction(&key, &id("DISCONTINUED"), true, CorrectionAudit::default())
        .unwrap();

    let result = first.match_line(&line);

    assert!(!result.from_learning);
    assert_eq!(result.breakdown.source, ScoreSource::Ensemble);
    assert_eq!(result.suggested_item.unwrap().id, id("P500"));
}

#[test]
fn learn_from_rejects_unknown_items_and_empty_patterns() {
    let engine = engine(MatchConfig::default()).with_store(learning_store());
    let summary = engine.learn_from(&[
        Correction::new(panadol_line(), id("NOPE")),
        Correction::new(InvoiceLine::new("City Pharma", " -- "), id("P500")),
        Correction::new(panadol_line(), id("P500")),
    ]);
    assert_eq!(summary.unknown_item, 1);
    assert_eq!(summary.empty_pattern, 1);
    assert_eq!(summary.recorded, 1);
    assert_eq!(summary.failed, 0);
}

#[test]
fn learn_from_without_store_drops_everything() {
    let engine = engine(MatchConfig::default());
    let summary = engine.learn_from(&[Correction::new(panadol_line(), id("P500"))]);
    assert_eq!(summary.failed, 1);
}

#[test]
fn matching_is_deterministic_and_keeps_input_order() {
    let engine = engine(MatchConfig::default());
    let lines = vec![
        InvoiceLine::new("A", "BRUFEN 400 MG TABLETS"),
        panadol_line(),
        InvoiceLine::new("B", "amoxil capsules 250mg"),
        InvoiceLine::new("C", "PANADOL EXTRA TAB"),
    ];

    let first = engine.match_all(&lines).unwrap();
    let second = engine.match_all(&lines).unwrap();

    assert_eq!(first, second);
    for (line, result) in lines.iter().zip(&first) {
        assert_eq!(&result.invoice_line, line);
    }
    assert_eq!(first[0].suggested_item.as_ref().unwrap().id, id("BR400"));
    assert_eq!(first[2].suggested_item.as_ref().unwrap().id, id("AMX250"));
}

#[test]
fn observer_sees_every_line() {
    let engine = engine(MatchConfig::default());
    let seen = AtomicUsize::new(0);
    let lines = vec![panadol_line(); 5];
    engine
        .match_all_with(&lines, |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[test]
fn exact_duplicate_is_retrieved_from_a_large_catalog() {
    let syllables = ["AL", "BE", "CO", "DI", "FU", "GA", "LO", "MI", "NE", "RO", "SA", "TI"];
    let mut items = Vec::new();
    for (i, a) in syllables.iter().enumerate() {
        for (j, b) in syllables.iter().enumerate() {
            for (k, c) in syllables.iter().take(3).enumerate() {
                let code = format!("G{i}-{j}-{k}");
                items.push(item(&code, &format!("{a}{b}{c}L TAB {}MG", 50 * (k + 1))));
            }
        }
    }
    items.push(item("TARGET", "Ciprofloxacin Tab 500mg 10s"));
    let engine = MatchEngine::new(items, normalizer(), MatchConfig::default()).unwrap();

    let query = engine.normalizer().normalize("CIPROFLOXACIN TAB 500MG 10S");
    let candidates = engine.catalog().candidates(&query, 10);

    assert!(candidates.iter().any(|c| c.item.id == id("TARGET")));
    let result = engine.match_line(&InvoiceLine::new("X", "CIPROFLOXACIN TAB 500MG 10S"));
    assert_eq!(result.suggested_item.unwrap().id, id("TARGET"));
}

#[test]
fn empty_catalog_is_a_boundary_error() {
    let err = MatchEngine::new(Vec::new(), normalizer(), MatchConfig::default())
        .err()
        .expect("empty catalog must fail");
    assert!(matches!(err, MatchError::Boundary(ModelError::EmptyCatalog)));
}

#[test]
fn empty_invoice_is_a_boundary_error() {
    let err = engine(MatchConfig::default()).match_all(&[]).unwrap_err();
    assert!(matches!(err, MatchError::Boundary(ModelError::EmptyInvoice)));
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = MatchConfig::default();
    config.tiers.auto_ok = 1.5;
    let err = MatchEngine::new(catalog(), normalizer(), config)
        .err()
        .expect("invalid config must fail");
    assert!(matches!(err, MatchError::InvalidConfig { .. }));
}

#[test]
fn line_without_text_has_no_candidates() {
    let result = engine(MatchConfig::default()).match_line(&InvoiceLine::new("A", " ... "));
    assert_eq!(result.tier, Tier::NoMatch);
    assert_eq!(result.breakdown.source, ScoreSource::NoCandidates);
    assert!(result.suggested_item.is_none());
    assert_eq!(result.final_score, 0.0);
}

#[test]
fn learned_breakdown_snapshot() {
    let engine = engine(MatchConfig::default()).with_store(learning_store());
    let line = panadol_line();
    engine.learn_from(&[Correction::new(line.clone(), id("P500"))]);
    let result = engine.match_line(&line);

    let summary = serde_json::json!({
        "source": result.breakdown.source,
        "tier": result.tier,
        "skipped": result.breakdown.skipped,
        "explain": result.breakdown.explain(),
        "suggested": result.suggested_item.map(|item| item.id),
    });
    insta::assert_json_snapshot!(summary, @r#"
    {
      "explain": "LEARNED (confirmed 1x, confidence 0.90) [ensemble bypassed by learned mapping]",
      "skipped": [
        "ensemble"
      ],
      "source": "learned",
      "suggested": "P500",
      "tier": "AUTO_OK"
    }
    "#);
}

#[test]
fn mapping_learned_without_supplier_answers_every_supplier() {
    let store = learning_store();
    let engine = engine(MatchConfig::default()).with_store(store);
    let correction = Correction::new(InvoiceLine::new("", "PNDL XTRA 500"), id("PX"));
    let summary = engine.learn_from(&[correction]);
    assert_eq!(summary.recorded, 1);

    let result = engine.match_line(&InvoiceLine::new("City Pharma LLC", "pndl xtra 500"));

    assert!(result.from_learning);
    assert_eq!(result.suggested_item.unwrap().id, id("PX"));
}

#[test]
fn supplier_mapping_wins_over_one_without_supplier() {
    let store = learning_store();
    let engine = engine(MatchConfig::default()).with_store(store);
    let summary = engine.learn_from(&[
        Correction::new(InvoiceLine::new("", "PNDL 500"), id("PX")),
        Correction::new(InvoiceLine::new("City Pharma LLC", "PNDL 500"), id("P500")),
    ]);
    assert_eq!(summary.recorded, 2);

    let city = engine.match_line(&InvoiceLine::new("City Pharma LLC", "PNDL 500"));
    let other = engine.match_line(&InvoiceLine::new("Gulf Drug Store", "PNDL 500"));

    assert_eq!(city.suggested_item.unwrap().id, id("P500"));
    assert_eq!(other.suggested_item.unwrap().id, id("PX"));
    assert!(other.from_learning);
}

#[test]
fn concurrent_learned_hits_are_all_recorded() {
    let store = learning_store();
    let engine = engine(MatchConfig::default()).with_store(store.clone());
    let line = panadol_line();
    engine.learn_from(&[Correction::new(line.clone(), id("PX"))]);

    let lines = vec![line.clone(); 64];
    let results = engine.match_all(&lines).unwrap();

    assert!(results.iter().all(|result| result.from_learning));
    assert_eq!(store.event_count(), 65);
    let sequences: Vec<u64> = store.events().unwrap().iter().map(|e| e.sequence).collect();
    assert!(sequences.windows(2).all(|pair| pair[1] == pair[0] + 1));
    let key = engine.pattern_key(&line).unwrap();
    assert_eq!(store.lookup(&key).unwrap().unwrap().times_seen, 65);
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn trace_logs_leave_out_item_text() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let engine = engine(MatchConfig::default());

    let result = tracing::subscriber::with_default(subscriber, || {
        engine.match_line(&panadol_line())
    });

    assert!(result.suggested_item.is_some());
    let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("normalized line"), "{output}");
    assert!(!output.to_uppercase().contains("PANADOL"), "{output}");
}

proptest! {
    #[test]
    fn final_score_stays_in_unit_range(
        name in 0.0f64..=1.0,
        supplier in 0.0f64..=1.0,
        mrp in proptest::option::of(0.0f64..=1.0),
        cost in proptest::option::of(0.0f64..=1.0),
    ) {
        let (regime, score) = weigh(name, supplier, mrp, cost);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(regime, WeightingRegime::select(mrp.is_some()));
        prop_assert!((regime.weights().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn better_name_never_lowers_the_score(
        low in 0.0f64..=1.0,
        delta in 0.0f64..=1.0,
        supplier in 0.0f64..=1.0,
        mrp in proptest::option::of(0.0f64..=1.0),
    ) {
        let high = (low + delta).min(1.0);
        let (_, a) = weigh(low, supplier, mrp, None);
        let (_, b) = weigh(high, supplier, mrp, None);
        prop_assert!(b + 1e-12 >= a);
    }

    #[test]
    fn tiers_are_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let tiers = TierThresholds::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(tiers.classify(high) <= tiers.classify(low));
    }
}
