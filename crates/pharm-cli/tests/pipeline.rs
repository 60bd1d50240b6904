use std::fs;
use std::path::{Path, PathBuf};

use pharm_cli::pipeline::{
    Settings, build_engine, default_output_path, open_match_store, open_store, review_queue,
};
use pharm_ingest::{load_corrections, write_results};
use pharm_model::{Correction, InvoiceLine, ItemId, SkippedComponent, Tier};
use tempfile::TempDir;

const CATALOG: &str = "\
Item Code,Item Name,B.Rate,S.Rate
P500,PANADOL TAB 500MG 24S,12.00,20.00
AMX250,AMOXIL CAP 250MG 20S,18.50,30.00
BR400,BRUFEN TAB 400MG 30S,9.75,15.00
";

const PURCHASES: &str = "\
Particulars,Supplier,Date.,P.Rate,Bill No.
PANADOL TAB 500MG 24S,City Pharma LLC,2024-03-01,12.00,B-1
BRUFEN TAB 400MG 30S,Gulf Drug Store,2024-02-11,9.75,B-2
";

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn defaults() -> Settings {
    Settings::load(None, None).expect("default settings")
}

fn panadol() -> InvoiceLine {
    InvoiceLine::new("City Pharma LLC", "Panadol Tab 500mg 24s")
        .with_quantities(10.0, 0.0)
        .with_unit_price(12.0)
}

#[test]
fn settings_default_without_files() {
    let settings = defaults();
    assert_eq!(settings.config.top_k, 10);
    assert!((settings.config.learning_threshold - 0.85).abs() < 1e-12);
}

#[test]
fn settings_read_partial_toml() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(&dir, "match.toml", "top_k = 3\n\n[tiers]\nauto_ok = 0.9\ncheck = 0.5\n");
    let settings = Settings::load(Some(&path), None).expect("load settings");
    assert_eq!(settings.config.top_k, 3);
    assert!((settings.config.tiers.auto_ok - 0.9).abs() < 1e-12);
    assert!((settings.config.learning_threshold - 0.85).abs() < 1e-12);
}

#[test]
fn settings_reject_invalid_config() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(&dir, "match.toml", "top_k = 0\n");
    let error = match Settings::load(Some(&path), None) {
        Ok(_) => panic!("top_k = 0 should be rejected"),
        Err(error) => error,
    };
    assert!(format!("{error:#}").contains("top_k"), "{error:#}");
}

#[test]
fn output_defaults_beside_the_invoice() {
    assert_eq!(
        default_output_path(Path::new("/data/march/invoice_0412.csv")),
        PathBuf::from("/data/march/invoice_0412_matched.csv")
    );
}

#[test]
fn pattern_key_ignores_spelling_noise() {
    let settings = defaults();
    let a = settings
        .pattern_key("Panadol Tab 500mg 24s", "City Pharma LLC")
        .expect("key");
    let b = settings
        .pattern_key("  PANADOL-tab 500MG, 24s ", "city pharma llc")
        .expect("key");
    assert_eq!(a, b);
    assert!(settings.pattern_key(" ... ", "City Pharma LLC").is_none());
}

#[test]
fn engine_uses_purchase_history() {
    let dir = TempDir::new().expect("temp dir");
    let catalog = write(&dir, "catalog.csv", CATALOG);
    let purchases = write(&dir, "purchases.csv", PURCHASES);
    let settings = defaults();

    let engine = build_engine(&settings, &catalog, Some(&purchases), None).expect("engine");
    let result = engine.match_line(&panadol());

    let suggested = result.suggested_item.as_ref().expect("suggestion");
    assert_eq!(suggested.id.as_str(), "P500");
    assert_eq!(result.breakdown.supplier_score, Some(1.0));
    let last = result.last_purchase.as_ref().expect("last purchase");
    assert_eq!(last.rate, Some(12.0));
}

#[test]
fn learned_corrections_survive_reopening_the_store() {
    let dir = TempDir::new().expect("temp dir");
    let catalog = write(&dir, "catalog.csv", CATALOG);
    let store_path = dir.path().join("learning.jsonl");
    let settings = defaults();

    {
        let store = open_store(&store_path, &settings).expect("store");
        let engine = build_engine(&settings, &catalog, None, Some(store)).expect("engine");
        let correction = Correction::new(panadol(), ItemId::new("P500").expect("id"));
        let summary = engine.learn_from(&[correction]);
        assert_eq!(summary.recorded, 1);
    }

    let store = open_store(&store_path, &settings).expect("reopen store");
    let engine = build_engine(&settings, &catalog, None, Some(store)).expect("engine");
    let result = engine.match_line(&panadol());
    assert!(result.from_learning);
    assert_eq!(result.tier, Tier::AutoOk);
    assert_eq!(
        result.suggested_item.as_ref().map(|item| item.id.as_str()),
        Some("P500")
    );
}

#[test]
fn forgetting_a_mapping_restores_scoring() {
    let dir = TempDir::new().expect("temp dir");
    let catalog = write(&dir, "catalog.csv", CATALOG);
    let store_path = dir.path().join("learning.jsonl");
    let settings = defaults();

    let store = open_store(&store_path, &settings).expect("store");
    let engine = build_engine(&settings, &catalog, None, Some(store.clone())).expect("engine");
    let correction = Correction::new(panadol(), ItemId::new("AMX250").expect("id"));
    assert_eq!(engine.learn_from(&[correction]).recorded, 1);
    assert!(engine.match_line(&panadol()).from_learning);

    let key = settings
        .pattern_key(&panadol().raw_item_name, &panadol().supplier)
        .expect("key");
    assert!(store.delete(&key, Some("wrong pack".to_string())).expect("delete"));
    assert!(!store.delete(&key, None).expect("second delete"));

    let result = engine.match_line(&panadol());
    assert!(!result.from_learning);
    assert_eq!(
        result.suggested_item.as_ref().map(|item| item.id.as_str()),
        Some("P500")
    );
}

#[test]
fn unreadable_store_degrades_matching_instead_of_failing() {
    let dir = TempDir::new().expect("temp dir");
    let catalog = write(&dir, "catalog.csv", CATALOG);
    let store_path = write(&dir, "learning.jsonl", "{oops\n{oops\n");
    let settings = defaults();

    assert!(open_store(&store_path, &settings).is_err());
    let store = open_match_store(&store_path, &settings);
    let engine = build_engine(&settings, &catalog, None, Some(store)).expect("engine");
    let result = engine.match_line(&panadol());

    assert!(!result.from_learning);
    assert!(result.breakdown.is_skipped(SkippedComponent::LearningStore));
    assert_eq!(
        result.suggested_item.as_ref().map(|item| item.id.as_str()),
        Some("P500")
    );
    // The broken journal is left as it was for someone to inspect.
    assert_eq!(fs::read_to_string(&store_path).expect("read"), "{oops\n{oops\n");
}

#[test]
fn reviewed_output_feeds_back_as_corrections() {
    let dir = TempDir::new().expect("temp dir");
    let catalog = write(&dir, "catalog.csv", CATALOG);
    let settings = defaults();
    let engine = build_engine(&settings, &catalog, None, None).expect("engine");

    let lines = vec![panadol(), InvoiceLine::new("City Pharma LLC", "Zzyzx Ointment")];
    let results = engine.match_all(&lines).expect("match");
    let output = dir.path().join("invoice_matched.csv");
    write_results(&output, &results).expect("write results");

    // Nobody reviewed the file yet: every Corrected_Item_Code is empty.
    let corrections = load_corrections(&output).expect("load corrections");
    assert!(corrections.is_empty());
}

#[test]
fn review_queue_lists_weakest_lines_first() {
    let dir = TempDir::new().expect("temp dir");
    let catalog = write(&dir, "catalog.csv", CATALOG);
    let settings = defaults();
    let engine = build_engine(&settings, &catalog, None, None).expect("engine");

    let lines = vec![
        panadol(),
        InvoiceLine::new("City Pharma LLC", "Zzyzx Ointment"),
        InvoiceLine::new("City Pharma LLC", "Brufen 400"),
    ];
    let results = engine.match_all(&lines).expect("match");
    let queue = review_queue(&results, 10);

    assert!(queue.iter().all(|result| result.tier != Tier::AutoOk));
    assert!(
        queue
            .windows(2)
            .all(|pair| pair[0].final_score <= pair[1].final_score)
    );
    assert_eq!(review_queue(&results, 1).len(), queue.len().min(1));
}
