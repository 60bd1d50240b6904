//! Tests for item-name normalization and vocabulary loading.

use std::fs;

use pharm_normalize::{Normalize, NormalizeError, Normalizer, Vocabulary};

fn default_normalizer() -> Normalizer {
    Normalizer::new(Vocabulary::default()).expect("default vocabulary")
}

#[test]
fn invoice_and_catalog_share_tokens() {
    let normalizer = default_normalizer();
    let invoice = normalizer.normalize("PANADOL 500MG 24S");
    let catalog = normalizer.normalize("PANADOL TAB 500MG 24S");

    assert_eq!(invoice.tokens, catalog.tokens);
    assert_eq!(invoice.fields.dosages, catalog.fields.dosages);
    assert_eq!(invoice.fields.pack_size, catalog.fields.pack_size);
    assert_eq!(invoice.fields.form, None);
    assert_eq!(catalog.fields.form.as_deref(), Some("TAB"));
}

#[test]
fn normalization_is_deterministic() {
    let normalizer = default_normalizer();
    let first = normalizer.normalize("Augmentin 625mg Tabs 14's");
    let second = normalizer.normalize("Augmentin 625mg Tabs 14's");
    assert_eq!(first, second);
}

#[test]
fn keeps_combination_dosages_in_order() {
    let text = default_normalizer().normalize("CO-AMOXICLAV 500MG/125MG TAB");
    assert_eq!(
        text.fields.dosages,
        vec!["500MG".to_string(), "125MG".to_string()]
    );
    assert_eq!(text.fields.form.as_deref(), Some("TAB"));
}

#[test]
fn decimal_dosage_survives_cleaning() {
    let text = default_normalizer().normalize("Calpol syrup 2.5 ml");
    assert_eq!(text.fields.dosages, vec!["2.5ML".to_string()]);
    assert_eq!(text.fields.form.as_deref(), Some("SYRUP"));
}

#[test]
fn supplier_normalization_uses_first_two_words() {
    let normalizer = default_normalizer();
    assert_eq!(
        normalizer.normalize_supplier("Gulf Drug Store LLC"),
        "GULF DRUG"
    );
}

#[test]
fn loads_vocabulary_from_toml() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("vocabulary.toml");
    fs::write(
        &path,
        r#"
dosage_units = ["mg", "ml"]
forms = ["tab", "strip"]
stopwords = ["forte"]

[abbreviations]
ibu = "ibuprofen"

[form_aliases]
tablets = "tab"
"#,
    )
    .expect("write vocabulary");

    let vocabulary = Vocabulary::load(&path).expect("load vocabulary");
    let normalizer = Normalizer::new(vocabulary).expect("normalizer");
    let text = normalizer.normalize("Ibu Forte 400mg tablets");

    assert_eq!(text.full, "IBUPROFEN FORTE 400MG TABLETS");
    assert_eq!(text.tokens, vec!["IBUPROFEN".to_string()]);
    assert_eq!(text.fields.form.as_deref(), Some("TAB"));
}

#[test]
fn malformed_vocabulary_reports_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "dosage_units = [").expect("write vocabulary");

    let err = Vocabulary::load(&path).unwrap_err();
    assert!(matches!(err, NormalizeError::Toml { .. }));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn missing_vocabulary_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = Vocabulary::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, NormalizeError::Io { .. }));
}
