//! Domain vocabulary consumed by the normalizer.
//!
//! The vocabulary is plain configuration: a built-in pharmaceutical default,
//! optionally replaced by a TOML file. Once handed to a
//! [`Normalizer`](crate::Normalizer) it is never mutated.
//!
//! # File format
//!
//! ```toml
//! dosage_units = ["MG", "ML", "MCG"]
//! forms = ["TAB", "CAP", "SYRUP"]
//! stopwords = ["THE", "AND"]
//!
//! [abbreviations]
//! PARACET = "PARACETAMOL"
//!
//! [form_aliases]
//! TABLETS = "TAB"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NormalizeError, Result};

const DOSAGE_UNITS: &[&str] = &[
    "MG",
    "GM",
    "G",
    "ML",
    "MCG",
    "IU",
    "UNIT",
    "UNITS",
    "MICROGRAM",
    "MILLIGRAM",
    "GRAM",
    "MILLILITRE",
    "LITRE",
];

const FORMS: &[&str] = &[
    "TAB",
    "TABS",
    "TABLET",
    "TABLETS",
    "CAP",
    "CAPS",
    "CAPSULE",
    "CAPSULES",
    "SYRUP",
    "SUSPENSION",
    "SUSP",
    "DROPS",
    "INJ",
    "INJECTION",
    "CREAM",
    "OINTMENT",
    "GEL",
    "LOTION",
    "SPRAY",
    "POWDER",
    "SACHET",
    "SACHETS",
    "SOLUTION",
    "SOL",
    "AMPOULE",
    "AMP",
    "VIAL",
    "SUPPOSITORY",
    "SUPP",
    "PESSARY",
];

const FORM_ALIASES: &[(&str, &str)] = &[
    ("TABLETS", "TAB"),
    ("TABLET", "TAB"),
    ("TABS", "TAB"),
    ("CAPSULES", "CAP"),
    ("CAPSULE", "CAP"),
    ("CAPS", "CAP"),
    ("SUSPENSION", "SUSP"),
    ("INJECTION", "INJ"),
    ("SOLUTION", "SOL"),
    ("AMPOULE", "AMP"),
    ("SUPPOSITORY", "SUPP"),
    ("SACHETS", "SACHET"),
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("CAL", "CALCIUM"),
    ("MAG", "MAGNESIUM"),
    ("VIT", "VITAMIN"),
    ("PARACET", "PARACETAMOL"),
    ("P-MOL", "PARACETAMOL"),
    ("PMOL", "PARACETAMOL"),
    ("IBUPROF", "IBUPROFEN"),
    ("DICLO", "DICLOFENAC"),
    ("AMOXI", "AMOXICILLIN"),
    ("AMOX", "AMOXICILLIN"),
    ("CEFU", "CEFUROXIME"),
    ("CEFURO", "CEFUROXIME"),
    ("CLAV", "CLAVULANIC"),
    ("ATORVA", "ATORVASTATIN"),
    ("ROSUVA", "ROSUVASTATIN"),
    ("MONTE", "MONTELUKAST"),
    ("LEVO", "LEVOCETIRIZINE"),
    ("CETIRIZ", "CETIRIZINE"),
    ("CETIRI", "CETIRIZINE"),
    ("LORA", "LORATADINE"),
    ("DEXA", "DEXAMETHASONE"),
    ("PRED", "PREDNISOLONE"),
    ("HYDRO", "HYDROCORTISONE"),
    ("DECONGEST", "DECONGESTANT"),
    ("ANTIHISTAM", "ANTIHISTAMINE"),
    ("SUPPL", "SUPPLEMENT"),
    ("MULTIVIT", "MULTIVITAMIN"),
];

const STOPWORDS: &[&str] = &[
    "THE", "AND", "WITH", "FOR", "PLUS", "NEW", "ADVANCED", "EXTRA", "SUPER", "MAXIMUM",
    "ORIGINAL", "REGULAR",
];

/// Abbreviations, units, forms and stopwords used by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Units recognised after a number in a dosage (`500MG`).
    pub dosage_units: Vec<String>,
    /// Pharmaceutical forms (`TAB`, `SYRUP`).
    pub forms: Vec<String>,
    /// Words dropped from the matching tokens.
    #[serde(default)]
    pub stopwords: BTreeSet<String>,
    /// Token expansions applied before extraction.
    #[serde(default)]
    pub abbreviations: BTreeMap<String, String>,
    /// Spellings of a form mapped to its canonical code.
    #[serde(default)]
    pub form_aliases: BTreeMap<String, String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            dosage_units: DOSAGE_UNITS.iter().map(|s| (*s).to_string()).collect(),
            forms: FORMS.iter().map(|s| (*s).to_string()).collect(),
            stopwords: STOPWORDS.iter().map(|s| (*s).to_string()).collect(),
            abbreviations: pairs(ABBREVIATIONS),
            form_aliases: pairs(FORM_ALIASES),
        }
    }
}

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
        .collect()
}

impl Vocabulary {
    /// Load a vocabulary from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| NormalizeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let vocabulary: Self =
            toml::from_str(&contents).map_err(|source| NormalizeError::Toml {
                path: path.to_path_buf(),
                source,
            })?;
        let vocabulary = vocabulary.canonicalized()?;
        tracing::debug!(
            path = %path.display(),
            units = vocabulary.dosage_units.len(),
            forms = vocabulary.forms.len(),
            abbreviations = vocabulary.abbreviations.len(),
            "loaded vocabulary"
        );
        Ok(vocabulary)
    }

    /// Upper-case every entry and check the vocabulary is usable.
    pub fn canonicalized(self) -> Result<Self> {
        let upper = |s: String| s.trim().to_uppercase();
        let vocabulary = Self {
            dosage_units: self
                .dosage_units
                .into_iter()
                .map(upper)
                .filter(|s| !s.is_empty())
                .collect(),
            forms: self
                .forms
                .into_iter()
                .map(upper)
                .filter(|s| !s.is_empty())
                .collect(),
            stopwords: self.stopwords.into_iter().map(upper).collect(),
            abbreviations: self
                .abbreviations
                .into_iter()
                .map(|(k, v)| (upper(k), upper(v)))
                .collect(),
            form_aliases: self
                .form_aliases
                .into_iter()
                .map(|(k, v)| (upper(k), upper(v)))
                .collect(),
        };
        if vocabulary.dosage_units.is_empty() {
            return Err(NormalizeError::InvalidVocabulary {
                message: "dosage_units must not be empty".to_string(),
            });
        }
        if let Some(unit) = vocabulary
            .dosage_units
            .iter()
            .find(|unit| !unit.chars().all(|ch| ch.is_ascii_alphabetic()))
        {
            return Err(NormalizeError::InvalidVocabulary {
                message: format!("dosage unit '{unit}' must be alphabetic"),
            });
        }
        Ok(vocabulary)
    }

    /// Canonical form code for a token, if the token names a form.
    pub fn canonical_form(&self, token: &str) -> Option<String> {
        if let Some(alias) = self.form_aliases.get(token) {
            return Some(alias.clone());
        }
        self.forms
            .iter()
            .any(|form| form == token)
            .then(|| token.to_string())
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn is_unit(&self, token: &str) -> bool {
        self.dosage_units.iter().any(|unit| unit == token)
    }

    pub fn expand<'a>(&'a self, token: &'a str) -> &'a str {
        self.abbreviations
            .get(token)
            .map_or(token, String::as_str)
    }
}
