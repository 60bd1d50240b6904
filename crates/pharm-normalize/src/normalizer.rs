//! Raw item text to canonical tokens and extracted fields.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vocabulary::Vocabulary;

/// Characters replaced by a space during cleaning. `+` is kept because it
/// separates components of combination products.
const PUNCTUATION: &[char] = &['*', ',', '.', '-', '/', '(', ')', '%', '\'', '"', '&'];

/// Number of words of a supplier name kept for keys and history lookups.
const SUPPLIER_WORDS: usize = 2;

/// Structured fields pulled out of an item name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Dosages in order of appearance, e.g. `["500MG", "5ML"]`.
    pub dosages: Vec<String>,
    /// Canonical form code, e.g. `TAB`.
    pub form: Option<String>,
    /// Pack size digits, e.g. `24` for `24S`.
    pub pack_size: Option<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.dosages.is_empty() && self.form.is_none() && self.pack_size.is_none()
    }
}

/// Normalizer output for one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText {
    /// Cleaned text with abbreviations expanded; nothing removed.
    pub full: String,
    /// Matching tokens joined by single spaces.
    pub clean: String,
    /// Tokens left after removing dosage, form, pack size and stopwords.
    pub tokens: Vec<String>,
    pub fields: ExtractedFields,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

/// The normalization contract the matcher depends on.
pub trait Normalize: Send + Sync {
    fn normalize(&self, raw: &str) -> NormalizedText;

    /// Canonical supplier name used in pattern keys and history lookups.
    fn normalize_supplier(&self, raw: &str) -> String {
        simplify_supplier(raw)
    }
}

/// Vocabulary-driven normalizer for pharmaceutical item names.
#[derive(Debug, Clone)]
pub struct Normalizer {
    vocabulary: Vocabulary,
    dosage: Regex,
}

impl Normalizer {
    pub fn new(vocabulary: Vocabulary) -> Result<Self> {
        let vocabulary = vocabulary.canonicalized()?;
        let mut units = vocabulary.dosage_units.clone();
        // Longest first so `MG` never shadows `MGS`-style longer units.
        units.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        units.dedup();
        let dosage = Regex::new(&format!(r"^(\d+(?:\.\d+)?)({})$", units.join("|")))?;
        Ok(Self { vocabulary, dosage })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn expand_tokens(&self, cleaned: &str) -> Vec<String> {
        cleaned
            .split_whitespace()
            .flat_map(|token| self.vocabulary.expand(token).split_whitespace())
            .map(str::to_string)
            .collect()
    }
}

impl Normalize for Normalizer {
    fn normalize(&self, raw: &str) -> NormalizedText {
        let tokens = self.expand_tokens(&clean_basic(raw));
        let full = tokens.join(" ");
        let mut consumed = vec![false; tokens.len()];
        let mut fields = ExtractedFields::default();

        let mut idx = 0;
        while idx < tokens.len() {
            let token = &tokens[idx];
            if let Some(caps) = self.dosage.captures(token) {
                fields.dosages.push(format!("{}{}", &caps[1], &caps[2]));
                consumed[idx] = true;
            } else if is_number(token)
                && let Some(unit) = tokens.get(idx + 1)
                && self.vocabulary.is_unit(unit)
            {
                fields.dosages.push(format!("{token}{unit}"));
                consumed[idx] = true;
                consumed[idx + 1] = true;
                idx += 1;
            }
            idx += 1;
        }

        for (idx, token) in tokens.iter().enumerate() {
            if consumed[idx] {
                continue;
            }
            if let Some(form) = self.vocabulary.canonical_form(token) {
                fields.form.get_or_insert(form);
                consumed[idx] = true;
            }
        }

        extract_pack_size(&tokens, &mut consumed, &mut fields);

        let kept: Vec<String> = tokens
            .iter()
            .zip(&consumed)
            .filter(|(token, used)| !**used && !self.vocabulary.is_stopword(token))
            .map(|(token, _)| token.clone())
            .collect();

        NormalizedText {
            full,
            clean: kept.join(" "),
            tokens: kept,
            fields,
        }
    }
}

/// Pack size is a trailing count such as `24S`, `24 S` (from `24'S`) or `24`.
fn extract_pack_size(tokens: &[String], consumed: &mut [bool], fields: &mut ExtractedFields) {
    let Some(last) = tokens.len().checked_sub(1) else {
        return;
    };
    if consumed[last] {
        return;
    }
    let count = tokens[last].strip_suffix('S').unwrap_or(&tokens[last]);
    if is_digits(count) {
        fields.pack_size = Some(count.to_string());
        consumed[last] = true;
        return;
    }
    if tokens[last] == "S"
        && let Some(prev) = last.checked_sub(1)
        && !consumed[prev]
        && is_digits(&tokens[prev])
    {
        fields.pack_size = Some(tokens[prev].clone());
        consumed[prev] = true;
        consumed[last] = true;
    }
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|ch| ch.is_ascii_digit())
}

/// Integer or decimal such as `500` or `2.5`.
fn is_number(token: &str) -> bool {
    match token.split_once('.') {
        Some((whole, fraction)) => is_digits(whole) && is_digits(fraction),
        None => is_digits(token),
    }
}

/// Upper-case, replace punctuation with spaces and collapse whitespace.
///
/// A `.` between two digits is kept so decimal dosages survive.
pub fn clean_basic(raw: &str) -> String {
    let chars: Vec<char> = raw.to_uppercase().chars().collect();
    let mut out = String::with_capacity(chars.len());
    for (idx, &ch) in chars.iter().enumerate() {
        let decimal_point = ch == '.'
            && idx > 0
            && chars[idx - 1].is_ascii_digit()
            && chars.get(idx + 1).is_some_and(char::is_ascii_digit);
        if PUNCTUATION.contains(&ch) && !decimal_point {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned supplier name cut to its first two words.
pub fn simplify_supplier(raw: &str) -> String {
    clean_basic(raw)
        .split_whitespace()
        .take(SUPPLIER_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}
