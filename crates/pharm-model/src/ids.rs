#![deny(unsafe_code)]

use std::fmt;

use crate::ModelError;

/// Stable identifier of a catalog item (the catalog's item code).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyItemId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Separator between the text and supplier halves of a [`PatternKey`].
pub const PATTERN_KEY_SEPARATOR: char = '|';

/// Lookup key of a learned mapping.
///
/// Derived from the normalized invoice text and the simplified supplier name,
/// so two invoice lines that normalize identically for the same supplier hit
/// the same key. Both halves are upper-cased and whitespace-collapsed here as
/// well, which keeps the key stable even if a caller skips normalization.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PatternKey(String);

impl PatternKey {
    pub fn derive(normalized_text: &str, supplier: &str) -> Result<Self, ModelError> {
        let text = canonical(normalized_text);
        if text.is_empty() {
            return Err(ModelError::EmptyPatternKey);
        }
        let supplier = canonical(supplier);
        Ok(Self(format!("{text}{PATTERN_KEY_SEPARATOR}{supplier}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The normalized-text half of the key.
    pub fn text(&self) -> &str {
        self.0
            .split_once(PATTERN_KEY_SEPARATOR)
            .map_or(self.0.as_str(), |(text, _)| text)
    }

    /// The supplier half of the key (empty when the line had no supplier).
    pub fn supplier(&self) -> &str {
        self.0
            .split_once(PATTERN_KEY_SEPARATOR)
            .map_or("", |(_, supplier)| supplier)
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical(raw: &str) -> String {
    raw.replace(PATTERN_KEY_SEPARATOR, " ")
        .split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_trims_and_rejects_blank() {
        assert_eq!(ItemId::new("  A100 ").unwrap().as_str(), "A100");
        assert_eq!(ItemId::new("   "), Err(ModelError::EmptyItemId));
    }

    #[test]
    fn pattern_key_is_canonical() {
        let a = PatternKey::derive("panadol  500mg", "City Pharma").unwrap();
        let b = PatternKey::derive("PANADOL 500MG", " city   pharma ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "PANADOL 500MG|CITY PHARMA");
        assert_eq!(a.text(), "PANADOL 500MG");
        assert_eq!(a.supplier(), "CITY PHARMA");
    }

    #[test]
    fn pattern_key_allows_missing_supplier() {
        let key = PatternKey::derive("PANADOL", "").unwrap();
        assert_eq!(key.as_str(), "PANADOL|");
        assert_eq!(key.supplier(), "");
    }

    #[test]
    fn pattern_key_rejects_empty_text() {
        assert_eq!(
            PatternKey::derive("  ", "SUPPLIER"),
            Err(ModelError::EmptyPatternKey)
        );
    }

    #[test]
    fn separator_inside_text_does_not_split_key() {
        let key = PatternKey::derive("A|B", "S").unwrap();
        assert_eq!(key.text(), "A B");
        assert_eq!(key.supplier(), "S");
    }
}
