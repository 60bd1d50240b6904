//! Canonical catalog items.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::ItemId;

/// One item of the master catalog.
///
/// Loaded once per run and never mutated by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable item code.
    pub id: ItemId,
    /// Name as it appears in the master list.
    pub raw_name: String,
    /// Name after normalization (the text the candidate index is built on).
    pub normalized_name: String,
    /// Net purchase cost per unit, if known.
    pub buy_rate: Option<f64>,
    /// Net retail price (MRP without VAT), if known.
    pub sell_rate: Option<f64>,
}

impl CatalogItem {
    pub fn new(id: ItemId, raw_name: impl Into<String>, normalized_name: impl Into<String>) -> Self {
        Self {
            id,
            raw_name: raw_name.into(),
            normalized_name: normalized_name.into(),
            buy_rate: None,
            sell_rate: None,
        }
    }

    #[must_use]
    pub fn with_buy_rate(mut self, rate: f64) -> Self {
        self.buy_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn with_sell_rate(mut self, rate: f64) -> Self {
        self.sell_rate = Some(rate);
        self
    }

    /// Catalog MRP usable for a consistency check (present and positive).
    pub fn master_mrp(&self) -> Option<f64> {
        self.sell_rate.filter(|rate| rate.is_finite() && *rate > 0.0)
    }
}

/// Reject a catalog that cannot be matched against.
///
/// An empty catalog, a duplicated item id or an item without a name is a
/// boundary error; everything past this check is handled without failing.
pub fn validate_catalog(items: &[CatalogItem]) -> Result<()> {
    if items.is_empty() {
        return Err(ModelError::EmptyCatalog);
    }
    let mut seen = BTreeSet::new();
    for item in items {
        if item.raw_name.trim().is_empty() {
            return Err(ModelError::EmptyItemName {
                id: item.id.to_string(),
            });
        }
        if !seen.insert(&item.id) {
            return Err(ModelError::DuplicateItemId(item.id.to_string()));
        }
    }
    Ok(())
}
