//! Purchase-history signal.

use std::collections::HashMap;

use chrono::NaiveDate;
use pharm_model::{ItemId, LastPurchase};
use pharm_normalize::Normalize;
use serde::{Deserialize, Serialize};

use crate::catalog::IndexedCatalog;

/// Supplier evidence for a candidate item.
///
/// `supplier` is the simplified supplier name produced by
/// [`Normalize::normalize_supplier`].
pub trait SupplierSignal: Send + Sync {
    /// 1.0 if this supplier has supplied the item, 0.5 if any supplier has,
    /// 0.0 otherwise.
    fn supplier_score(&self, supplier: &str, item_id: &ItemId) -> f64;

    /// Most recent purchase of the item, preferring this supplier's.
    fn last_purchase(&self, _supplier: &str, _item_id: &ItemId) -> Option<LastPurchase> {
        None
    }
}

/// No purchase history available: every supplier score is 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl SupplierSignal for NoHistory {
    fn supplier_score(&self, _supplier: &str, _item_id: &ItemId) -> f64 {
        0.0
    }
}

/// One row of the purchase history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub supplier: String,
    pub item_name: String,
    pub date: Option<NaiveDate>,
    pub rate: Option<f64>,
}

/// Purchase history resolved against the catalog.
#[derive(Debug, Clone, Default)]
pub struct PurchaseHistory {
    by_supplier: HashMap<(ItemId, String), LastPurchase>,
    by_item: HashMap<ItemId, LastPurchase>,
    unresolved: usize,
}

impl PurchaseHistory {
    /// Resolve records to catalog items by normalized-name equality.
    ///
    /// Records naming no catalog item are counted and skipped. For each item
    /// the latest dated record wins; undated records only fill gaps.
    pub fn build(
        records: &[PurchaseRecord],
        catalog: &IndexedCatalog,
        normalizer: &dyn Normalize,
    ) -> Self {
        let mut by_name: HashMap<&str, &ItemId> = HashMap::new();
        for (item, name) in catalog.entries() {
            by_name.entry(name.full.as_str()).or_insert(&item.id);
        }

        let mut history = Self::default();
        for record in records {
            let name = normalizer.normalize(&record.item_name);
            let Some(item_id) = by_name.get(name.full.as_str()).copied() else {
                history.unresolved += 1;
                continue;
            };
            let supplier = normalizer.normalize_supplier(&record.supplier);
            let purchase = LastPurchase {
                supplier: record.supplier.trim().to_string(),
                date: record.date,
                rate: record.rate.filter(|rate| rate.is_finite()),
            };
            keep_latest(
                history
                    .by_supplier
                    .entry((item_id.clone(), supplier))
                    .or_insert_with(|| purchase.clone()),
                &purchase,
            );
            keep_latest(
                history
                    .by_item
                    .entry(item_id.clone())
                    .or_insert_with(|| purchase.clone()),
                &purchase,
            );
        }

        tracing::info!(
            records = records.len(),
            items = history.by_item.len(),
            unresolved = history.unresolved,
            "indexed purchase history"
        );
        history
    }

    /// Records that matched no catalog item.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }
}

fn keep_latest(current: &mut LastPurchase, candidate: &LastPurchase) {
    let newer = match (current.date, candidate.date) {
        (Some(current), Some(candidate)) => candidate >= current,
        (None, _) => true,
        (Some(_), None) => false,
    };
    if newer {
        *current = candidate.clone();
    }
}

impl SupplierSignal for PurchaseHistory {
    fn supplier_score(&self, supplier: &str, item_id: &ItemId) -> f64 {
        if self
            .by_supplier
            .contains_key(&(item_id.clone(), supplier.to_string()))
        {
            1.0
        } else if self.by_item.contains_key(item_id) {
            0.5
        } else {
            0.0
        }
    }

    fn last_purchase(&self, supplier: &str, item_id: &ItemId) -> Option<LastPurchase> {
        self.by_supplier
            .get(&(item_id.clone(), supplier.to_string()))
            .or_else(|| self.by_item.get(item_id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use pharm_model::CatalogItem;
    use pharm_normalize::{Normalizer, Vocabulary};

    use super::*;

    fn record(supplier: &str, name: &str, date: Option<&str>) -> PurchaseRecord {
        PurchaseRecord {
            supplier: supplier.to_string(),
            item_name: name.to_string(),
            date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            rate: Some(10.0),
        }
    }

    fn setup() -> (IndexedCatalog, Normalizer) {
        let normalizer = Normalizer::new(Vocabulary::default()).unwrap();
        let catalog = IndexedCatalog::build(
            vec![CatalogItem::new(ItemId::new("P1").unwrap(), "Panadol Tab 500mg 24s", "")],
            &normalizer,
        );
        (catalog, normalizer)
    }

    #[test]
    fn scores_by_supplier_then_any_supplier() {
        let (catalog, normalizer) = setup();
        let history = PurchaseHistory::build(
            &[record("City Pharma LLC", "PANADOL TAB 500MG 24S", Some("2024-01-01"))],
            &catalog,
            &normalizer,
        );
        let item = ItemId::new("P1").unwrap();
        assert_eq!(history.supplier_score("CITY PHARMA", &item), 1.0);
        assert_eq!(history.supplier_score("GULF DRUG", &item), 0.5);
        assert_eq!(
            history.supplier_score("CITY PHARMA", &ItemId::new("X").unwrap()),
            0.0
        );
    }

    #[test]
    fn keeps_latest_purchase() {
        let (catalog, normalizer) = setup();
        let history = PurchaseHistory::build(
            &[
                record("Gulf Drug", "Panadol tab 500mg 24s", Some("2024-03-01")),
                record("City Pharma", "Panadol tab 500mg 24s", Some("2024-01-01")),
                record("Nobody", "Unknown item", None),
            ],
            &catalog,
            &normalizer,
        );
        let item = ItemId::new("P1").unwrap();
        let last = history.last_purchase("OTHER", &item).unwrap();
        assert_eq!(last.supplier, "Gulf Drug");
        let own = history.last_purchase("CITY PHARMA", &item).unwrap();
        assert_eq!(own.supplier, "City Pharma");
        assert_eq!(history.unresolved(), 1);
    }
}
