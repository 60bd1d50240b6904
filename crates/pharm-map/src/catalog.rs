//! Catalog prepared for matching: normalized names plus the candidate index.

use std::collections::HashMap;

use pharm_model::{CatalogItem, ItemId};
use pharm_normalize::{Normalize, NormalizedText};

use crate::index::CandidateIndex;

/// A catalog item retrieved by the index for detailed scoring.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub item: &'a CatalogItem,
    pub name: &'a NormalizedText,
    /// Retrieval-stage cosine similarity.
    pub lexical_score: f64,
}

/// Read-only catalog shared by every matching worker.
#[derive(Debug, Clone, Default)]
pub struct IndexedCatalog {
    items: Vec<CatalogItem>,
    names: Vec<NormalizedText>,
    positions: HashMap<ItemId, usize>,
    index: CandidateIndex,
}

/// Text fed to the index: the matching tokens, or the full name when
/// extraction left nothing.
fn index_text(name: &NormalizedText) -> &str {
    if name.clean.is_empty() {
        &name.full
    } else {
        &name.clean
    }
}

impl IndexedCatalog {
    pub fn build(mut items: Vec<CatalogItem>, normalizer: &dyn Normalize) -> Self {
        let names: Vec<NormalizedText> = items
            .iter()
            .map(|item| normalizer.normalize(&item.raw_name))
            .collect();
        for (item, name) in items.iter_mut().zip(&names) {
            if item.normalized_name.is_empty() {
                item.normalized_name = name.full.clone();
            }
        }
        let positions = items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.id.clone(), position))
            .collect();
        let index = CandidateIndex::build(names.iter().map(index_text));
        Self {
            items,
            names,
            positions,
            index,
        }
    }

    /// Top-`k` candidates for a normalized query, best first.
    pub fn candidates(&self, query: &NormalizedText, k: usize) -> Vec<Candidate<'_>> {
        self.index
            .query(index_text(query), k)
            .into_iter()
            .map(|hit| Candidate {
                item: &self.items[hit.position],
                name: &self.names[hit.position],
                lexical_score: hit.score,
            })
            .collect()
    }

    pub fn get(&self, id: &ItemId) -> Option<&CatalogItem> {
        self.positions.get(id).map(|position| &self.items[*position])
    }

    /// Items with their normalized names, in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (&CatalogItem, &NormalizedText)> {
        self.items.iter().zip(&self.names)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
