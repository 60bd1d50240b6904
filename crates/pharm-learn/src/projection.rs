//! Current-mapping view derived from the event log.
//!
//! The projection is a pure fold over [`LearningEvent`]s: replaying the same
//! log always yields the same mappings. Each key keeps every item it was ever
//! corrected to (its variants); the active mapping is the variant with the
//! most human confirmations, ties going to the one written last.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pharm_model::{ItemId, LearnedMapping, PatternKey};

use crate::event::{EventKind, LearningEvent};
use crate::policy::LearningPolicy;

/// One candidate item for a pattern key.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub item_id: ItemId,
    pub times_confirmed: u64,
    pub times_seen: u64,
    /// Sequence of the last correction for this item; orders ties.
    pub last_correction: u64,
    pub last_updated: DateTime<Utc>,
}

impl Variant {
    fn outranks(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Greater
    }

    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.times_confirmed
            .cmp(&other.times_confirmed)
            .then(self.last_correction.cmp(&other.last_correction))
    }
}

/// What applying an event changed, for logging by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// First correction for the key.
    Created,
    /// Another correction for the item that is active afterwards.
    Reinforced,
    /// The correction disagrees with the active item after applying it.
    Conflict { active: ItemId, corrected: ItemId },
    /// The correction replaced the previously active item.
    Superseded { previous: ItemId },
    Seen,
    Deleted,
    /// Seen/deleted for a key or item with no mapping.
    Ignored,
}

/// Current state of every pattern key.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    keys: BTreeMap<PatternKey, Vec<Variant>>,
}

impl Projection {
    /// Fold a complete log.
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a LearningEvent>) -> Self {
        let mut projection = Self::default();
        for event in events {
            projection.apply(event);
        }
        projection
    }

    pub fn apply(&mut self, event: &LearningEvent) -> Applied {
        match &event.kind {
            EventKind::Correction {
                item_id,
                confirmed_by_human,
                ..
            } => self.apply_correction(event, item_id, *confirmed_by_human),
            EventKind::Seen { item_id } => {
                let Some(variant) = self
                    .keys
                    .get_mut(&event.pattern_key)
                    .and_then(|variants| variants.iter_mut().find(|v| &v.item_id == item_id))
                else {
                    return Applied::Ignored;
                };
                variant.times_seen += 1;
                variant.last_updated = event.at;
                Applied::Seen
            }
            EventKind::Deleted { .. } => {
                if self.keys.remove(&event.pattern_key).is_some() {
                    Applied::Deleted
                } else {
                    Applied::Ignored
                }
            }
        }
    }

    fn apply_correction(
        &mut self,
        event: &LearningEvent,
        item_id: &ItemId,
        confirmed_by_human: bool,
    ) -> Applied {
        let variants = self.keys.entry(event.pattern_key.clone()).or_default();
        let previous = active_variant(variants).map(|v| v.item_id.clone());

        match variants.iter_mut().find(|v| &v.item_id == item_id) {
            Some(variant) => {
                if confirmed_by_human {
                    variant.times_confirmed += 1;
                }
                variant.times_seen += 1;
                variant.last_correction = event.sequence;
                variant.last_updated = event.at;
            }
            None => variants.push(Variant {
                item_id: item_id.clone(),
                times_confirmed: u64::from(confirmed_by_human),
                times_seen: 1,
                last_correction: event.sequence,
                last_updated: event.at,
            }),
        }

        let Some(active) = active_variant(variants).map(|v| v.item_id.clone()) else {
            return Applied::Ignored;
        };
        match previous {
            None => Applied::Created,
            Some(_) if &active != item_id => Applied::Conflict {
                active,
                corrected: item_id.clone(),
            },
            Some(previous) if previous != active => Applied::Superseded { previous },
            Some(_) => Applied::Reinforced,
        }
    }

    /// Active mapping of a key, with confidence from `policy`.
    pub fn active(&self, key: &PatternKey, policy: &LearningPolicy) -> Option<LearnedMapping> {
        let variants = self.keys.get(key)?;
        active_variant(variants).map(|variant| to_mapping(key, variant, policy))
    }

    pub fn variants(&self, key: &PatternKey) -> &[Variant] {
        self.keys.get(key).map_or(&[], Vec::as_slice)
    }

    /// Active mapping of every key, in key order.
    pub fn active_mappings(&self, policy: &LearningPolicy) -> Vec<LearnedMapping> {
        self.keys
            .iter()
            .filter_map(|(key, variants)| {
                active_variant(variants).map(|variant| to_mapping(key, variant, policy))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn active_variant(variants: &[Variant]) -> Option<&Variant> {
    variants.iter().fold(None, |best, variant| match best {
        Some(current) if !variant.outranks(current) => Some(current),
        _ => Some(variant),
    })
}

fn to_mapping(key: &PatternKey, variant: &Variant, policy: &LearningPolicy) -> LearnedMapping {
    LearnedMapping {
        pattern_key: key.clone(),
        item_id: variant.item_id.clone(),
        confidence: policy.confidence_for(variant.times_confirmed),
        times_seen: variant.times_seen,
        times_confirmed: variant.times_confirmed,
        last_updated: variant.last_updated,
    }
}
