//! Property indexes.
//!
//! Each `(label, property)` index is physically split in two: a number index
//! ("boost") that keeps numeric keys exact, and a generic index ("fallback")
//! for every other value family. [`DualIndexReader`] puts them back together
//! behind one [`pullgraph_api::IndexReader`].

use std::collections::BTreeSet;
use std::ops::Bound;

use pullgraph_api::{Error, IndexQuery, InternalNodeId, PropertyValue, Result, ValueGroupSet};

mod dual;
mod generic;
mod number;
pub mod ordered_key;

pub use dual::{DualIndexReader, DualIndexSampler};
pub use generic::{GenericIndexReader, GenericIndexSampler};
pub use number::{NumberIndexReader, NumberIndexSampler, NumberKey};

use crate::stats::ResourceTracker;
use generic::GenericEntries;
use number::NumberEntries;

/// Whether a value tuple belongs to the boost reader.
///
/// A tuple goes to boost iff it is non-empty and every value is covered by
/// `boost_groups`. Entries are stored by the same rule, so a lookup always
/// reaches the reader that holds the entry.
pub fn routes_to_boost(boost_groups: ValueGroupSet, values: &[PropertyValue]) -> bool {
    !values.is_empty() && boost_groups.covers_all(values)
}

/// Entries of one `(label, property)` index.
#[derive(Debug, Default)]
pub(crate) struct PropertyIndex {
    numbers: NumberEntries,
    others: GenericEntries,
}

impl PropertyIndex {
    /// Null is not indexed.
    pub(crate) fn insert(&mut self, node: InternalNodeId, value: &PropertyValue) {
        if value.is_null() {
            return;
        }
        if routes_to_boost(NumberIndexReader::GROUPS, std::slice::from_ref(value)) {
            if let Some(key) = NumberKey::from_value(value) {
                self.numbers.entry(key).or_default().insert(node);
            }
        } else {
            self.others
                .entry(ordered_key::encode_ordered_value(value))
                .or_default()
                .insert(node);
        }
    }

    pub(crate) fn remove(&mut self, node: InternalNodeId, value: &PropertyValue) {
        if let Some(key) = NumberKey::from_value(value) {
            if let Some(ids) = self.numbers.get_mut(&key) {
                ids.remove(&node);
                if ids.is_empty() {
                    self.numbers.remove(&key);
                }
            }
        } else {
            let key = ordered_key::encode_ordered_value(value);
            if let Some(ids) = self.others.get_mut(&key) {
                ids.remove(&node);
                if ids.is_empty() {
                    self.others.remove(&key);
                }
            }
        }
    }

    pub(crate) fn open_reader<'a>(&'a self, tracker: &'a ResourceTracker) -> DualIndexReader<'a> {
        DualIndexReader::new(
            Box::new(NumberIndexReader::open(&self.numbers, tracker)),
            Box::new(GenericIndexReader::open(&self.others, tracker)),
        )
    }
}

fn flatten_ids<'s>(sets: impl IntoIterator<Item = &'s BTreeSet<InternalNodeId>>) -> Vec<InternalNodeId> {
    sets.into_iter()
        .flat_map(|ids| ids.iter().copied())
        .collect()
}

fn single_value(values: &[PropertyValue]) -> Option<&PropertyValue> {
    match values {
        [value] => Some(value),
        _ => None,
    }
}

/// Physical readers answer exactly one predicate.
fn single_predicate(predicates: &[IndexQuery]) -> Result<&IndexQuery> {
    match predicates {
        [predicate] => Ok(predicate),
        [] => Err(Error::unsupported("index query without predicates")),
        _ => Err(Error::unsupported(format!(
            "composite index query with {} predicates",
            predicates.len()
        ))),
    }
}

/// `BTreeMap::range` panics on an inverted range and on `(Excluded(x), Excluded(x))`.
fn is_empty_range<T: Ord>(lower: &Bound<T>, upper: &Bound<T>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}
