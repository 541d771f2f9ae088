//! The number ("boost") index reader.
//!
//! Keys are exact numbers: integers stay `i64` and floats stay `f64`, and the
//! two are compared exactly against each other, so `1` and `1.0` are the same
//! key and no integer above 2^53 collides with its nearest float.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use ordered_float::OrderedFloat;
use pullgraph_api::{
    Error, IndexQuery, IndexReader, IndexSample, IndexSampler, InternalNodeId, NodeIdCursor,
    PropertyValue, Result, ValueGroupSet, compare_int_float,
};

use super::{flatten_ids, is_empty_range, single_predicate, single_value};
use crate::cursor::MemCursor;
use crate::stats::{ReaderKind, ResourceTracker};

/// An exact numeric index key.
#[derive(Debug, Clone, Copy)]
pub enum NumberKey {
    Int(i64),
    Float(OrderedFloat<f64>),
}

impl NumberKey {
    pub fn from_value(value: &PropertyValue) -> Option<NumberKey> {
        match value {
            PropertyValue::Int(i) => Some(NumberKey::Int(*i)),
            PropertyValue::Float(f) => Some(NumberKey::Float(OrderedFloat(*f))),
            _ => None,
        }
    }
}

impl Ord for NumberKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NumberKey::Int(a), NumberKey::Int(b)) => a.cmp(b),
            (NumberKey::Float(a), NumberKey::Float(b)) => a.cmp(b),
            (NumberKey::Int(a), NumberKey::Float(b)) => compare_int_float(*a, b.0),
            (NumberKey::Float(a), NumberKey::Int(b)) => compare_int_float(*b, a.0).reverse(),
        }
    }
}

impl PartialOrd for NumberKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NumberKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NumberKey {}

pub(crate) type NumberEntries = BTreeMap<NumberKey, BTreeSet<InternalNodeId>>;

pub struct NumberIndexReader<'a> {
    entries: &'a NumberEntries,
    tracker: &'a ResourceTracker,
    closed: bool,
}

impl<'a> NumberIndexReader<'a> {
    pub const GROUPS: ValueGroupSet = ValueGroupSet::NUMBER;

    pub(crate) fn open(entries: &'a NumberEntries, tracker: &'a ResourceTracker) -> Self {
        tracker.open_reader();
        Self {
            entries,
            tracker,
            closed: false,
        }
    }

    fn key(value: &PropertyValue) -> Result<NumberKey> {
        NumberKey::from_value(value).ok_or_else(|| {
            Error::unsupported(format!(
                "number index cannot look up {:?} values",
                value.value_group()
            ))
        })
    }

    fn key_bound(bound: &Bound<PropertyValue>) -> Result<Bound<NumberKey>> {
        Ok(match bound {
            Bound::Included(v) => Bound::Included(Self::key(v)?),
            Bound::Excluded(v) => Bound::Excluded(Self::key(v)?),
            Bound::Unbounded => Bound::Unbounded,
        })
    }

    fn matching(&self, predicate: &IndexQuery) -> Result<Vec<InternalNodeId>> {
        match predicate {
            IndexQuery::Exact(value) => {
                let key = Self::key(value)?;
                Ok(flatten_ids(self.entries.get(&key)))
            }
            IndexQuery::Range { lower, upper } => {
                let lower = Self::key_bound(lower)?;
                let upper = Self::key_bound(upper)?;
                if is_empty_range(&lower, &upper) {
                    return Ok(Vec::new());
                }
                Ok(flatten_ids(
                    self.entries.range((lower, upper)).map(|(_, ids)| ids),
                ))
            }
            IndexQuery::Exists => Ok(flatten_ids(self.entries.values())),
            IndexQuery::StringPrefix(_) => Err(Error::unsupported(
                "number index cannot answer a string prefix query",
            )),
        }
    }
}

impl<'a> IndexReader<'a> for NumberIndexReader<'a> {
    fn supported_groups(&self) -> ValueGroupSet {
        Self::GROUPS
    }

    fn count_indexed_nodes(&self, node: InternalNodeId, values: &[PropertyValue]) -> Result<u64> {
        let Some(key) = single_value(values).and_then(NumberKey::from_value) else {
            return Ok(0);
        };
        Ok(self
            .entries
            .get(&key)
            .map_or(0, |ids| u64::from(ids.contains(&node))))
    }

    fn create_sampler(&self) -> Result<Box<dyn IndexSampler + 'a>> {
        self.tracker.open_sampler();
        Ok(Box::new(NumberIndexSampler {
            entries: self.entries,
            tracker: self.tracker,
            closed: false,
        }))
    }

    fn query(&self, predicates: &[IndexQuery]) -> Result<NodeIdCursor<'a>> {
        let predicate = single_predicate(predicates)?;
        let ids = self.matching(predicate)?;
        Ok(Box::new(MemCursor::open(ids, self.tracker)))
    }

    fn has_full_number_precision(&self) -> bool {
        true
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            self.tracker.double_close();
            return Ok(());
        }
        self.closed = true;
        self.tracker.close_reader(ReaderKind::Boost)
    }
}

impl Drop for NumberIndexReader<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.tracker.leak();
        }
    }
}

pub struct NumberIndexSampler<'a> {
    entries: &'a NumberEntries,
    tracker: &'a ResourceTracker,
    closed: bool,
}

impl IndexSampler for NumberIndexSampler<'_> {
    fn sample(&mut self) -> Result<IndexSample> {
        let size = self.entries.values().map(|ids| ids.len() as u64).sum();
        Ok(IndexSample::new(size, self.entries.len() as u64, size))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            self.tracker.double_close();
        } else {
            self.closed = true;
            self.tracker.close_sampler();
        }
        Ok(())
    }
}

impl Drop for NumberIndexSampler<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.tracker.leak();
        }
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn int_float_order_agrees_with_f64_where_exact(
            i in -(1i64 << 52)..(1i64 << 52),
            f in -4.6e15f64..4.6e15,
        ) {
            let expected = (i as f64).partial_cmp(&f).unwrap();
            prop_assert_eq!(compare_int_float(i, f), expected);
            prop_assert_eq!(NumberKey::Int(i).cmp(&NumberKey::Float(OrderedFloat(f))), expected);
        }
    }
}
