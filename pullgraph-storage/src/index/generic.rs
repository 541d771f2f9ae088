//! The generic ("fallback") index reader.
//!
//! Stores every value family the number index does not, keyed by the
//! order-preserving byte encoding from [`super::ordered_key`]. Numbers would
//! pass through the same encoding but are never routed here.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use pullgraph_api::{
    Error, IndexQuery, IndexReader, IndexSample, IndexSampler, InternalNodeId, NodeIdCursor,
    PropertyValue, Result, ValueGroupSet,
};

use super::ordered_key::{encode_ordered_value, encode_string_prefix, group_key_range};
use super::{flatten_ids, is_empty_range, single_predicate, single_value};
use crate::cursor::MemCursor;
use crate::stats::{ReaderKind, ResourceTracker};

pub(crate) type GenericEntries = BTreeMap<Vec<u8>, BTreeSet<InternalNodeId>>;

pub struct GenericIndexReader<'a> {
    entries: &'a GenericEntries,
    tracker: &'a ResourceTracker,
    closed: bool,
}

impl<'a> GenericIndexReader<'a> {
    pub const GROUPS: ValueGroupSet = ValueGroupSet::complement_of(ValueGroupSet::NUMBER);

    pub(crate) fn open(entries: &'a GenericEntries, tracker: &'a ResourceTracker) -> Self {
        tracker.open_reader();
        Self {
            entries,
            tracker,
            closed: false,
        }
    }

    /// Byte range for a value range. Unbounded ends are clamped to the value
    /// group of the bounded end, so `< "m"` never reaches booleans or lists.
    fn key_range(
        lower: &Bound<PropertyValue>,
        upper: &Bound<PropertyValue>,
    ) -> Result<(Bound<Vec<u8>>, Bound<Vec<u8>>)> {
        let groups: Vec<_> = [lower, upper]
            .into_iter()
            .filter_map(|b| match b {
                Bound::Included(v) | Bound::Excluded(v) => Some(v.value_group()),
                Bound::Unbounded => None,
            })
            .collect();
        let group = match groups.as_slice() {
            [] => return Ok((Bound::Unbounded, Bound::Unbounded)),
            [g] => *g,
            [a, b] if a == b => *a,
            _ => {
                return Err(Error::unsupported(
                    "range bounds from different value groups",
                ));
            }
        };
        let (group_lo, group_hi) = group_key_range(group);
        let lower = match lower {
            Bound::Included(v) => Bound::Included(encode_ordered_value(v)),
            Bound::Excluded(v) => Bound::Excluded(encode_ordered_value(v)),
            Bound::Unbounded => Bound::Included(group_lo),
        };
        let upper = match upper {
            Bound::Included(v) => Bound::Included(encode_ordered_value(v)),
            Bound::Excluded(v) => Bound::Excluded(encode_ordered_value(v)),
            Bound::Unbounded => Bound::Excluded(group_hi),
        };
        Ok((lower, upper))
    }

    fn matching(&self, predicate: &IndexQuery) -> Result<Vec<InternalNodeId>> {
        match predicate {
            IndexQuery::Exact(value) => {
                Ok(flatten_ids(self.entries.get(&encode_ordered_value(value))))
            }
            IndexQuery::Range { lower, upper } => {
                let (lower, upper) = Self::key_range(lower, upper)?;
                if is_empty_range(&lower, &upper) {
                    return Ok(Vec::new());
                }
                Ok(flatten_ids(
                    self.entries.range((lower, upper)).map(|(_, ids)| ids),
                ))
            }
            IndexQuery::StringPrefix(prefix) => {
                let prefix = encode_string_prefix(prefix);
                Ok(flatten_ids(
                    self.entries
                        .range(prefix.clone()..)
                        .take_while(|(key, _)| key.starts_with(&prefix))
                        .map(|(_, ids)| ids),
                ))
            }
            IndexQuery::Exists => Ok(flatten_ids(self.entries.values())),
        }
    }
}

impl<'a> IndexReader<'a> for GenericIndexReader<'a> {
    fn supported_groups(&self) -> ValueGroupSet {
        Self::GROUPS
    }

    fn count_indexed_nodes(&self, node: InternalNodeId, values: &[PropertyValue]) -> Result<u64> {
        let Some(value) = single_value(values) else {
            return Ok(0);
        };
        Ok(self
            .entries
            .get(&encode_ordered_value(value))
            .map_or(0, |ids| u64::from(ids.contains(&node))))
    }

    fn create_sampler(&self) -> Result<Box<dyn IndexSampler + 'a>> {
        self.tracker.open_sampler();
        Ok(Box::new(GenericIndexSampler {
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
        false
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            self.tracker.double_close();
            return Ok(());
        }
        self.closed = true;
        self.tracker.close_reader(ReaderKind::Fallback)
    }
}

impl Drop for GenericIndexReader<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.tracker.leak();
        }
    }
}

pub struct GenericIndexSampler<'a> {
    entries: &'a GenericEntries,
    tracker: &'a ResourceTracker,
    closed: bool,
}

impl IndexSampler for GenericIndexSampler<'_> {
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

impl Drop for GenericIndexSampler<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.tracker.leak();
        }
    }
}
