//! Index collaborator contracts.
//!
//! A physical index is exposed through an [`IndexReader`]. Readers declare
//! which value families they store ([`ValueGroupSet`]) so that a composite
//! reader can route a request to the physical reader that holds the values.

use std::ops::Bound;

use crate::{Cursor, InternalNodeId, PropertyValue, Result};

/// Coarse type family of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueGroup {
    Null,
    Boolean,
    Number,
    Text,
    List,
    Map,
}

impl ValueGroup {
    const fn bit(self) -> u8 {
        match self {
            ValueGroup::Null => 1 << 0,
            ValueGroup::Boolean => 1 << 1,
            ValueGroup::Number => 1 << 2,
            ValueGroup::Text => 1 << 3,
            ValueGroup::List => 1 << 4,
            ValueGroup::Map => 1 << 5,
        }
    }
}

/// A small set of [`ValueGroup`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValueGroupSet(u8);

impl ValueGroupSet {
    pub const EMPTY: ValueGroupSet = ValueGroupSet(0);
    pub const ALL: ValueGroupSet = ValueGroupSet(0b0011_1111);
    pub const NUMBER: ValueGroupSet = ValueGroupSet(ValueGroup::Number.bit());

    pub fn of(groups: &[ValueGroup]) -> Self {
        groups
            .iter()
            .fold(Self::EMPTY, |acc, g| ValueGroupSet(acc.0 | g.bit()))
    }

    /// Every group except those in `other`.
    pub const fn complement_of(other: ValueGroupSet) -> Self {
        ValueGroupSet(Self::ALL.0 & !other.0)
    }

    pub fn contains(self, group: ValueGroup) -> bool {
        self.0 & group.bit() != 0
    }

    pub fn covers(self, value: &PropertyValue) -> bool {
        self.contains(value.value_group())
    }

    /// True if every value belongs to this set. An empty slice is covered.
    pub fn covers_all(self, values: &[PropertyValue]) -> bool {
        values.iter().all(|v| self.covers(v))
    }
}

/// A predicate over the indexed property.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    Exact(PropertyValue),
    Range {
        lower: Bound<PropertyValue>,
        upper: Bound<PropertyValue>,
    },
    StringPrefix(String),
    /// Any entry at all; carries no value.
    Exists,
}

impl IndexQuery {
    /// Concrete values this predicate is parameterized by.
    ///
    /// A string prefix counts as a text value. Empty for `Exists` and for a
    /// range with both ends unbounded.
    pub fn values(&self) -> Vec<PropertyValue> {
        match self {
            IndexQuery::Exact(v) => vec![v.clone()],
            IndexQuery::Range { lower, upper } => [lower, upper]
                .into_iter()
                .filter_map(|b| match b {
                    Bound::Included(v) | Bound::Excluded(v) => Some(v.clone()),
                    Bound::Unbounded => None,
                })
                .collect(),
            IndexQuery::StringPrefix(p) => vec![PropertyValue::String(p.clone())],
            IndexQuery::Exists => Vec::new(),
        }
    }

    /// Value families this predicate is parameterized by.
    pub fn value_groups(&self) -> Vec<ValueGroup> {
        self.values().iter().map(PropertyValue::value_group).collect()
    }
}

/// Statistics produced by sampling an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexSample {
    pub index_size: u64,
    pub unique_values: u64,
    pub sample_size: u64,
}

impl IndexSample {
    pub fn new(index_size: u64, unique_values: u64, sample_size: u64) -> Self {
        Self {
            index_size,
            unique_values,
            sample_size,
        }
    }

    /// Component-wise sum of two samples over disjoint value domains.
    pub fn combine(self, other: IndexSample) -> IndexSample {
        IndexSample {
            index_size: self.index_size + other.index_size,
            unique_values: self.unique_values + other.unique_values,
            sample_size: self.sample_size + other.sample_size,
        }
    }
}

/// Cursor over node ids produced by an index query.
pub type NodeIdCursor<'a> = Box<dyn Cursor<Item = Result<InternalNodeId>> + 'a>;

pub trait IndexSampler {
    fn sample(&mut self) -> Result<IndexSample>;
    fn close(&mut self) -> Result<()>;
}

/// Reader over one index. `'a` is the lifetime of the indexed data, so
/// cursors and samplers handed out by the reader may outlive the borrow of
/// the reader itself.
pub trait IndexReader<'a> {
    /// Value families stored by this reader.
    fn supported_groups(&self) -> ValueGroupSet;

    /// Number of entries for `node` with exactly `values`.
    fn count_indexed_nodes(&self, node: InternalNodeId, values: &[PropertyValue]) -> Result<u64>;

    fn create_sampler(&self) -> Result<Box<dyn IndexSampler + 'a>>;

    /// Nodes matching every predicate.
    ///
    /// Readers may reject predicate shapes with [`crate::Error::Unsupported`].
    fn query(&self, predicates: &[IndexQuery]) -> Result<NodeIdCursor<'a>>;

    /// Whether numbers are stored without precision loss.
    fn has_full_number_precision(&self) -> bool;

    fn close(&mut self) -> Result<()>;
}
