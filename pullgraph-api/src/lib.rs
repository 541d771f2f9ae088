use std::cmp::Ordering;
use std::collections::BTreeMap;

mod error;
pub mod index;

pub use error::{Error, Result};
pub use index::{
    IndexQuery, IndexReader, IndexSample, IndexSampler, NodeIdCursor, ValueGroup, ValueGroupSet,
};

/// Internal node identifier used for storage and lookups.
pub type InternalNodeId = u32;

/// Label identifier for node classification.
pub type LabelId = u32;

/// Relationship type identifier (e.g. `:KNOWS`).
pub type RelTypeId = u32;

/// Identity of a single relationship.
///
/// Two relationships with the same endpoints and type are still distinct
/// relationships; the id keeps them apart.
pub type EdgeId = u64;

/// Property value types for nodes and relationships.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl PropertyValue {
    /// The coarse type family this value belongs to.
    pub fn value_group(&self) -> ValueGroup {
        match self {
            PropertyValue::Null => ValueGroup::Null,
            PropertyValue::Bool(_) => ValueGroup::Boolean,
            PropertyValue::Int(_) | PropertyValue::Float(_) => ValueGroup::Number,
            PropertyValue::String(_) => ValueGroup::Text,
            PropertyValue::List(_) => ValueGroup::List,
            PropertyValue::Map(_) => ValueGroup::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

/// Exact comparison of an integer with a float, without rounding the
/// integer through `f64`. NaN is greater than every number.
pub fn compare_int_float(i: i64, f: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => {
            let frac = f - whole;
            if frac > 0.0 {
                Ordering::Less
            } else if frac < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        other => other,
    }
}

/// A relationship handle: identity, endpoints and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct EdgeKey {
    pub id: EdgeId,
    pub src: InternalNodeId,
    pub rel: RelTypeId,
    pub dst: InternalNodeId,
}

impl EdgeKey {
    /// The node at the opposite end from `node`.
    ///
    /// For a self-loop both ends are `node`.
    pub fn other_node(&self, node: InternalNodeId) -> InternalNodeId {
        if self.src == node { self.dst } else { self.src }
    }

    pub fn is_self_loop(&self) -> bool {
        self.src == self.dst
    }
}

/// Which incident relationships of a node to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RelationshipDirection {
    Outgoing,
    Incoming,
    /// Every incident relationship exactly once, including self-loops.
    Both,
}

/// A storage cursor: an iterator over collaborator data that owns a
/// resource and must be released explicitly.
///
/// `close` may fail; callers are expected to close every cursor they open
/// exactly once, after partial consumption as well as after exhaustion.
pub trait Cursor: Iterator {
    fn close(&mut self) -> Result<()>;
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// A read-only view of the property graph.
///
/// Every enumeration hands out a [`Cursor`]; property lookups are point
/// reads. Collaborator failures are returned as [`Error`] and never
/// swallowed by the engine.
pub trait GraphSnapshot {
    /// Cursor over node ids.
    type NodeCursor<'a>: Cursor<Item = Result<InternalNodeId>> + 'a
    where
        Self: 'a;

    /// Cursor over relationship handles.
    type RelCursor<'a>: Cursor<Item = Result<EdgeKey>> + 'a
    where
        Self: 'a;

    /// Open a cursor over every node.
    fn all_nodes(&self) -> Result<Self::NodeCursor<'_>>;

    /// Open a cursor over every node carrying `label`.
    fn nodes_with_label(&self, label: LabelId) -> Result<Self::NodeCursor<'_>>;

    /// Open a cursor over the relationships incident to `node`.
    ///
    /// An empty `types` slice means any type. With
    /// [`RelationshipDirection::Both`] a self-loop is yielded once.
    fn relationships(
        &self,
        node: InternalNodeId,
        direction: RelationshipDirection,
        types: &[RelTypeId],
    ) -> Result<Self::RelCursor<'_>>;

    /// Get a property value for a node, `None` if unset.
    fn node_property(&self, node: InternalNodeId, key: &str) -> Result<Option<PropertyValue>>;

    /// Get a property value for a relationship, `None` if unset.
    fn edge_property(&self, edge: EdgeKey, key: &str) -> Result<Option<PropertyValue>>;

    /// Resolve a label name to its ID.
    fn resolve_label_id(&self, _name: &str) -> Option<LabelId> {
        None
    }

    /// Resolve a relationship type name to its ID.
    fn resolve_rel_type_id(&self, _name: &str) -> Option<RelTypeId> {
        None
    }

    /// Open a reader for the index on `(label, property)`.
    ///
    /// Returns `Ok(None)` if no such index exists.
    fn index_reader(
        &self,
        _label: LabelId,
        _property: &str,
    ) -> Result<Option<Box<dyn IndexReader<'_> + '_>>> {
        Ok(None)
    }
}
