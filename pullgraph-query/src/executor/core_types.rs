use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use pullgraph_api::{EdgeKey, InternalNodeId, PropertyValue};
use serde::ser::{SerializeMap, SerializeSeq};
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    Node(InternalNodeId),
    Relationship(EdgeKey),
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Node(iid) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "node")?;
                map.serialize_entry("id", iid)?;
                map.end()
            }
            Value::Relationship(e) => {
                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("type", "relationship")?;
                map.serialize_entry("id", &e.id)?;
                map.serialize_entry("src", &e.src)?;
                map.serialize_entry("rel", &e.rel)?;
                map.serialize_entry("dst", &e.dst)?;
                map.end()
            }
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Null => serializer.serialize_none(),
            Value::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for item in list {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    ser.serialize_entry(k, v)?;
                }
                ser.end()
            }
        }
    }
}

// Custom Hash implementation for Value (since Float doesn't implement Hash)
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Node(id) => id.hash(state),
            Value::Relationship(key) => key.hash(state),
            Value::Int(i) => i.hash(state),
            // 0.0 == -0.0, so both must hash alike.
            Value::Float(f) => {
                let f = if *f == 0.0 { 0.0_f64 } else { *f };
                f.to_bits().hash(state);
            }
            Value::String(s) => s.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
            Value::List(l) => l.hash(state),
            Value::Map(m) => m.hash(state),
        }
    }
}

impl Eq for Value {}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(b) => Value::Bool(b),
            PropertyValue::Int(i) => Value::Int(i),
            PropertyValue::Float(f) => Value::Float(f),
            PropertyValue::String(s) => Value::String(s),
            PropertyValue::List(items) => Value::List(items.into_iter().map(Value::from).collect()),
            PropertyValue::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The property value an index can be queried with, if this value has one.
    pub fn to_property(&self) -> Option<PropertyValue> {
        Some(match self {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Int(i) => PropertyValue::Int(*i),
            Value::Float(f) => PropertyValue::Float(*f),
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::List(items) => PropertyValue::List(
                items
                    .iter()
                    .map(Value::to_property)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Map(entries) => PropertyValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| v.to_property().map(|v| (k.clone(), v)))
                    .collect::<Option<BTreeMap<_, _>>>()?,
            ),
            Value::Node(_) | Value::Relationship(_) => return None,
        })
    }
}

/// A graph entity whose properties can be cached on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Node(InternalNodeId),
    Relationship(EdgeKey),
}

/// Row-scoped memo of `(entity, key) → value` property reads.
///
/// Travels with the row, so each row lineage owns its own entries and
/// sibling lineages never share them.
#[derive(Debug, Clone, Default)]
pub struct PropertyCache {
    entries: SmallVec<[((Entity, String), Value); 4]>,
}

impl PropertyCache {
    pub fn get(&self, entity: Entity, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|((e, k), _)| *e == entity && k == key)
            .map(|(_, v)| v)
    }

    pub fn insert(&mut self, entity: Entity, key: &str, value: Value) {
        if let Some((_, slot)) = self
            .entries
            .iter_mut()
            .find(|((e, k), _)| *e == entity && k == key)
        {
            *slot = value;
        } else {
            self.entries.push(((entity, key.to_string()), value));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union with `other`; entries already present here win.
    fn absorb(&mut self, other: &PropertyCache) {
        for ((entity, key), value) in &other.entries {
            if self.get(*entity, key).is_none() {
                self.entries
                    .push(((*entity, key.clone()), value.clone()));
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    // Small row: linear search is fine.
    pub(crate) cols: Vec<(String, Value)>,
    pub(crate) cache: PropertyCache,
}

/// Rows are equal when their columns are; the cache is an evaluation detail.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.cols == other.cols
    }
}

impl serde::Serialize for Row {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cols.len()))?;
        for (k, v) in &self.cols {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Row {
    pub fn new(cols: Vec<(String, Value)>) -> Self {
        Self {
            cols,
            cache: PropertyCache::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.cols.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some((_k, v)) = self.cols.iter_mut().find(|(k, _)| *k == name) {
            *v = value;
        } else {
            self.cols.push((name, value));
        }
    }

    pub fn get_node(&self, name: &str) -> Option<InternalNodeId> {
        match self.get(name) {
            Some(Value::Node(iid)) => Some(*iid),
            _ => None,
        }
    }

    /// Keep `names` in order, null-filling missing columns. The cache is not
    /// carried over.
    pub fn project<N: AsRef<str>>(&self, names: &[N]) -> Row {
        let mut out = Row::default();
        for name in names {
            let name = name.as_ref();
            let value = self.get(name).cloned().unwrap_or(Value::Null);
            out.cols.push((name.to_string(), value));
        }
        out
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.cols
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cols.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cols.iter().map(|(_, v)| v)
    }

    pub fn cache(&self) -> &PropertyCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut PropertyCache {
        &mut self.cache
    }

    /// Union of both rows: this row's columns first, then `other`'s columns
    /// not already present. Caches are unioned the same way.
    pub fn merge(&self, other: &Row) -> Row {
        let mut out = self.clone();
        for (k, v) in &other.cols {
            if out.get(k).is_none() {
                out.cols.push((k.clone(), v.clone()));
            }
        }
        out.cache.absorb(&other.cache);
        out
    }
}
