//! In-memory property graph.
//!
//! Nodes and relationships live in plain vectors; every enumeration is
//! materialized into a [`MemCursor`] accounted in the graph's
//! [`ResourceTracker`], so tests can check that each cursor is released once.

use std::collections::{BTreeMap, HashMap};

use pullgraph_api::{
    EdgeKey, Error, GraphSnapshot, IndexReader, InternalNodeId, LabelId, PropertyValue, RelTypeId,
    RelationshipDirection, Result,
};
use tracing::debug;

use crate::cursor::MemCursor;
use crate::index::PropertyIndex;
use crate::interner::Interner;
use crate::stats::{FaultInjection, ResourceCounts, ResourceTracker};

#[derive(Debug, Default)]
struct NodeRecord {
    labels: Vec<LabelId>,
    props: BTreeMap<String, PropertyValue>,
    outgoing: Vec<usize>,
    incoming: Vec<usize>,
}

#[derive(Debug)]
struct EdgeRecord {
    key: EdgeKey,
    props: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Default)]
pub struct MemGraph {
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    labels: Interner,
    rel_types: Interner,
    indexes: HashMap<(LabelId, String), PropertyIndex>,
    tracker: ResourceTracker,
}

impl MemGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, labels: &[&str], props: &[(&str, PropertyValue)]) -> InternalNodeId {
        let id = self.nodes.len() as InternalNodeId;
        let labels: Vec<LabelId> = labels
            .iter()
            .map(|name| self.labels.get_or_create(name))
            .collect();
        self.nodes.push(NodeRecord {
            labels,
            ..NodeRecord::default()
        });
        for (key, value) in props {
            self.write_node_property(id, key, value.clone());
        }
        id
    }

    pub fn add_edge(&mut self, src: InternalNodeId, rel_type: &str, dst: InternalNodeId) -> EdgeKey {
        self.add_edge_with_props(src, rel_type, dst, &[])
    }

    /// # Panics
    ///
    /// Panics if either endpoint does not exist.
    pub fn add_edge_with_props(
        &mut self,
        src: InternalNodeId,
        rel_type: &str,
        dst: InternalNodeId,
        props: &[(&str, PropertyValue)],
    ) -> EdgeKey {
        assert!((src as usize) < self.nodes.len(), "unknown source node {src}");
        assert!((dst as usize) < self.nodes.len(), "unknown target node {dst}");
        let rel = self.rel_types.get_or_create(rel_type);
        let slot = self.edges.len();
        let key = EdgeKey {
            id: slot as u64,
            src,
            rel,
            dst,
        };
        self.edges.push(EdgeRecord {
            key,
            props: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
        self.nodes[src as usize].outgoing.push(slot);
        self.nodes[dst as usize].incoming.push(slot);
        key
    }

    /// Set (or with `Null`, remove) a node property, keeping indexes current.
    pub fn set_node_property(
        &mut self,
        node: InternalNodeId,
        key: &str,
        value: PropertyValue,
    ) -> Result<()> {
        if node as usize >= self.nodes.len() {
            return Err(Error::NotFound(format!("node {node}")));
        }
        self.write_node_property(node, key, value);
        Ok(())
    }

    fn write_node_property(&mut self, node: InternalNodeId, key: &str, value: PropertyValue) {
        let record = &mut self.nodes[node as usize];
        let old = if value.is_null() {
            record.props.remove(key)
        } else {
            record.props.insert(key.to_string(), value.clone())
        };
        for label in &record.labels {
            if let Some(index) = self.indexes.get_mut(&(*label, key.to_string())) {
                if let Some(old) = &old {
                    index.remove(node, old);
                }
                index.insert(node, &value);
            }
        }
    }

    /// Create an index on `(label, property)` covering existing nodes.
    pub fn create_index(&mut self, label: &str, property: &str) {
        let label_id = self.labels.get_or_create(label);
        let mut index = PropertyIndex::default();
        for (id, record) in self.nodes.iter().enumerate() {
            if !record.labels.contains(&label_id) {
                continue;
            }
            if let Some(value) = record.props.get(property) {
                index.insert(id as InternalNodeId, value);
            }
        }
        debug!(label, property, "index created");
        self.indexes.insert((label_id, property.to_string()), index);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn stats(&self) -> ResourceCounts {
        self.tracker.counts()
    }

    pub fn reset_stats(&self) {
        self.tracker.reset();
    }

    pub fn faults(&self) -> &FaultInjection {
        &self.tracker.faults
    }

    fn node(&self, node: InternalNodeId) -> Result<&NodeRecord> {
        self.nodes
            .get(node as usize)
            .ok_or_else(|| Error::NotFound(format!("node {node}")))
    }
}

impl GraphSnapshot for MemGraph {
    type NodeCursor<'a> = MemCursor<'a, InternalNodeId>;
    type RelCursor<'a> = MemCursor<'a, EdgeKey>;

    fn all_nodes(&self) -> Result<Self::NodeCursor<'_>> {
        let ids = (0..self.nodes.len() as InternalNodeId).collect();
        Ok(MemCursor::open(ids, &self.tracker))
    }

    fn nodes_with_label(&self, label: LabelId) -> Result<Self::NodeCursor<'_>> {
        let ids = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, record)| record.labels.contains(&label))
            .map(|(id, _)| id as InternalNodeId)
            .collect();
        Ok(MemCursor::open(ids, &self.tracker))
    }

    fn relationships(
        &self,
        node: InternalNodeId,
        direction: RelationshipDirection,
        types: &[RelTypeId],
    ) -> Result<Self::RelCursor<'_>> {
        let record = self.node(node)?;
        let outgoing = record.outgoing.iter();
        let incoming = record.incoming.iter();
        let slots: Vec<usize> = match direction {
            RelationshipDirection::Outgoing => outgoing.copied().collect(),
            RelationshipDirection::Incoming => incoming.copied().collect(),
            // A self-loop sits in both lists; take it from the outgoing side only.
            RelationshipDirection::Both => outgoing
                .copied()
                .chain(
                    incoming
                        .copied()
                        .filter(|slot| !self.edges[*slot].key.is_self_loop()),
                )
                .collect(),
        };
        let keys = slots
            .into_iter()
            .map(|slot| self.edges[slot].key)
            .filter(|key| types.is_empty() || types.contains(&key.rel))
            .collect();
        self.tracker.open_relationships()?;
        Ok(MemCursor::opened(keys, &self.tracker))
    }

    fn node_property(&self, node: InternalNodeId, key: &str) -> Result<Option<PropertyValue>> {
        self.tracker.property_read()?;
        Ok(self.node(node)?.props.get(key).cloned())
    }

    fn edge_property(&self, edge: EdgeKey, key: &str) -> Result<Option<PropertyValue>> {
        self.tracker.property_read()?;
        let record = self
            .edges
            .get(edge.id as usize)
            .ok_or_else(|| Error::NotFound(format!("relationship {}", edge.id)))?;
        Ok(record.props.get(key).cloned())
    }

    fn resolve_label_id(&self, name: &str) -> Option<LabelId> {
        self.labels.get_id(name)
    }

    fn resolve_rel_type_id(&self, name: &str) -> Option<RelTypeId> {
        self.rel_types.get_id(name)
    }

    fn index_reader(
        &self,
        label: LabelId,
        property: &str,
    ) -> Result<Option<Box<dyn IndexReader<'_> + '_>>> {
        let Some(index) = self.indexes.get(&(label, property.to_string())) else {
            return Ok(None);
        };
        Ok(Some(Box::new(index.open_reader(&self.tracker))))
    }
}

#[cfg(test)]
mod tests {
    use pullgraph_api::{Cursor, IndexQuery};

    use super::*;

    fn drain<C: Cursor<Item = Result<T>>, T>(mut cursor: C) -> Vec<T> {
        let items = cursor.by_ref().collect::<Result<Vec<_>>>().unwrap();
        cursor.close().unwrap();
        items
    }

    #[test]
    fn both_direction_yields_self_loop_once_and_keeps_parallel_edges() {
        let mut g = MemGraph::new();
        let a = g.add_node(&["N"], &[]);
        let b = g.add_node(&["N"], &[]);
        g.add_edge(a, "R", a);
        g.add_edge(a, "R", b);
        g.add_edge(a, "R", b);
        g.add_edge(b, "S", a);

        let both = drain(g.relationships(a, RelationshipDirection::Both, &[]).unwrap());
        assert_eq!(both.len(), 4);

        let r = g.resolve_rel_type_id("R").unwrap();
        let out_r = drain(g.relationships(a, RelationshipDirection::Outgoing, &[r]).unwrap());
        assert_eq!(out_r.len(), 3);

        let incoming = drain(g.relationships(b, RelationshipDirection::Incoming, &[]).unwrap());
        assert_eq!(incoming.len(), 2);
        assert!(g.stats().all_released());
    }

    #[test]
    fn label_scan_and_properties() {
        let mut g = MemGraph::new();
        g.add_node(&["Person"], &[("name", "ada".into())]);
        g.add_node(&["City"], &[]);
        let person = g.resolve_label_id("Person").unwrap();
        assert_eq!(drain(g.nodes_with_label(person).unwrap()), vec![0]);
        assert_eq!(
            g.node_property(0, "name").unwrap(),
            Some(PropertyValue::from("ada"))
        );
        assert_eq!(g.node_property(1, "name").unwrap(), None);
        assert_eq!(g.stats().property_reads, 2);
    }

    #[test]
    fn property_read_fault_fires_once() {
        let g = {
            let mut g = MemGraph::new();
            g.add_node(&[], &[("x", 1_i64.into())]);
            g
        };
        g.faults()
            .fail_property_read_at
            .store(2, std::sync::atomic::Ordering::SeqCst);
        assert!(g.node_property(0, "x").is_ok());
        assert!(g.node_property(0, "x").is_err());
        assert!(g.node_property(0, "x").is_ok());
    }

    #[test]
    fn index_follows_property_updates() {
        let mut g = MemGraph::new();
        let n = g.add_node(&["P"], &[("age", 30_i64.into())]);
        g.create_index("P", "age");
        g.set_node_property(n, "age", "thirty".into()).unwrap();
        let label = g.resolve_label_id("P").unwrap();

        let mut reader = g.index_reader(label, "age").unwrap().unwrap();
        let hits = drain(
            reader
                .query(&[IndexQuery::Exact(PropertyValue::from("thirty"))])
                .unwrap(),
        );
        assert_eq!(hits, vec![n]);
        let old = drain(
            reader
                .query(&[IndexQuery::Exact(PropertyValue::Int(30))])
                .unwrap(),
        );
        assert!(old.is_empty());
        reader.close().unwrap();
        assert!(g.stats().all_released());
    }

    #[test]
    fn missing_index_is_none() {
        let g = MemGraph::new();
        assert!(g.index_reader(0, "age").unwrap().is_none());
    }
}
