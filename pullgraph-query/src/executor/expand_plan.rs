use pullgraph_api::{Cursor, GraphSnapshot, InternalNodeId, RelTypeId, RelationshipDirection};
use tracing::trace;

use super::cleanup::close_all;
use super::{PlanIterator, Row, Value, node_id_of};
use crate::error::{Error, Result};

/// Relationships of the node bound to `from`, one output row per
/// relationship. Parallel relationships each produce a row; with
/// `Both` a self-loop produces one.
pub struct ExpandIter<'a, S: GraphSnapshot + 'a> {
    pub(super) snapshot: &'a S,
    pub(super) input: Box<PlanIterator<'a, S>>,
    pub(super) from: &'a str,
    pub(super) relationship: &'a str,
    pub(super) to: &'a str,
    pub(super) direction: RelationshipDirection,
    /// `None` when none of the requested types exist.
    pub(super) types: Option<Vec<RelTypeId>>,
    pub(super) current: Option<(Row, InternalNodeId, S::RelCursor<'a>)>,
}

impl<'a, S: GraphSnapshot + 'a> ExpandIter<'a, S> {
    pub(super) fn new(
        snapshot: &'a S,
        input: Box<PlanIterator<'a, S>>,
        from: &'a str,
        relationship: &'a str,
        to: &'a str,
        direction: RelationshipDirection,
        types: Option<Vec<RelTypeId>>,
    ) -> Self {
        Self {
            snapshot,
            input,
            from,
            relationship,
            to,
            direction,
            types,
            current: None,
        }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        let cursor = self.close_current();
        close_all([cursor, self.input.close()])
    }

    fn close_current(&mut self) -> Result<()> {
        match self.current.take() {
            Some((_, _, mut cursor)) => cursor.close().map_err(Error::from),
            None => Ok(()),
        }
    }

    /// Next relationship from the open cursor that fits the row.
    fn next_from_current(&mut self) -> Option<Result<Row>> {
        let (row, from, cursor) = self.current.as_mut()?;
        loop {
            match cursor.next() {
                Some(Ok(edge)) => {
                    let other = edge.other_node(*from);
                    // Target already bound: only relationships reaching it qualify.
                    if let Some(Value::Node(bound)) = row.get(self.to)
                        && *bound != other
                    {
                        continue;
                    }
                    let out = row
                        .clone()
                        .with(self.relationship, Value::Relationship(edge))
                        .with(self.to, Value::Node(other));
                    return Some(Ok(out));
                }
                Some(Err(e)) => return Some(Err(e.into())),
                None => break,
            }
        }
        match self.close_current() {
            Ok(()) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for ExpandIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_some() {
                match self.next_from_current() {
                    Some(item) => return Some(item),
                    None => continue,
                }
            }

            let row = match self.input.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            let Some(types) = &self.types else {
                continue;
            };
            let node = match node_id_of(&row, self.from) {
                Ok(Some(node)) => node,
                Ok(None) => {
                    trace!(from = self.from, "expand from null yields nothing");
                    continue;
                }
                Err(e) => return Some(Err(e)),
            };
            match self.snapshot.relationships(node, self.direction, types) {
                Ok(cursor) => self.current = Some((row, node, cursor)),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
