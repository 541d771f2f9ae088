use std::ops::Bound;

use pullgraph_api::{GraphSnapshot, IndexQuery, IndexReader, NodeIdCursor, PropertyValue};
use tracing::{debug, warn};

use super::cleanup::{close_all, close_cursor};
use super::{ExecutionContext, IndexPredicate, RangeBound, Row, Value};
use crate::Params;
use crate::error::{Error, Result};
use crate::evaluator::evaluate_constant;

pub struct IndexSeekIter<'a> {
    pub(super) reader: Option<Box<dyn IndexReader<'a> + 'a>>,
    pub(super) cursor: Option<NodeIdCursor<'a>>,
    pub(super) alias: &'a str,
}

pub(super) fn open_index_seek<'a, S: GraphSnapshot + 'a>(
    ctx: ExecutionContext<'a, S>,
    alias: &'a str,
    label: &str,
    property: &str,
    predicates: &[IndexPredicate],
) -> Result<IndexSeekIter<'a>> {
    let queries = resolve_predicates(predicates, ctx.params)?;
    let not_found = || Error::IndexNotFound {
        label: label.to_string(),
        property: property.to_string(),
    };
    let label_id = ctx.snapshot.resolve_label_id(label).ok_or_else(not_found)?;
    let mut reader = ctx
        .snapshot
        .index_reader(label_id, property)?
        .ok_or_else(not_found)?;

    let Some(queries) = queries else {
        debug!(label, property, "index seek on null value matches nothing");
        reader.close()?;
        return Ok(IndexSeekIter {
            reader: None,
            cursor: None,
            alias,
        });
    };

    let cursor = match reader.query(&queries) {
        Ok(cursor) => cursor,
        Err(e) => {
            if let Err(close_err) = reader.close() {
                warn!(error = %close_err, "index reader close failed after a rejected query");
            }
            return Err(e.into());
        }
    };
    debug!(label, property, predicates = queries.len(), "index seek opened");
    Ok(IndexSeekIter {
        reader: Some(reader),
        cursor: Some(cursor),
        alias,
    })
}

impl IndexSeekIter<'_> {
    /// Releases the result cursor, then the reader.
    pub(super) fn close(&mut self) -> Result<()> {
        let cursor = close_cursor(&mut self.cursor);
        let reader = match self.reader.take() {
            Some(mut reader) => reader.close().map_err(Error::from),
            None => Ok(()),
        };
        close_all([cursor, reader])
    }
}

impl Iterator for IndexSeekIter<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.cursor.as_mut()?.next()?;
        Some(
            next.map(|iid| Row::default().with(self.alias, Value::Node(iid)))
                .map_err(Error::from),
        )
    }
}

/// `None` when a predicate compares against null, which no entry matches.
fn resolve_predicates(
    predicates: &[IndexPredicate],
    params: &Params,
) -> Result<Option<Vec<IndexQuery>>> {
    let mut out = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        let query = match predicate {
            IndexPredicate::Exact(expr) => match property_of(evaluate_constant(expr, params)?)? {
                Some(value) => IndexQuery::Exact(value),
                None => return Ok(None),
            },
            IndexPredicate::Range { lower, upper } => {
                let (Some(lower), Some(upper)) =
                    (range_bound(lower, params)?, range_bound(upper, params)?)
                else {
                    return Ok(None);
                };
                IndexQuery::Range { lower, upper }
            }
            IndexPredicate::StringPrefix(expr) => match evaluate_constant(expr, params)? {
                Value::String(prefix) => IndexQuery::StringPrefix(prefix),
                Value::Null => return Ok(None),
                other => {
                    return Err(Error::TypeMismatch(format!(
                        "string prefix must be a string, got {other:?}"
                    )));
                }
            },
            IndexPredicate::Exists => IndexQuery::Exists,
        };
        out.push(query);
    }
    Ok(Some(out))
}

fn range_bound(
    bound: &Option<RangeBound>,
    params: &Params,
) -> Result<Option<Bound<PropertyValue>>> {
    let Some(bound) = bound else {
        return Ok(Some(Bound::Unbounded));
    };
    let Some(value) = property_of(evaluate_constant(&bound.value, params)?)? else {
        return Ok(None);
    };
    Ok(Some(if bound.inclusive {
        Bound::Included(value)
    } else {
        Bound::Excluded(value)
    }))
}

fn property_of(value: Value) -> Result<Option<PropertyValue>> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .to_property()
        .map(Some)
        .ok_or_else(|| Error::TypeMismatch(format!("{value:?} cannot be an index key")))
}
