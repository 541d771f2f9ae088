use std::cmp::Ordering;

use pullgraph_api::GraphSnapshot;
use tracing::debug;

use super::{ExecutionContext, PlanIterator, Row, SortItem, Value};
use crate::ast::{Direction, Expression};
use crate::error::{Error, Result};
use crate::evaluator::{evaluate_expression_value, order_compare};

pub struct ProjectionIter<'a, S: GraphSnapshot + 'a> {
    pub(super) ctx: ExecutionContext<'a, S>,
    pub(super) input: Box<PlanIterator<'a, S>>,
    pub(super) items: &'a [(String, Expression)],
}

impl<'a, S: GraphSnapshot + 'a> ProjectionIter<'a, S> {
    pub(super) fn new(
        ctx: ExecutionContext<'a, S>,
        input: Box<PlanIterator<'a, S>>,
        items: &'a [(String, Expression)],
    ) -> Self {
        Self { ctx, input, items }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.input.close()
    }

    fn project(&self, mut row: Row) -> Result<Row> {
        // Every item sees the input row, not columns computed alongside it.
        let mut computed = Vec::with_capacity(self.items.len());
        for (name, expr) in self.items {
            let value = evaluate_expression_value(expr, &mut row, self.ctx.snapshot, self.ctx.params)?;
            computed.push((name, value));
        }
        for (name, value) in computed {
            row.set(name.as_str(), value);
        }
        Ok(row)
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for ProjectionIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.input.next()?.and_then(|row| self.project(row)))
    }
}

/// Blocking sort. The input is drained and closed on the first pull.
pub struct SortIter<'a, S: GraphSnapshot + 'a> {
    pub(super) ctx: ExecutionContext<'a, S>,
    pub(super) input: Box<PlanIterator<'a, S>>,
    pub(super) items: &'a [SortItem],
    pub(super) sorted: Option<std::vec::IntoIter<Row>>,
}

impl<'a, S: GraphSnapshot + 'a> SortIter<'a, S> {
    pub(super) fn new(
        ctx: ExecutionContext<'a, S>,
        input: Box<PlanIterator<'a, S>>,
        items: &'a [SortItem],
    ) -> Self {
        Self {
            ctx,
            input,
            items,
            sorted: None,
        }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.sorted = Some(Vec::new().into_iter());
        self.input.close()
    }

    fn materialize(&mut self) -> Result<Vec<Row>> {
        let limit = self.ctx.config.max_sort_rows;
        let mut keyed: Vec<(Vec<Value>, Row)> = Vec::new();
        for row in self.input.by_ref() {
            let row = row?;
            if limit.is_some_and(|max| keyed.len() >= max) {
                return Err(Error::ResourceLimit(format!(
                    "sort buffered more than {} rows",
                    keyed.len()
                )));
            }
            let key = self
                .items
                .iter()
                .map(|item| {
                    row.get(&item.column)
                        .cloned()
                        .ok_or_else(|| Error::UnknownVariable(item.column.clone()))
                })
                .collect::<Result<Vec<_>>>()?;
            keyed.push((key, row));
        }
        self.input.close()?;

        // Stable, so rows with equal keys keep their input order.
        keyed.sort_by(|(a, _), (b, _)| compare_keys(self.items, a, b));
        debug!(rows = keyed.len(), keys = self.items.len(), "sort materialized");
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }
}

fn compare_keys(items: &[SortItem], a: &[Value], b: &[Value]) -> Ordering {
    for ((item, l), r) in items.iter().zip(a).zip(b) {
        let ord = match item.direction {
            Direction::Ascending => order_compare(l, r),
            Direction::Descending => order_compare(r, l),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl<'a, S: GraphSnapshot + 'a> Iterator for SortIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.sorted.is_none() {
            match self.materialize() {
                Ok(rows) => self.sorted = Some(rows.into_iter()),
                Err(e) => {
                    self.sorted = Some(Vec::new().into_iter());
                    return Some(Err(e));
                }
            }
        }
        self.sorted.as_mut()?.next().map(Ok)
    }
}
