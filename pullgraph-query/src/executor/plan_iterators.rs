use pullgraph_api::GraphSnapshot;

use super::cleanup::close_cursor;
use super::{ExecutionContext, PlanIterator, Row, Value};
use crate::ast::Expression;
use crate::error::{Error, Result};
use crate::evaluator::evaluate_expression_bool;
use crate::input::BatchCursor;

pub struct ArgumentIter {
    pub(super) row: Option<Row>,
}

impl ArgumentIter {
    pub(super) fn open(columns: &[String], binding: Option<&Row>) -> Result<Self> {
        let row = match binding {
            Some(bound) => {
                if let Some(missing) = columns.iter().find(|c| bound.get(c).is_none()) {
                    return Err(Error::UnboundArgument(missing.clone()));
                }
                bound.project(columns)
            }
            None if columns.is_empty() => Row::default(),
            None => return Err(Error::UnboundArgument(columns.join(", "))),
        };
        Ok(Self { row: Some(row) })
    }
}

impl Iterator for ArgumentIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.row.take().map(Ok)
    }
}

pub struct InputIter<'a> {
    pub(super) cursor: Option<Box<dyn BatchCursor + 'a>>,
    pub(super) columns: &'a [String],
    pub(super) batch_size: usize,
    pub(super) buffered: std::vec::IntoIter<Row>,
}

impl<'a> InputIter<'a> {
    pub(super) fn open<S>(ctx: ExecutionContext<'a, S>, columns: &'a [String]) -> Result<Self> {
        let source = ctx
            .input
            .ok_or_else(|| Error::InvalidPlan("Input operator without a row source".into()))?;
        Ok(Self {
            cursor: Some(source.open()?),
            columns,
            batch_size: ctx.config.input_batch_size,
            buffered: Vec::new().into_iter(),
        })
    }

    pub(super) fn close(&mut self) -> Result<()> {
        match self.cursor.take() {
            Some(mut cursor) => cursor.close(),
            None => Ok(()),
        }
    }
}

impl Iterator for InputIter<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffered.next() {
                return Some(Ok(row));
            }
            let cursor = self.cursor.as_mut()?;
            match cursor.next_batch(self.batch_size) {
                Ok(Some(batch)) => {
                    if batch.columns() != self.columns {
                        return Some(Err(Error::SchemaMismatch {
                            expected: self.columns.to_vec(),
                            actual: batch.columns().to_vec(),
                        }));
                    }
                    self.buffered = batch.into_rows().into_iter();
                }
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub struct NodeScanIter<'a, S: GraphSnapshot + 'a> {
    /// `None` when the label does not exist.
    pub(super) cursor: Option<S::NodeCursor<'a>>,
    pub(super) alias: &'a str,
}

impl<'a, S: GraphSnapshot + 'a> NodeScanIter<'a, S> {
    pub(super) fn new(cursor: Option<S::NodeCursor<'a>>, alias: &'a str) -> Self {
        Self { cursor, alias }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        close_cursor(&mut self.cursor)
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for NodeScanIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.cursor.as_mut()?.next()?;
        Some(
            next.map(|iid| Row::default().with(self.alias, Value::Node(iid)))
                .map_err(Error::from),
        )
    }
}

pub struct FilterIter<'a, S: GraphSnapshot + 'a> {
    pub(super) ctx: ExecutionContext<'a, S>,
    pub(super) input: Box<PlanIterator<'a, S>>,
    pub(super) predicate: &'a Expression,
}

impl<'a, S: GraphSnapshot + 'a> FilterIter<'a, S> {
    pub(super) fn new(
        ctx: ExecutionContext<'a, S>,
        input: Box<PlanIterator<'a, S>>,
        predicate: &'a Expression,
    ) -> Self {
        Self {
            ctx,
            input,
            predicate,
        }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for FilterIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.input.next()? {
                Ok(mut row) => {
                    match evaluate_expression_bool(
                        self.predicate,
                        &mut row,
                        self.ctx.snapshot,
                        self.ctx.params,
                    ) {
                        Ok(true) => return Some(Ok(row)),
                        Ok(false) => {}
                        Err(e) => return Some(Err(e)),
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub struct ProduceResultsIter<'a, S: GraphSnapshot + 'a> {
    pub(super) input: Box<PlanIterator<'a, S>>,
    pub(super) columns: &'a [String],
}

impl<'a, S: GraphSnapshot + 'a> ProduceResultsIter<'a, S> {
    pub(super) fn new(input: Box<PlanIterator<'a, S>>, columns: &'a [String]) -> Self {
        Self { input, columns }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for ProduceResultsIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.input.next()?.map(|row| row.project(self.columns)))
    }
}
