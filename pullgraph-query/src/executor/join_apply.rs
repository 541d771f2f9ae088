use pullgraph_api::GraphSnapshot;
use tracing::trace;

use super::cleanup::close_all;
use super::{ExecutionContext, Plan, PlanIterator, Row, open_plan};
use crate::error::Result;

/// What an instance of the right side sees as its argument.
pub(super) enum RightBinding {
    /// The argument the product itself was opened with (CartesianProduct).
    Shared(Option<Row>),
    /// The current left row (Apply).
    LeftRow,
}

/// Nested loop behind CartesianProduct and Apply.
///
/// A fresh right instance is opened for every left row, so per-instance
/// state such as a Limit counter starts over each time. Each instance is
/// closed as soon as it is exhausted. The left side is always pulled to
/// the end, even when every right instance comes back empty.
pub struct NestedLoopIter<'a, S: GraphSnapshot + 'a> {
    pub(super) ctx: ExecutionContext<'a, S>,
    pub(super) left: Box<PlanIterator<'a, S>>,
    pub(super) right_plan: &'a Plan,
    pub(super) binding: RightBinding,
    pub(super) active: Option<(Row, Box<PlanIterator<'a, S>>)>,
    pub(super) done: bool,
}

impl<'a, S: GraphSnapshot + 'a> NestedLoopIter<'a, S> {
    pub(super) fn new(
        ctx: ExecutionContext<'a, S>,
        left: Box<PlanIterator<'a, S>>,
        right_plan: &'a Plan,
        binding: RightBinding,
    ) -> Self {
        Self {
            ctx,
            left,
            right_plan,
            binding,
            active: None,
            done: false,
        }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.done = true;
        let right = match self.active.take() {
            Some((_, mut right)) => right.close(),
            None => Ok(()),
        };
        close_all([right, self.left.close()])
    }

    fn correlated(&self) -> bool {
        matches!(self.binding, RightBinding::LeftRow)
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for NestedLoopIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some((left_row, right)) = &mut self.active {
                match right.next() {
                    Some(Ok(right_row)) => return Some(Ok(left_row.merge(&right_row))),
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        if let Some((_, mut right)) = self.active.take()
                            && let Err(e) = right.close()
                        {
                            return Some(Err(e));
                        }
                        continue;
                    }
                }
            }

            let left_row = match self.left.next() {
                Some(Ok(row)) => row,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.done = true;
                    return None;
                }
            };
            let argument = match &self.binding {
                RightBinding::Shared(argument) => argument.as_ref(),
                RightBinding::LeftRow => Some(&left_row),
            };
            trace!(correlated = self.correlated(), "opening right side");
            match open_plan(self.ctx, self.right_plan, argument) {
                Ok(right) => self.active = Some((left_row, Box::new(right))),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
