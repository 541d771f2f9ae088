use pullgraph_api::GraphSnapshot;

use super::{PlanIterator, Row};
use crate::error::{Error, Result};

pub struct SkipIter<'a, S: GraphSnapshot + 'a> {
    pub(super) input: Box<PlanIterator<'a, S>>,
    pub(super) remaining: usize,
}

impl<'a, S: GraphSnapshot + 'a> SkipIter<'a, S> {
    pub(super) fn new(input: Box<PlanIterator<'a, S>>, count: usize) -> Self {
        Self {
            input,
            remaining: count,
        }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for SkipIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            match self.input.next()? {
                Ok(_) => self.remaining -= 1,
                Err(e) => return Some(Err(e)),
            }
        }
        self.input.next()
    }
}

/// Forwards at most `remaining` rows and closes its input right after the
/// last one, without pulling further.
pub struct LimitIter<'a, S: GraphSnapshot + 'a> {
    pub(super) input: Box<PlanIterator<'a, S>>,
    pub(super) remaining: usize,
    /// A close failure met while forwarding the last row, reported next.
    pub(super) deferred: Option<Error>,
}

impl<'a, S: GraphSnapshot + 'a> LimitIter<'a, S> {
    pub(super) fn new(input: Box<PlanIterator<'a, S>>, count: usize) -> Self {
        Self {
            input,
            remaining: count,
            deferred: None,
        }
    }

    pub(super) fn close(&mut self) -> Result<()> {
        self.input.close()
    }
}

impl<'a, S: GraphSnapshot + 'a> Iterator for LimitIter<'a, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.deferred.take() {
            return Some(Err(e));
        }
        if self.remaining == 0 {
            return match self.input.close() {
                Ok(()) => None,
                Err(e) => Some(Err(e)),
            };
        }
        let item = self.input.next()?;
        if item.is_ok() {
            self.remaining -= 1;
            if self.remaining == 0
                && let Err(e) = self.input.close()
            {
                self.deferred = Some(e);
            }
        }
        Some(item)
    }
}
