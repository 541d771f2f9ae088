use pullgraph_api::{Cursor, Result};

use crate::stats::ResourceTracker;

/// Cursor over a materialized result, accounted in a [`ResourceTracker`].
///
/// Closing twice is counted as a double close; dropping without closing is
/// counted as a leak.
pub struct MemCursor<'a, T> {
    items: std::vec::IntoIter<T>,
    tracker: &'a ResourceTracker,
    closed: bool,
}

impl<'a, T> MemCursor<'a, T> {
    /// Caller has already recorded the open with the tracker.
    pub(crate) fn opened(items: Vec<T>, tracker: &'a ResourceTracker) -> Self {
        Self {
            items: items.into_iter(),
            tracker,
            closed: false,
        }
    }

    pub(crate) fn open(items: Vec<T>, tracker: &'a ResourceTracker) -> Self {
        tracker.open_cursor();
        Self::opened(items, tracker)
    }
}

impl<T> Iterator for MemCursor<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.items.next().map(Ok)
    }
}

impl<T> Cursor for MemCursor<'_, T> {
    fn close(&mut self) -> Result<()> {
        if self.closed {
            self.tracker.double_close();
            return Ok(());
        }
        self.closed = true;
        self.tracker.close_cursor()
    }
}

impl<T> Drop for MemCursor<'_, T> {
    fn drop(&mut self) {
        if !self.closed {
            self.tracker.leak();
        }
    }
}
