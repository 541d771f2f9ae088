//! Resource accounting and fault injection for the in-memory collaborators.
//!
//! Every cursor, index reader and sampler handed out by [`crate::MemGraph`]
//! reports its open and close to a [`ResourceTracker`]. Tests use the
//! counters to check that each resource is released exactly once, and the
//! fault knobs to make a chosen release or read fail.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pullgraph_api::{Error, Result};

/// Which physical index reader a close belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    Boost,
    Fallback,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub cursors_opened: u64,
    pub cursors_closed: u64,
    pub readers_opened: u64,
    pub readers_closed: u64,
    pub samplers_opened: u64,
    pub samplers_closed: u64,
    pub property_reads: u64,
    pub double_closes: u64,
    pub leaked: u64,
}

impl ResourceCounts {
    /// Every opened resource was closed once and nothing was dropped open.
    pub fn all_released(&self) -> bool {
        self.cursors_opened == self.cursors_closed
            && self.readers_opened == self.readers_closed
            && self.samplers_opened == self.samplers_closed
            && self.double_closes == 0
            && self.leaked == 0
    }
}

/// Knobs that make a chosen operation fail.
///
/// `*_at` values are 1-based call numbers; 0 disables the fault.
#[derive(Debug, Default)]
pub struct FaultInjection {
    pub fail_cursor_close_at: AtomicU64,
    pub fail_property_read_at: AtomicU64,
    pub fail_relationships_at: AtomicU64,
    pub fail_boost_close: AtomicBool,
    pub fail_fallback_close: AtomicBool,
}

impl FaultInjection {
    pub fn clear(&self) {
        self.fail_cursor_close_at.store(0, Ordering::SeqCst);
        self.fail_property_read_at.store(0, Ordering::SeqCst);
        self.fail_relationships_at.store(0, Ordering::SeqCst);
        self.fail_boost_close.store(false, Ordering::SeqCst);
        self.fail_fallback_close.store(false, Ordering::SeqCst);
    }

    fn hits(call: u64, fail_at: &AtomicU64) -> bool {
        let target = fail_at.load(Ordering::SeqCst);
        target != 0 && call == target
    }
}

#[derive(Debug, Default)]
pub struct ResourceTracker {
    cursors_opened: AtomicU64,
    cursors_closed: AtomicU64,
    readers_opened: AtomicU64,
    readers_closed: AtomicU64,
    samplers_opened: AtomicU64,
    samplers_closed: AtomicU64,
    property_reads: AtomicU64,
    relationship_opens: AtomicU64,
    double_closes: AtomicU64,
    leaked: AtomicU64,
    pub faults: FaultInjection,
}

impl ResourceTracker {
    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            cursors_opened: self.cursors_opened.load(Ordering::SeqCst),
            cursors_closed: self.cursors_closed.load(Ordering::SeqCst),
            readers_opened: self.readers_opened.load(Ordering::SeqCst),
            readers_closed: self.readers_closed.load(Ordering::SeqCst),
            samplers_opened: self.samplers_opened.load(Ordering::SeqCst),
            samplers_closed: self.samplers_closed.load(Ordering::SeqCst),
            property_reads: self.property_reads.load(Ordering::SeqCst),
            double_closes: self.double_closes.load(Ordering::SeqCst),
            leaked: self.leaked.load(Ordering::SeqCst),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.cursors_opened,
            &self.cursors_closed,
            &self.readers_opened,
            &self.readers_closed,
            &self.samplers_opened,
            &self.samplers_closed,
            &self.property_reads,
            &self.relationship_opens,
            &self.double_closes,
            &self.leaked,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub(crate) fn open_cursor(&self) {
        self.cursors_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn open_relationships(&self) -> Result<()> {
        let call = self.relationship_opens.fetch_add(1, Ordering::SeqCst) + 1;
        if FaultInjection::hits(call, &self.faults.fail_relationships_at) {
            return Err(Error::Storage(format!(
                "injected failure opening relationship cursor #{call}"
            )));
        }
        self.open_cursor();
        Ok(())
    }

    pub(crate) fn close_cursor(&self) -> Result<()> {
        let call = self.cursors_closed.fetch_add(1, Ordering::SeqCst) + 1;
        if FaultInjection::hits(call, &self.faults.fail_cursor_close_at) {
            return Err(Error::CloseFailed(format!(
                "injected failure closing cursor #{call}"
            )));
        }
        Ok(())
    }

    pub(crate) fn property_read(&self) -> Result<()> {
        let call = self.property_reads.fetch_add(1, Ordering::SeqCst) + 1;
        if FaultInjection::hits(call, &self.faults.fail_property_read_at) {
            return Err(Error::Storage(format!(
                "injected failure on property read #{call}"
            )));
        }
        Ok(())
    }

    pub(crate) fn open_reader(&self) {
        self.readers_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn close_reader(&self, kind: ReaderKind) -> Result<()> {
        self.readers_closed.fetch_add(1, Ordering::SeqCst);
        let fail = match kind {
            ReaderKind::Boost => &self.faults.fail_boost_close,
            ReaderKind::Fallback => &self.faults.fail_fallback_close,
        };
        if fail.load(Ordering::SeqCst) {
            return Err(Error::CloseFailed(format!(
                "injected failure closing {kind:?} reader"
            )));
        }
        Ok(())
    }

    pub(crate) fn open_sampler(&self) {
        self.samplers_opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn close_sampler(&self) {
        self.samplers_closed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn double_close(&self) {
        self.double_closes.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn leak(&self) {
        self.leaked.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_close_fault_hits_only_the_chosen_call() {
        let tracker = ResourceTracker::default();
        tracker.faults.fail_cursor_close_at.store(2, Ordering::SeqCst);
        tracker.open_cursor();
        tracker.open_cursor();
        tracker.open_cursor();
        assert!(tracker.close_cursor().is_ok());
        assert!(tracker.close_cursor().is_err());
        assert!(tracker.close_cursor().is_ok());
        assert!(tracker.counts().all_released());
    }

    #[test]
    fn reset_clears_counters_but_not_faults() {
        let tracker = ResourceTracker::default();
        tracker.faults.fail_boost_close.store(true, Ordering::SeqCst);
        tracker.open_reader();
        tracker.reset();
        assert_eq!(tracker.counts(), ResourceCounts::default());
        assert!(tracker.close_reader(ReaderKind::Boost).is_err());
        assert!(tracker.close_reader(ReaderKind::Fallback).is_ok());
    }
}
