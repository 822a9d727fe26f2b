//! Snapshot-backed range iterator shared by the ledger backends.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::RangeIterator;

/// Counts iterators a backend has handed out and how many were closed.
///
/// Cloning shares the counters.
#[derive(Clone, Debug, Default)]
pub struct IteratorTracker {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl IteratorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of iterators opened and not yet closed.
    pub fn open_count(&self) -> usize {
        let opened = self.opened.load(Ordering::SeqCst);
        let closed = self.closed.load(Ordering::SeqCst);
        opened.saturating_sub(closed)
    }

    /// Total number of iterators ever opened.
    pub fn opened_total(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn on_open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn on_close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Iterator over a copy of the entries that were in range when it opened.
///
/// Writes that land after the scan opens are not observed.
pub struct SnapshotIterator {
    entries: VecDeque<(String, Vec<u8>)>,
    tracker: IteratorTracker,
    closed: bool,
}

impl SnapshotIterator {
    /// Wrap a materialized range and register it with `tracker`.
    pub fn new(entries: Vec<(String, Vec<u8>)>, tracker: IteratorTracker) -> Self {
        tracker.on_open();
        Self {
            entries: entries.into(),
            tracker,
            closed: false,
        }
    }

    /// Entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl RangeIterator for SnapshotIterator {
    fn has_next(&self) -> bool {
        !self.closed && !self.entries.is_empty()
    }

    fn next_entry(&mut self) -> LedgerResult<Option<(String, Vec<u8>)>> {
        if self.closed {
            return Err(LedgerError::IteratorClosed);
        }
        Ok(self.entries.pop_front())
    }

    fn close(&mut self) -> LedgerResult<()> {
        if !self.closed {
            self.closed = true;
            self.entries.clear();
            self.tracker.on_close();
        }
        Ok(())
    }
}

impl Drop for SnapshotIterator {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                remaining = self.entries.len(),
                "range iterator dropped without close"
            );
        }
    }
}

impl std::fmt::Debug for SnapshotIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotIterator")
            .field("remaining", &self.entries.len())
            .field("closed", &self.closed)
            .finish()
    }
}
