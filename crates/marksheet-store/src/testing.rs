//! Fault-injecting ledger used by the store tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use marksheet_ledger::{
    InMemoryLedger, Ledger, LedgerError, LedgerResult, RangeIterator, Version, VersionedValue,
};

/// Wraps an [`InMemoryLedger`] and fails selected operations on demand.
#[derive(Default)]
pub struct FaultyLedger {
    pub inner: InMemoryLedger,
    pub fail_puts: AtomicBool,
    pub fail_gets: AtomicBool,
    pub fail_scan_open: AtomicBool,
    /// When non-zero, iterators fail after yielding this many entries.
    pub fail_scan_after: AtomicUsize,
}

impl FaultyLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open_iterators(&self) -> usize {
        self.inner.open_iterators()
    }
}

fn injected() -> LedgerError {
    LedgerError::Unavailable("injected fault".into())
}

impl Ledger for FaultyLedger {
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<Version> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.put(key, value)
    }

    fn get_versioned(&self, key: &str) -> LedgerResult<Option<VersionedValue>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.get_versioned(key)
    }

    fn put_if_version(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<Version>,
    ) -> LedgerResult<Version> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.put_if_version(key, value, expected)
    }

    fn range_scan(&self, start: &str, end: &str) -> LedgerResult<Box<dyn RangeIterator>> {
        if self.fail_scan_open.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let inner = self.inner.range_scan(start, end)?;
        match self.fail_scan_after.load(Ordering::SeqCst) {
            0 => Ok(inner),
            n => Ok(Box::new(FailingIterator { inner, remaining: n })),
        }
    }
}

struct FailingIterator {
    inner: Box<dyn RangeIterator>,
    remaining: usize,
}

impl RangeIterator for FailingIterator {
    fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    fn next_entry(&mut self) -> LedgerResult<Option<(String, Vec<u8>)>> {
        if self.remaining == 0 {
            return Err(injected());
        }
        self.remaining -= 1;
        self.inner.next_entry()
    }

    fn close(&mut self) -> LedgerResult<()> {
        self.inner.close()
    }
}
