use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::iter::{IteratorTracker, SnapshotIterator};
use crate::state::LedgerState;
use crate::traits::{Ledger, RangeIterator, Version, VersionedValue};

/// In-memory, `BTreeMap`-based ledger.
///
/// Intended for tests and embedding. All entries are held behind a `RwLock`;
/// values are cloned on read and write. Data is lost when the ledger is
/// dropped.
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
    iterators: IteratorTracker,
}

impl InMemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::new()),
            iterators: IteratorTracker::new(),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.peek("len", LedgerState::len).unwrap_or(0)
    }

    /// Returns `true` if no key has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of every stored key.
    pub fn keys(&self) -> Vec<String> {
        self.peek("keys", LedgerState::keys).unwrap_or_default()
    }

    /// Highest version assigned so far.
    pub fn last_version(&self) -> Version {
        self.peek("last_version", LedgerState::last_version)
            .unwrap_or(0)
    }

    /// Number of range iterators opened and not yet closed.
    pub fn open_iterators(&self) -> usize {
        self.iterators.open_count()
    }

    /// Shared counters for iterators handed out by this ledger.
    pub fn iterator_tracker(&self) -> &IteratorTracker {
        &self.iterators
    }

    /// Read-only accessor for the infallible introspection methods. A
    /// poisoned lock yields `None`; the fallible operations report it as
    /// [`LedgerError::LockPoisoned`].
    fn peek<T>(&self, op: &'static str, f: impl FnOnce(&LedgerState) -> T) -> Option<T> {
        match self.inner.read() {
            Ok(state) => Some(f(&state)),
            Err(_) => {
                warn!(op, "ledger lock poisoned; reporting empty state");
                None
            }
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for InMemoryLedger {
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<Version> {
        let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        let version = state.next_version();
        state.apply(key, value.to_vec(), version);
        debug!(key, version, len = value.len(), "ledger put");
        Ok(version)
    }

    fn get_versioned(&self, key: &str) -> LedgerResult<Option<VersionedValue>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.get(key).cloned())
    }

    fn put_if_version(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<Version>,
    ) -> LedgerResult<Version> {
        let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        state.check_version(key, expected)?;
        let version = state.next_version();
        state.apply(key, value.to_vec(), version);
        debug!(key, version, ?expected, "ledger conditional put");
        Ok(version)
    }

    fn range_scan(&self, start: &str, end: &str) -> LedgerResult<Box<dyn RangeIterator>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let entries = state.range(start, end)?;
        debug!(start, end, count = entries.len(), "ledger range scan");
        Ok(Box::new(SnapshotIterator::new(
            entries,
            self.iterators.clone(),
        )))
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("key_count", &self.len())
            .field("last_version", &self.last_version())
            .field("open_iterators", &self.open_iterators())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(ledger: &InMemoryLedger, start: &str, end: &str) -> Vec<String> {
        let mut it = ledger.range_scan(start, end).unwrap();
        let mut keys = Vec::new();
        while it.has_next() {
            let (key, _) = it.next_entry().unwrap().unwrap();
            keys.push(key);
        }
        it.close().unwrap();
        keys
    }

    // -----------------------------------------------------------------------
    // Put / Get
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let ledger = InMemoryLedger::new();
        ledger.put("Student0", b"alpha").unwrap();
        assert_eq!(ledger.get("Student0").unwrap(), Some(b"alpha".to_vec()));
    }

    #[test]
    fn get_missing_returns_none() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.get("nope").unwrap().is_none());
    }

    #[test]
    fn put_overwrites_and_bumps_version() {
        let ledger = InMemoryLedger::new();
        let v1 = ledger.put("k", b"one").unwrap();
        let v2 = ledger.put("k", b"two").unwrap();
        assert!(v2 > v1);

        let read = ledger.get_versioned("k").unwrap().unwrap();
        assert_eq!(read.value, b"two".to_vec());
        assert_eq!(read.version, v2);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn identical_values_are_not_deduplicated() {
        let ledger = InMemoryLedger::new();
        ledger.put("a", b"same").unwrap();
        ledger.put("b", b"same").unwrap();
        assert_eq!(ledger.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Conditional writes
    // -----------------------------------------------------------------------

    #[test]
    fn put_if_version_succeeds_on_match() {
        let ledger = InMemoryLedger::new();
        let v1 = ledger.put("k", b"one").unwrap();
        let v2 = ledger.put_if_version("k", b"two", Some(v1)).unwrap();
        assert!(v2 > v1);
        assert_eq!(ledger.get("k").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn put_if_version_rejects_stale_version() {
        let ledger = InMemoryLedger::new();
        let v1 = ledger.put("k", b"one").unwrap();
        ledger.put("k", b"interleaved").unwrap();

        let err = ledger.put_if_version("k", b"two", Some(v1)).unwrap_err();
        assert!(matches!(err, LedgerError::VersionMismatch { .. }));
        assert_eq!(ledger.get("k").unwrap(), Some(b"interleaved".to_vec()));
    }

    #[test]
    fn put_if_version_none_requires_absent_key() {
        let ledger = InMemoryLedger::new();
        ledger.put_if_version("k", b"first", None).unwrap();
        let err = ledger.put_if_version("k", b"second", None).unwrap_err();
        assert!(matches!(err, LedgerError::VersionMismatch { .. }));
    }

    // -----------------------------------------------------------------------
    // Range scans
    // -----------------------------------------------------------------------

    #[test]
    fn range_scan_in_key_order() {
        let ledger = InMemoryLedger::new();
        for key in ["Student2", "Student0", "Student1", "Other"] {
            ledger.put(key, b"x").unwrap();
        }
        assert_eq!(
            collect(&ledger, "Student0", "Student99"),
            vec!["Student0", "Student1", "Student2"]
        );
    }

    #[test]
    fn range_scan_on_empty_ledger() {
        let ledger = InMemoryLedger::new();
        assert!(collect(&ledger, "Student0", "Student99").is_empty());
    }

    #[test]
    fn range_scan_is_a_snapshot() {
        let ledger = InMemoryLedger::new();
        ledger.put("a", b"1").unwrap();
        let mut it = ledger.range_scan("a", "z").unwrap();
        ledger.put("b", b"2").unwrap();

        let mut seen = 0;
        while it.next_entry().unwrap().is_some() {
            seen += 1;
        }
        it.close().unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn iterators_are_tracked_until_closed() {
        let ledger = InMemoryLedger::new();
        let mut a = ledger.range_scan("a", "z").unwrap();
        let mut b = ledger.range_scan("a", "z").unwrap();
        assert_eq!(ledger.open_iterators(), 2);

        a.close().unwrap();
        b.close().unwrap();
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn inverted_range_fails() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(
            ledger.range_scan("z", "a"),
            Err(LedgerError::InvalidRange { .. })
        ));
        assert_eq!(ledger.open_iterators(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_puts_get_distinct_versions() {
        use std::sync::Arc;
        use std::thread;

        let ledger = Arc::new(InMemoryLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.put(&format!("k{i}"), b"v").unwrap())
            })
            .collect();

        let mut versions: Vec<Version> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();
        versions.sort_unstable();
        versions.dedup();
        assert_eq!(versions.len(), 8);
        assert_eq!(ledger.last_version(), 8);
    }

    #[test]
    fn poisoned_lock_is_reported_by_operations() {
        let ledger = std::sync::Arc::new(InMemoryLedger::new());
        ledger.put("a", b"1").unwrap();

        let poisoner = ledger.clone();
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the ledger lock");
        })
        .join();
        assert!(joined.is_err());

        assert!(matches!(ledger.get("a"), Err(LedgerError::LockPoisoned)));
        assert!(matches!(ledger.put("b", b"2"), Err(LedgerError::LockPoisoned)));
        assert!(matches!(
            ledger.range_scan("a", "z").map(|_| ()),
            Err(LedgerError::LockPoisoned)
        ));
        assert_eq!(ledger.len(), 0);
        assert!(ledger.keys().is_empty());
        assert_eq!(ledger.last_version(), 0);
    }

    #[test]
    fn debug_format() {
        let ledger = InMemoryLedger::new();
        ledger.put("x", b"1").unwrap();
        let debug = format!("{ledger:?}");
        assert!(debug.contains("InMemoryLedger"));
        assert!(debug.contains("key_count"));
    }
}
