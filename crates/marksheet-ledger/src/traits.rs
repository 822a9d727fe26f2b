//! The [`Ledger`] and [`RangeIterator`] traits.

use crate::error::LedgerResult;

/// Ledger-wide write sequence number.
pub type Version = u64;

/// A stored value together with the version of the write that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Ordered key-value ledger.
///
/// All implementations must satisfy these invariants:
/// - Single-key operations are atomic with respect to each other.
/// - Keys are ordered lexicographically by their UTF-8 bytes.
/// - Every successful write is assigned a version strictly greater than any
///   version handed out before it.
/// - The ledger never interprets values.
pub trait Ledger: Send + Sync {
    /// Write `value` at `key`, overwriting any prior value.
    ///
    /// Returns the version assigned to this write.
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<Version>;

    /// Read the value at `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.get_versioned(key)?.map(|v| v.value))
    }

    /// Read the value at `key` together with its current version.
    fn get_versioned(&self, key: &str) -> LedgerResult<Option<VersionedValue>>;

    /// Write `value` at `key` only if the key's current version equals
    /// `expected`. `None` requires the key to be absent.
    ///
    /// Fails with [`crate::LedgerError::VersionMismatch`] otherwise, leaving
    /// the stored value untouched.
    fn put_if_version(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<Version>,
    ) -> LedgerResult<Version>;

    /// Open an iterator over all entries with `start <= key < end`, in key
    /// order.
    ///
    /// `start == end` yields nothing. `start > end` is an error. The caller
    /// owns the iterator and must [`RangeIterator::close`] it.
    fn range_scan(&self, start: &str, end: &str) -> LedgerResult<Box<dyn RangeIterator>>;
}

/// Scoped cursor over a key range.
///
/// The iterator holds a backend resource until `close` is called. Closing
/// twice is a no-op; reading after close fails with
/// [`crate::LedgerError::IteratorClosed`].
pub trait RangeIterator: Send {
    /// Returns `true` if another entry is available.
    fn has_next(&self) -> bool;

    /// Advance and return the next `(key, value)` entry, or `None` when the
    /// range is exhausted.
    fn next_entry(&mut self) -> LedgerResult<Option<(String, Vec<u8>)>>;

    /// Release the backend resource held by this iterator.
    fn close(&mut self) -> LedgerResult<()>;
}
