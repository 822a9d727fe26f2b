//! Ordered key-value ledger substrate for Marksheet.
//!
//! The ledger is the lowest layer of the system: an opaque byte store keyed by
//! strings, ordered lexicographically by key. Record semantics live one layer
//! up in `marksheet-store`; nothing here interprets values.
//!
//! # Primitives
//!
//! - [`Ledger::put`] / [`Ledger::get`] -- atomic single-key write and read
//! - [`Ledger::put_if_version`] -- conditional write for optimistic concurrency
//! - [`Ledger::range_scan`] -- scoped iterator over a half-open key range
//!
//! # Backends
//!
//! - [`InMemoryLedger`] -- `BTreeMap`-backed ledger for tests and embedding
//! - [`FileLedger`] -- in-memory state plus a CRC-framed append-only log that
//!   is replayed on open
//!
//! # Design Rules
//!
//! 1. Every successful write takes the next ledger-wide version number.
//! 2. Range iterators read from a snapshot taken when the scan opens.
//! 3. An iterator must be closed exactly once; backends count open iterators.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod iter;
pub mod memory;
pub mod state;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use file::{FileLedger, SyncMode};
pub use iter::{IteratorTracker, SnapshotIterator};
pub use memory::InMemoryLedger;
pub use traits::{Ledger, RangeIterator, Version, VersionedValue};
