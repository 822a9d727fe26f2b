//! [`RecordStore`]: keyed records over an injected [`Ledger`].

use std::sync::Arc;

use marksheet_ledger::{Ledger, LedgerError, LedgerResult, RangeIterator, Version};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::filter::Criterion;
use crate::keys::ScanWindow;
use crate::record::{QueryResult, Record, Versioned};

/// How [`RecordStore::update`] writes back the mutated record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Read, mutate, unconditional write. Concurrent updates to one key are
    /// last-writer-wins and lost updates go undetected.
    #[default]
    LastWriterWins,
    /// Read with a version, mutate, conditional write. A write that landed
    /// in between fails the update with [`StoreError::Conflict`].
    Optimistic,
}

/// Create, get, scan, and update records in a ledger.
///
/// The store holds no state of its own beyond the ledger handle; any number
/// of stores may share one ledger.
pub struct RecordStore {
    ledger: Arc<dyn Ledger>,
    write_mode: WriteMode,
}

impl RecordStore {
    /// Create a store over `ledger` using [`WriteMode::LastWriterWins`].
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            write_mode: WriteMode::default(),
        }
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Write `record` at `key`, overwriting whatever was there.
    ///
    /// There is no uniqueness check. Returns the ledger version of the write.
    pub fn create(&self, key: &str, record: &Record) -> StoreResult<Version> {
        let bytes = codec::encode(record).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        let version = self
            .ledger
            .put(key, &bytes)
            .map_err(|source| StoreError::StoreWrite {
                key: key.to_string(),
                source,
            })?;
        debug!(key, version, "record written");
        Ok(version)
    }

    /// Write `record` at `key` only if nothing is stored there yet.
    ///
    /// Fails with [`StoreError::Conflict`] when the key is taken.
    pub fn create_new(&self, key: &str, record: &Record) -> StoreResult<Version> {
        self.write_if_version(key, record, None)
    }

    /// Read and decode the record at `key`.
    pub fn get(&self, key: &str) -> StoreResult<Record> {
        self.get_versioned(key).map(|v| v.value)
    }

    /// Read and decode the record at `key` with the version it was read at.
    pub fn get_versioned(&self, key: &str) -> StoreResult<Versioned<Record>> {
        let stored = self
            .ledger
            .get_versioned(key)
            .map_err(|source| StoreError::StoreRead {
                target: key.to_string(),
                source,
            })?;

        let stored = match stored {
            Some(v) if !v.value.is_empty() => v,
            _ => return Err(StoreError::NotFound(key.to_string())),
        };

        let record = codec::decode(&stored.value).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })?;
        Ok(Versioned {
            value: record,
            version: stored.version,
        })
    }

    /// Decode every record in `window`, in key order.
    ///
    /// All-or-nothing: any ledger or decode failure discards the records
    /// already read. The ledger iterator is closed on every path.
    pub fn scan(&self, window: &ScanWindow) -> StoreResult<Vec<QueryResult>> {
        let target = window.to_string();
        let read_err = |source| StoreError::StoreRead {
            target: target.clone(),
            source,
        };

        let iter = self
            .ledger
            .range_scan(&window.start, &window.end)
            .map_err(read_err)?;
        let mut guard = ScanGuard::new(iter);

        let mut results = Vec::new();
        while guard.has_next() {
            let Some((key, bytes)) = guard.next_entry().map_err(read_err)? else {
                break;
            };
            let record = codec::decode(&bytes).map_err(|source| StoreError::Decode {
                key: key.clone(),
                source,
            })?;
            results.push(QueryResult { key, record });
        }

        guard.close().map_err(read_err)?;
        debug!(%window, count = results.len(), "scan complete");
        Ok(results)
    }

    /// Records in `window` satisfying `criterion`, in key order.
    pub fn scan_filtered(
        &self,
        window: &ScanWindow,
        criterion: &Criterion,
    ) -> StoreResult<Vec<QueryResult>> {
        let mut results = self.scan(window)?;
        results.retain(|r| criterion.matches(&r.record));
        Ok(results)
    }

    /// First record in `window` (key order) satisfying `criterion`.
    ///
    /// Fails with [`StoreError::NotFound`] when nothing matches.
    pub fn find_first(&self, window: &ScanWindow, criterion: &Criterion) -> StoreResult<QueryResult> {
        self.scan_filtered(window, criterion)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(criterion.value.clone()))
    }

    /// Read-modify-write the record at `key` and return the written record.
    ///
    /// Not atomic under [`WriteMode::LastWriterWins`]; see [`WriteMode`].
    pub fn update<F>(&self, key: &str, mutator: F) -> StoreResult<Record>
    where
        F: FnOnce(&mut Record),
    {
        match self.write_mode {
            WriteMode::LastWriterWins => {
                let mut record = self.get(key)?;
                mutator(&mut record);
                self.create(key, &record)?;
                Ok(record)
            }
            WriteMode::Optimistic => {
                let Versioned {
                    value: mut record,
                    version,
                } = self.get_versioned(key)?;
                mutator(&mut record);
                self.write_if_version(key, &record, Some(version))
                    .inspect_err(|e| {
                        if let StoreError::Conflict { actual, .. } = e {
                            warn!(key, expected = version, ?actual, "update lost a race with another writer");
                        }
                    })?;
                Ok(record)
            }
        }
    }

    fn write_if_version(
        &self,
        key: &str,
        record: &Record,
        expected: Option<Version>,
    ) -> StoreResult<Version> {
        let bytes = codec::encode(record).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        match self.ledger.put_if_version(key, &bytes, expected) {
            Ok(version) => {
                debug!(key, version, ?expected, "record conditionally written");
                Ok(version)
            }
            Err(LedgerError::VersionMismatch {
                expected, actual, ..
            }) => Err(StoreError::Conflict {
                key: key.to_string(),
                expected,
                actual,
            }),
            Err(source) => Err(StoreError::StoreWrite {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("write_mode", &self.write_mode)
            .finish_non_exhaustive()
    }
}

/// Owns a range iterator and closes it exactly once.
///
/// [`ScanGuard::close`] is the normal path; dropping an unclosed guard (early
/// return, error, unwind) closes the iterator from `Drop`.
struct ScanGuard {
    iter: Box<dyn RangeIterator>,
    closed: bool,
}

impl ScanGuard {
    fn new(iter: Box<dyn RangeIterator>) -> Self {
        Self {
            iter,
            closed: false,
        }
    }

    fn has_next(&self) -> bool {
        self.iter.has_next()
    }

    fn next_entry(&mut self) -> LedgerResult<Option<(String, Vec<u8>)>> {
        self.iter.next_entry()
    }

    fn close(mut self) -> LedgerResult<()> {
        self.closed = true;
        self.iter.close()
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.iter.close() {
                warn!(error = %e, "failed to close range iterator");
            }
        }
    }
}
