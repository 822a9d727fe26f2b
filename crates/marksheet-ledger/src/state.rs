//! Ordered key state shared by the in-memory and file-backed ledgers.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{Version, VersionedValue};

/// The current value of every key plus the last version handed out.
#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    entries: BTreeMap<String, VersionedValue>,
    last_version: Version,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest version assigned so far (0 for a fresh ledger).
    pub fn last_version(&self) -> Version {
        self.last_version
    }

    /// Version the next write will receive.
    pub fn next_version(&self) -> Version {
        self.last_version + 1
    }

    pub fn get(&self, key: &str) -> Option<&VersionedValue> {
        self.entries.get(key)
    }

    pub fn version_of(&self, key: &str) -> Option<Version> {
        self.entries.get(key).map(|v| v.version)
    }

    /// Store `value` at `key` under `version`.
    ///
    /// `version` must not be lower than any version applied before; replay
    /// of a log relies on this to rebuild `last_version`.
    pub fn apply(&mut self, key: &str, value: Vec<u8>, version: Version) {
        self.last_version = self.last_version.max(version);
        self.entries
            .insert(key.to_string(), VersionedValue { value, version });
    }

    /// Fail unless `key` is currently at `expected`.
    pub fn check_version(&self, key: &str, expected: Option<Version>) -> LedgerResult<()> {
        let actual = self.version_of(key);
        if actual != expected {
            return Err(LedgerError::VersionMismatch {
                key: key.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Copy out all entries with `start <= key < end`, in key order.
    pub fn range(&self, start: &str, end: &str) -> LedgerResult<Vec<(String, Vec<u8>)>> {
        if start > end {
            return Err(LedgerError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let bounds = (Bound::Included(start), Bound::Excluded(end));
        Ok(self
            .entries
            .range::<str, _>(bounds)
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect())
    }

    /// All entries in key order, with versions.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VersionedValue)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
