//! Default dataset and the reset-to-defaults seeder.

use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::keys::KeyScheme;
use crate::record::Record;
use crate::store::RecordStore;

/// The fixed initial dataset: ten marksheets with roll numbers.
pub fn default_dataset() -> Vec<Record> {
    [
        ("John", "2018", "CBSE", "99", "290319087"),
        ("jane", "2017", "ICSE", "92", "290393087"),
        ("Tan", "2018", "CBSE", "85", "2903914087"),
        ("jon", "2018", "ICSE", "86", "290329087"),
        ("Om", "2018", "CBSE", "89", "290379087"),
        ("Vaish", "2018", "CBSE", "94", "20039087"),
        ("Rut", "2016", "GSB", "93", "29031087"),
        ("Rat", "2015", "CBSE", "84", "29035087"),
        ("Vir", "2018", "MSB", "99", "29039287"),
        ("Jo", "2018", "CBSE", "99", "29039487"),
    ]
    .into_iter()
    .map(|(name, year, board, mark, rollno)| Record::new(name, year, board, mark).with_rollno(rollno))
    .collect()
}

/// Writes a dataset at consecutive seed keys.
///
/// Seeding is a reset: it unconditionally overwrites `seed_key(0..n)`,
/// discarding any update applied to those keys since the last seed. Keys
/// outside the seeded range are left alone.
pub struct Seeder<'a> {
    store: &'a RecordStore,
    scheme: &'a KeyScheme,
}

impl<'a> Seeder<'a> {
    pub fn new(store: &'a RecordStore, scheme: &'a KeyScheme) -> Self {
        Self { store, scheme }
    }

    /// Write `records[i]` at `seed_key(i)` and return the keys written.
    ///
    /// Fails before writing anything if the dataset exceeds the scheme's
    /// capacity. A ledger failure part-way leaves earlier keys written.
    pub fn seed(&self, records: &[Record]) -> StoreResult<Vec<String>> {
        if records.len() > self.scheme.capacity() {
            return Err(StoreError::IndexOutOfRange {
                index: records.len() - 1,
                capacity: self.scheme.capacity(),
            });
        }

        let keys = (0..records.len())
            .map(|i| self.scheme.seed_key(i))
            .collect::<StoreResult<Vec<_>>>()?;

        for (key, record) in keys.iter().zip(records) {
            self.store.create(key, record)?;
        }

        info!(count = keys.len(), prefix = self.scheme.prefix(), "seeded records");
        Ok(keys)
    }

    /// Seed [`default_dataset`].
    pub fn seed_defaults(&self) -> StoreResult<Vec<String>> {
        self.seed(&default_dataset())
    }
}
