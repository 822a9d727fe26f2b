//! The caller-facing [`Marksheet`] service.
//!
//! `Marksheet` bundles a [`RecordStore`], a [`KeyScheme`], the enumeration
//! window, and a [`LookupStrategy`] deciding how an identifier passed to
//! `find`/`update` is turned into a key.

use std::sync::Arc;

use marksheet_ledger::Ledger;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Criterion, Field};
use crate::keys::{KeyScheme, ScanWindow};
use crate::record::{QueryResult, Record};
use crate::seed::{default_dataset, Seeder};
use crate::store::RecordStore;

/// How an identifier is resolved to a primary key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum LookupStrategy {
    /// The identifier is the key.
    #[default]
    DirectKey,
    /// Scan the window and take the first record (in key order) whose
    /// `field` equals the identifier. Costs a full window scan per lookup.
    SecondaryAttribute { field: Field },
}

impl LookupStrategy {
    /// Secondary lookup on the roll number.
    pub fn by_rollno() -> Self {
        Self::SecondaryAttribute {
            field: Field::RollNo,
        }
    }
}

/// Student marksheet service over an injected ledger.
pub struct Marksheet {
    store: RecordStore,
    scheme: KeyScheme,
    window: ScanWindow,
    lookup: LookupStrategy,
}

impl Marksheet {
    /// Build the service from `config` over `ledger`.
    pub fn new(ledger: Arc<dyn Ledger>, config: &StoreConfig) -> StoreResult<Self> {
        let scheme = config.key_scheme()?;
        let window = config.scan_window()?;
        Ok(Self {
            store: RecordStore::new(ledger).with_write_mode(config.write_mode),
            scheme,
            window,
            lookup: config.lookup,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn scheme(&self) -> &KeyScheme {
        &self.scheme
    }

    pub fn window(&self) -> &ScanWindow {
        &self.window
    }

    pub fn lookup(&self) -> LookupStrategy {
        self.lookup
    }

    /// Reset the seeded keys to the default dataset.
    ///
    /// Overwrites `seed_key(0..10)` unconditionally; updates made to those
    /// keys since the last seed are lost.
    pub fn seed(&self) -> StoreResult<Vec<String>> {
        Seeder::new(&self.store, &self.scheme).seed(&default_dataset())
    }

    /// Write `record` at the caller-supplied `key`, used verbatim.
    pub fn create(&self, key: &str, record: &Record) -> StoreResult<()> {
        self.store.create(key, record)?;
        info!(key, "record created");
        Ok(())
    }

    /// Store `record` under a key the configured lookup strategy resolves.
    ///
    /// With [`LookupStrategy::DirectKey`] the key is the record's roll
    /// number. With [`LookupStrategy::SecondaryAttribute`] the record takes
    /// the first free seed key, so it sits inside the scan window where
    /// `find`, `update` and `get_all` see it. Records added this way are
    /// overwritten by a later [`seed`](Self::seed) that reaches their slot.
    pub fn add(&self, record: &Record) -> StoreResult<QueryResult> {
        let key = match self.lookup {
            LookupStrategy::DirectKey => {
                let key = record.rollno.clone().ok_or_else(|| {
                    StoreError::InvalidRecord("a roll number is required as the key".into())
                })?;
                self.store.create(&key, record)?;
                key
            }
            LookupStrategy::SecondaryAttribute { .. } => self.claim_free_key(record)?,
        };
        info!(key = %key, "record added");
        Ok(QueryResult::new(key, record.clone()))
    }

    /// Point lookup by primary key, regardless of lookup strategy.
    pub fn get(&self, key: &str) -> StoreResult<Record> {
        self.store.get(key)
    }

    /// Locate a record by identifier using the configured strategy.
    pub fn find(&self, identifier: &str) -> StoreResult<QueryResult> {
        match self.lookup {
            LookupStrategy::DirectKey => {
                let record = self.store.get(identifier)?;
                Ok(QueryResult::new(identifier, record))
            }
            LookupStrategy::SecondaryAttribute { field } => self
                .store
                .find_first(&self.window, &Criterion::new(field, identifier)),
        }
    }

    /// Every record in the scan window, in key order.
    pub fn get_all(&self) -> StoreResult<Vec<QueryResult>> {
        self.store.scan(&self.window)
    }

    /// Set the mark of the record `identifier` resolves to.
    ///
    /// Every other field keeps its stored value.
    pub fn update(&self, identifier: &str, new_mark: &str) -> StoreResult<QueryResult> {
        let key = self.resolve_key(identifier)?;
        let record = self
            .store
            .update(&key, |record| record.mark = new_mark.to_string())?;
        info!(identifier, key = %key, mark = new_mark, "mark updated");
        Ok(QueryResult { key, record })
    }

    fn claim_free_key(&self, record: &Record) -> StoreResult<String> {
        for index in 0..self.scheme.capacity() {
            let key = self.scheme.seed_key(index)?;
            match self.store.create_new(&key, record) {
                Ok(_) => return Ok(key),
                Err(e) if e.is_conflict() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::NoFreeKey {
            capacity: self.scheme.capacity(),
        })
    }

    fn resolve_key(&self, identifier: &str) -> StoreResult<String> {
        match self.lookup {
            LookupStrategy::DirectKey => Ok(identifier.to_string()),
            LookupStrategy::SecondaryAttribute { .. } => Ok(self.find(identifier)?.key),
        }
    }
}

impl std::fmt::Debug for Marksheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marksheet")
            .field("scheme", &self.scheme)
            .field("window", &self.window)
            .field("lookup", &self.lookup)
            .field("write_mode", &self.store.write_mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WriteMode;
    use marksheet_ledger::InMemoryLedger;

    fn service(config: StoreConfig) -> (Arc<InMemoryLedger>, Marksheet) {
        let ledger = Arc::new(InMemoryLedger::new());
        let service = Marksheet::new(ledger.clone(), &config).unwrap();
        (ledger, service)
    }

    fn direct() -> (Arc<InMemoryLedger>, Marksheet) {
        service(StoreConfig::default())
    }

    fn by_rollno() -> (Arc<InMemoryLedger>, Marksheet) {
        service(StoreConfig {
            lookup: LookupStrategy::by_rollno(),
            ..StoreConfig::default()
        })
    }

    #[test]
    fn get_all_after_seed_returns_seed_keys_in_order() {
        let (_, svc) = direct();
        svc.seed().unwrap();

        let all = svc.get_all().unwrap();
        let keys: Vec<String> = all.iter().map(|r| r.key.clone()).collect();
        let expected: Vec<String> = (0..10).map(|i| svc.scheme().seed_key(i).unwrap()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn get_all_on_empty_store() {
        let (ledger, svc) = direct();
        assert!(svc.get_all().unwrap().is_empty());
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn create_then_get_round_trips() {
        let (_, svc) = direct();
        let record = Record::new("Asha", "2019", "ICSE", "77").with_rollno("31");
        svc.create("31", &record).unwrap();
        assert_eq!(svc.get("31").unwrap(), record);
    }

    #[test]
    fn get_never_written_is_not_found() {
        let (_, svc) = direct();
        assert!(svc.get("Student3").unwrap_err().is_not_found());
    }

    #[test]
    fn direct_update_scenario() {
        let (_, svc) = direct();
        svc.seed().unwrap();
        let before3 = svc.get("Student3").unwrap();
        let before7 = svc.get("Student7").unwrap();

        let updated = svc.update("Student3", "100").unwrap();
        assert_eq!(updated.key, "Student3");

        let after3 = svc.get("Student3").unwrap();
        assert_eq!(after3.mark, "100");
        assert_eq!(after3.name, before3.name);
        assert_eq!(after3.year, before3.year);
        assert_eq!(after3.board, before3.board);
        assert_eq!(after3.rollno, before3.rollno);
        assert_eq!(svc.get("Student7").unwrap(), before7);
    }

    #[test]
    fn direct_update_of_missing_key_is_not_found() {
        let (ledger, svc) = direct();
        svc.seed().unwrap();
        let err = svc.update("Student42", "1").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(ledger.len(), 10);
    }

    #[test]
    fn secondary_update_scenario() {
        let (_, svc) = by_rollno();
        svc.seed().unwrap();

        let updated = svc.update("290319087", "75").unwrap();
        assert_eq!(updated.key, "Student0");
        assert_eq!(updated.record.mark, "75");
        assert_eq!(svc.get("Student0").unwrap().mark, "75");
        assert_eq!(svc.get("Student0").unwrap().name, "John");
    }

    #[test]
    fn secondary_update_of_unknown_identifier_is_not_found() {
        let (ledger, svc) = by_rollno();
        svc.seed().unwrap();
        let err = svc.update("does-not-exist", "1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "does-not-exist"));
        assert_eq!(ledger.open_iterators(), 0);
    }

    #[test]
    fn secondary_lookup_takes_first_match_in_key_order() {
        let (_, svc) = by_rollno();
        svc.seed().unwrap();
        svc.create("Student8", &Record::new("dup", "2018", "CBSE", "10").with_rollno("290393087"))
            .unwrap();

        let found = svc.find("290393087").unwrap();
        assert_eq!(found.key, "Student1");
        assert_eq!(found.record.name, "jane");
    }

    #[test]
    fn secondary_lookup_ignores_keys_outside_window() {
        let (_, svc) = by_rollno();
        svc.create("4242", &Record::new("x", "y", "z", "1").with_rollno("4242"))
            .unwrap();
        assert!(svc.find("4242").unwrap_err().is_not_found());
    }

    #[test]
    fn add_under_secondary_lookup_is_findable() {
        let (_, svc) = service(StoreConfig {
            key_capacity: 100,
            lookup: LookupStrategy::by_rollno(),
            ..StoreConfig::default()
        });
        svc.seed().unwrap();

        let added = svc
            .add(&Record::new("Asha", "2019", "ICSE", "77").with_rollno("31"))
            .unwrap();
        assert_eq!(added.key, "Student10");
        assert_eq!(svc.find("31").unwrap().key, "Student10");

        svc.update("31", "80").unwrap();
        assert_eq!(svc.get("Student10").unwrap().mark, "80");
        assert_eq!(svc.get_all().unwrap().len(), 11);
    }

    #[test]
    fn add_fills_gaps_and_skips_taken_keys() {
        let (_, svc) = service(StoreConfig {
            key_capacity: 3,
            lookup: LookupStrategy::by_rollno(),
            ..StoreConfig::default()
        });
        svc.create("Student1", &Record::new("x", "y", "z", "1").with_rollno("1"))
            .unwrap();

        let first = svc.add(&Record::new("a", "y", "z", "1").with_rollno("2")).unwrap();
        let second = svc.add(&Record::new("b", "y", "z", "1").with_rollno("3")).unwrap();
        assert_eq!(first.key, "Student0");
        assert_eq!(second.key, "Student2");

        let err = svc.add(&Record::new("c", "y", "z", "1").with_rollno("4")).unwrap_err();
        assert!(matches!(err, StoreError::NoFreeKey { capacity: 3 }));
    }

    #[test]
    fn add_under_direct_lookup_keys_by_rollno() {
        let (_, svc) = direct();
        let added = svc
            .add(&Record::new("Asha", "2019", "ICSE", "77").with_rollno("31"))
            .unwrap();
        assert_eq!(added.key, "31");
        assert_eq!(svc.find("31").unwrap().record.name, "Asha");

        let err = svc.add(&Record::new("NoRoll", "2019", "ICSE", "77")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[test]
    fn direct_find_returns_key() {
        let (_, svc) = direct();
        svc.seed().unwrap();
        let found = svc.find("Student5").unwrap();
        assert_eq!(found.key, "Student5");
        assert_eq!(found.record.name, "Vaish");
    }

    #[test]
    fn caller_keys_inside_window_are_visible() {
        let (_, svc) = direct();
        svc.seed().unwrap();
        // Sorts between Student1 and Student2.
        svc.create("Student1x", &Record::new("x", "y", "z", "1")).unwrap();
        let keys: Vec<String> = svc.get_all().unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(keys.len(), 11);
        assert_eq!(keys[2], "Student1x");
    }

    #[test]
    fn optimistic_mode_flows_from_config() {
        let (_, svc) = service(StoreConfig {
            write_mode: WriteMode::Optimistic,
            ..StoreConfig::default()
        });
        assert_eq!(svc.store().write_mode(), WriteMode::Optimistic);
        svc.seed().unwrap();
        svc.update("Student9", "50").unwrap();
        assert_eq!(svc.get("Student9").unwrap().mark, "50");
    }

    #[test]
    fn lookup_strategy_serde_shape() {
        let json = serde_json::to_value(LookupStrategy::by_rollno()).unwrap();
        assert_eq!(json["strategy"], "secondary-attribute");
        assert_eq!(json["field"], "rollno");
        let direct: LookupStrategy =
            serde_json::from_str(r#"{"strategy":"direct-key"}"#).unwrap();
        assert_eq!(direct, LookupStrategy::DirectKey);
    }
}
