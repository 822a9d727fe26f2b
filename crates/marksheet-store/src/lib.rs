//! Keyed record store for Marksheet.
//!
//! This crate turns the opaque byte ledger from `marksheet-ledger` into a
//! collection of fixed-schema student records ("marksheets") addressed by
//! string keys.
//!
//! # Modules
//!
//! - [`record`] -- the [`Record`] entity and enumeration results
//! - [`codec`] -- JSON encoding of records on the ledger boundary
//! - [`keys`] -- seed key naming and the [`ScanWindow`] used by enumeration
//! - [`filter`] -- equality predicates on record fields
//! - [`store`] -- [`RecordStore`]: create, get, scan, and read-modify-write update
//! - [`seed`] -- the default dataset and the reset-to-defaults [`Seeder`]
//! - [`service`] -- the caller-facing [`Marksheet`] facade and lookup strategies
//! - [`config`] -- [`StoreConfig`], loadable from TOML
//!
//! # Design Rules
//!
//! 1. Keys are never derived from record content; the store never deduplicates.
//! 2. Decoding never falls back to a blank record; malformed bytes are an error.
//! 3. Ledger failures are surfaced to the caller and never retried here.
//! 4. Every range iterator is closed exactly once, on every exit path.

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod keys;
pub mod record;
pub mod seed;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::CodecError;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use filter::{Criterion, Field};
pub use keys::{KeyScheme, ScanWindow};
pub use record::{QueryResult, Record, Versioned};
pub use seed::{default_dataset, Seeder};
pub use service::{LookupStrategy, Marksheet};
pub use store::{RecordStore, WriteMode};
