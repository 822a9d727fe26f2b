//! Error types for record store operations.

use marksheet_ledger::{LedgerError, Version};
use thiserror::Error;

use crate::codec::CodecError;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The ledger failed to serve a read or a range scan.
    #[error("failed to read {target} from ledger: {source}")]
    StoreRead {
        target: String,
        #[source]
        source: LedgerError,
    },

    /// The ledger rejected or failed a write.
    #[error("failed to write {key} to ledger: {source}")]
    StoreWrite {
        key: String,
        #[source]
        source: LedgerError,
    },

    /// No record exists at the key, or no record matched a filtered lookup.
    #[error("{0} does not exist")]
    NotFound(String),

    /// The bytes stored at a key are not a valid record.
    #[error("corrupt record at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    /// A record could not be encoded for storage.
    #[error("cannot encode record for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    /// The key changed between the read and the conditional write of an
    /// optimistic update.
    #[error("update conflict on {key}: read at version {expected:?}, ledger now at {actual:?}")]
    Conflict {
        key: String,
        expected: Option<Version>,
        actual: Option<Version>,
    },

    /// A seed index does not fit the key scheme.
    #[error("seed index {index} outside key capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },

    /// Every key the scan window can hold is taken.
    #[error("no free key left among {capacity} slots")]
    NoFreeKey { capacity: usize },

    /// A record lacks a field the operation needs.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Invalid store configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` for [`StoreError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;
