//! Error types for ledger operations.

use thiserror::Error;

use crate::traits::Version;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The range start sorts after its end.
    #[error("invalid range: start {start:?} sorts after end {end:?}")]
    InvalidRange { start: String, end: String },

    /// A conditional write found a different version than expected.
    #[error("version mismatch for {key}: expected {expected:?}, found {actual:?}")]
    VersionMismatch {
        key: String,
        expected: Option<Version>,
        actual: Option<Version>,
    },

    /// The range iterator was used after `close`.
    #[error("range iterator is closed")]
    IteratorClosed,

    /// An internal lock was poisoned by a panicking writer.
    #[error("ledger lock poisoned")]
    LockPoisoned,

    /// The backend cannot serve the request.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure of a log frame.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a file-backed ledger.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
