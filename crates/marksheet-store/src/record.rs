//! The student record and the shapes it takes in query results.

use marksheet_ledger::Version;
use serde::{Deserialize, Serialize};

use crate::filter::Field;

/// A student marksheet.
///
/// All fields are opaque strings; the store performs no numeric validation.
/// Field names on the storage boundary are `name`, `year`, `board`, `mark`,
/// and `rollno`. The legacy layout (`make`, `model`, `colour`, `owner`) is
/// accepted on read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(alias = "make")]
    pub name: String,
    #[serde(alias = "model")]
    pub year: String,
    #[serde(alias = "colour")]
    pub board: String,
    #[serde(alias = "owner")]
    pub mark: String,
    /// Secondary identifier. Omitted from the encoding when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollno: Option<String>,
}

impl Record {
    /// Create a record without a roll number.
    pub fn new(
        name: impl Into<String>,
        year: impl Into<String>,
        board: impl Into<String>,
        mark: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            year: year.into(),
            board: board.into(),
            mark: mark.into(),
            rollno: None,
        }
    }

    /// Attach a roll number.
    pub fn with_rollno(mut self, rollno: impl Into<String>) -> Self {
        self.rollno = Some(rollno.into());
        self
    }

    /// Read a field by name. Returns `None` only for an absent roll number.
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(&self.name),
            Field::Year => Some(&self.year),
            Field::Board => Some(&self.board),
            Field::Mark => Some(&self.mark),
            Field::RollNo => self.rollno.as_deref(),
        }
    }
}

/// A `(key, record)` pair produced by enumeration. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: Record,
}

impl QueryResult {
    pub fn new(key: impl Into<String>, record: Record) -> Self {
        Self {
            key: key.into(),
            record,
        }
    }
}

/// A decoded value and the ledger version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}
