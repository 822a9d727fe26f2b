//! Equality predicates used by secondary-attribute lookups.
//!
//! There is no index: every filtered lookup is a full scan of a window.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::Record;

/// A record field a criterion can test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Year,
    Board,
    Mark,
    #[serde(rename = "rollno", alias = "roll")]
    RollNo,
}

impl Field {
    /// Every field, in declaration order.
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Year,
        Field::Board,
        Field::Mark,
        Field::RollNo,
    ];

    /// Storage name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Year => "year",
            Self::Board => "board",
            Self::Mark => "mark",
            Self::RollNo => "rollno",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "year" => Ok(Self::Year),
            "board" => Ok(Self::Board),
            "mark" => Ok(Self::Mark),
            "rollno" | "roll" => Ok(Self::RollNo),
            other => Err(StoreError::Config(format!("unknown record field: {other}"))),
        }
    }
}

/// `field == value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Criterion {
    pub field: Field,
    pub value: String,
}

impl Criterion {
    pub fn new(field: Field, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Shorthand for a roll-number criterion.
    pub fn rollno(value: impl Into<String>) -> Self {
        Self::new(Field::RollNo, value)
    }

    pub fn matches(&self, record: &Record) -> bool {
        matches(record, self)
    }
}

/// Returns `true` if `record` satisfies `criterion`.
///
/// A record without a roll number never matches a roll-number criterion.
pub fn matches(record: &Record, criterion: &Criterion) -> bool {
    record.field(criterion.field) == Some(criterion.value.as_str())
}
