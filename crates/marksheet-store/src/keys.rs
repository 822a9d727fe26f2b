//! Seed key naming and the scan window used to enumerate seeded records.
//!
//! Seed keys are `prefix + index`, with the index zero-padded to the number
//! of digits in the largest permitted index. Because every seed key has the
//! same width, lexicographic order (the ledger's order) and numeric order
//! coincide, and the window below bounds exactly the seeded range.
//!
//! Caller-supplied keys bypass the scheme. Any such key that sorts inside the
//! window is visible to enumeration.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Prefix used for seeded keys unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "Student";

/// Number of seed slots unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 10;

/// Half-open lexicographic key range `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanWindow {
    pub start: String,
    pub end: String,
}

impl ScanWindow {
    /// Build a window. Fails if `start` sorts after `end`.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> StoreResult<Self> {
        let window = Self {
            start: start.into(),
            end: end.into(),
        };
        window.validate()?;
        Ok(window)
    }

    /// The fixed `["Student0", "Student99")` window.
    ///
    /// Only correct while seed indices stay single-digit: `"Student10"`
    /// through `"Student19"` sort between `"Student1"` and `"Student2"`, and
    /// `"Student99"` itself is excluded.
    pub fn legacy() -> Self {
        Self {
            start: "Student0".into(),
            end: "Student99".into(),
        }
    }

    /// Returns `true` if `key` falls inside the window.
    pub fn contains(&self, key: &str) -> bool {
        self.start.as_str() <= key && key < self.end.as_str()
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.start > self.end {
            return Err(StoreError::Config(format!(
                "scan window start {:?} sorts after end {:?}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}, {:?})", self.start, self.end)
    }
}

/// Derives storage keys for seeded records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyScheme {
    prefix: String,
    capacity: usize,
    width: usize,
}

impl KeyScheme {
    /// Create a scheme with `capacity` seed slots (`0..capacity`).
    pub fn new(prefix: impl Into<String>, capacity: usize) -> StoreResult<Self> {
        if capacity == 0 {
            return Err(StoreError::Config("key capacity must be at least 1".into()));
        }
        Ok(Self {
            prefix: prefix.into(),
            capacity,
            width: digits(capacity - 1),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Digits used for every index.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Key for seed slot `index`.
    pub fn seed_key(&self, index: usize) -> StoreResult<String> {
        if index >= self.capacity {
            return Err(StoreError::IndexOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        Ok(format!("{}{:0width$}", self.prefix, index, width = self.width))
    }

    /// Inverse of [`KeyScheme::seed_key`]; `None` for keys outside the scheme.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        let digits = key.strip_prefix(self.prefix.as_str())?;
        if digits.len() != self.width || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|i| *i < self.capacity)
    }

    /// The tightest window holding every seed key.
    ///
    /// The end bound is the last seed key followed by `'\0'`, its immediate
    /// lexicographic successor.
    pub fn scan_window(&self) -> ScanWindow {
        let first = format!("{}{:0width$}", self.prefix, 0, width = self.width);
        let last = format!(
            "{}{:0width$}",
            self.prefix,
            self.capacity - 1,
            width = self.width
        );
        ScanWindow {
            start: first,
            end: format!("{last}\0"),
        }
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            capacity: DEFAULT_CAPACITY,
            width: digits(DEFAULT_CAPACITY - 1),
        }
    }
}

fn digits(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}
