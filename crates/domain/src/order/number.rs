//! Human-readable order numbers.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Prefix on every order number.
const PREFIX: &str = "AG";

/// A day-scoped, human-readable order number such as `AG-20250115-0007`.
///
/// The daily sequence comes from an atomic per-day counter in the store, so
/// numbers are unique even under concurrent same-day checkouts. Uniqueness
/// is additionally enforced by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Formats an order number for the given day and daily sequence.
    pub fn from_parts(day: NaiveDate, sequence: u32) -> Self {
        Self(format!(
            "{PREFIX}-{:04}{:02}{:02}-{sequence:04}",
            day.year(),
            day.month(),
            day.day()
        ))
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}
