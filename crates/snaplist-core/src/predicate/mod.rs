//! Listing filters.
//!
//! Two independent families:
//!
//! - [`AfterPredicate`]: excludes everything at or before a cursor. Runs
//!   on loaded descriptors.
//! - [`ThresholdPredicate`]: keeps everything at or beyond a
//!   `from_sort_value`. Tries a cheap decision from catalogue metadata
//!   ([`ThresholdPredicate::preflight_test`]) before the descriptor is
//!   loaded and falls back to [`ThresholdPredicate::full_test`] when the
//!   catalogue cannot decide.
//!
//! Both are immutable values built once per request and shared by
//! reference across producer threads.

mod after;
mod threshold;

pub use after::AfterPredicate;
pub use threshold::{PreflightResult, ThresholdPredicate};

use crate::error::ListingError;
use crate::sort::SortKey;
use std::cmp::Ordering;

/// Parse a raw sort value for a numeric key.
pub(crate) fn parse_numeric(raw: &str, key: SortKey, what: &str) -> Result<i64, ListingError> {
    raw.parse::<i64>().map_err(|_| {
        ListingError::invalid_argument(format!(
            "{what} '{raw}' is not a valid integer for sort key {key}"
        ))
    })
}

/// Compare `(primary, secondary)` pairs lexicographically.
pub(crate) fn compare_pair(a: (&str, &str), b: (&str, &str)) -> Ordering {
    a.0.cmp(b.0).then_with(|| a.1.cmp(b.1))
}
