//! Sort keys and comparators for snapshot listings.
//!
//! Seven dimensions can order a listing. Every comparator ends with the same
//! tie-break on snapshot identity (name, then uuid) so the order is total
//! and deterministic. The descending comparator is the exact reverse of the
//! ascending one.

use crate::error::ListingError;
use crate::model::{SnapshotDetails, SnapshotInfo};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Dimension a listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortKey {
    #[default]
    StartTime,
    Name,
    Duration,
    Indices,
    Shards,
    FailedShards,
    Repository,
}

impl SortKey {
    pub const ALL: [Self; 7] = [
        Self::StartTime,
        Self::Name,
        Self::Duration,
        Self::Indices,
        Self::Shards,
        Self::FailedShards,
        Self::Repository,
    ];

    /// Canonical query-parameter token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartTime => "start_time",
            Self::Name => "name",
            Self::Duration => "duration",
            Self::Indices => "index_count",
            Self::Shards => "shard_count",
            Self::FailedShards => "failed_shard_count",
            Self::Repository => "repository",
        }
    }

    /// Parse a canonical token.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidArgument`] for anything but the seven
    /// canonical names.
    pub fn of(token: &str) -> Result<Self, ListingError> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == token)
            .ok_or_else(|| {
                ListingError::invalid_argument(format!(
                    "unknown sort key '{token}': expected one of start_time, name, duration, \
                     index_count, shard_count, failed_shard_count, repository"
                ))
            })
    }

    /// Whether the sort value is an integer.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Name | Self::Repository)
    }

    /// Integer sort value of `info`, for numeric keys.
    #[must_use]
    pub fn numeric_value(self, info: &SnapshotInfo) -> Option<i64> {
        match self {
            Self::StartTime => Some(info.start_time),
            Self::Duration => Some(info.duration()),
            Self::Indices => Some(i64::try_from(info.index_count()).unwrap_or(i64::MAX)),
            Self::Shards => Some(i64::from(info.total_shards)),
            Self::FailedShards => Some(i64::from(info.failed_shards)),
            Self::Name | Self::Repository => None,
        }
    }

    /// Sort value of `info` rendered the way cursors carry it.
    #[must_use]
    pub fn render_value(self, info: &SnapshotInfo) -> String {
        match self {
            Self::Name => info.name().to_string(),
            Self::Repository => info.repository.clone(),
            _ => self
                .numeric_value(info)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    }

    /// Whether catalogue metadata alone can decide a threshold for this key.
    ///
    /// Start time and duration need both catalogue timestamps.
    #[must_use]
    pub fn can_preflight(self, details: Option<&SnapshotDetails>) -> bool {
        match self {
            Self::Name | Self::Indices | Self::Repository => true,
            Self::StartTime | Self::Duration => {
                details.is_some_and(SnapshotDetails::has_timestamps)
            }
            Self::Shards | Self::FailedShards => false,
        }
    }

    /// Comparator for this key in the given direction.
    #[must_use]
    pub const fn comparator(self, order: SortOrder) -> SnapshotComparator {
        SnapshotComparator { key: self, order }
    }

    fn compare_ascending(self, a: &SnapshotInfo, b: &SnapshotInfo) -> Ordering {
        let primary = match self {
            Self::StartTime => a.start_time.cmp(&b.start_time),
            Self::Name => a.name().cmp(b.name()),
            Self::Duration => a.duration().cmp(&b.duration()),
            Self::Indices => a.index_count().cmp(&b.index_count()),
            Self::Shards => a.total_shards.cmp(&b.total_shards),
            Self::FailedShards => a.failed_shards.cmp(&b.failed_shards),
            Self::Repository => a.repository.cmp(&b.repository),
        };
        primary.then_with(|| a.cmp_identity(b))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, ListingError> {
        Self::of(s)
    }
}

impl TryFrom<String> for SortKey {
    type Error = ListingError;

    fn try_from(value: String) -> Result<Self, ListingError> {
        Self::of(&value)
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.as_str().to_string()
    }
}

/// Direction of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, ListingError> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(ListingError::invalid_argument(format!(
                "unknown sort order '{other}': expected asc or desc"
            ))),
        }
    }
}

/// Total order over descriptors for one key and direction.
///
/// Plain data, so it is `Copy` and freely shared across producer threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotComparator {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SnapshotComparator {
    #[must_use]
    pub fn compare(&self, a: &SnapshotInfo, b: &SnapshotInfo) -> Ordering {
        let ascending = self.key.compare_ascending(a, b);
        match self.order {
            SortOrder::Asc => ascending,
            SortOrder::Desc => ascending.reverse(),
        }
    }

    /// Sort a slice in place by this comparator.
    pub fn sort<T: AsRef<SnapshotInfo>>(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a.as_ref(), b.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SnapshotId, SnapshotState};

    fn info(repo: &str, name: &str, uuid: &str, start: i64, end: i64) -> SnapshotInfo {
        SnapshotInfo {
            repository: repo.to_string(),
            snapshot: SnapshotId::new(name, uuid),
            start_time: start,
            end_time: end,
            indices: Default::default(),
            total_shards: 1,
            failed_shards: 0,
            state: SnapshotState::Success,
        }
    }

    #[test]
    fn parses_every_canonical_token() {
        for key in SortKey::ALL {
            assert_eq!(SortKey::of(key.as_str()), Ok(key));
            assert_eq!(key.to_string().parse::<SortKey>(), Ok(key));
        }
    }

    #[test]
    fn rejects_unknown_tokens() {
        for token in ["START_TIME", "indices", "", "shards"] {
            let err = SortKey::of(token).expect_err("must reject");
            assert!(matches!(err, ListingError::InvalidArgument(_)), "{token}");
        }
        assert!("ascending".parse::<SortOrder>().is_err());
    }

    #[test]
    fn ties_break_on_name_then_uuid() {
        let cmp = SortKey::StartTime.comparator(SortOrder::Asc);
        let a = info("r", "a", "2", 100, 200);
        let b = info("r", "a", "1", 100, 200);
        let c = info("r", "b", "0", 100, 200);
        let mut items = vec![&c, &a, &b];
        items.sort_by(|x, y| cmp.compare(x, y));
        assert_eq!(items, vec![&b, &a, &c]);
    }

    #[test]
    fn descending_reverses_ascending() {
        let a = info("r1", "a", "1", 100, 150);
        let b = info("r2", "b", "1", 50, 400);
        for key in SortKey::ALL {
            let asc = key.comparator(SortOrder::Asc).compare(&a, &b);
            let desc = key.comparator(SortOrder::Desc).compare(&a, &b);
            assert_eq!(asc, desc.reverse(), "{key}");
        }
    }

    #[test]
    fn render_value_matches_key() {
        let a = info("r1", "snap-1", "u", 100, 175);
        assert_eq!(SortKey::StartTime.render_value(&a), "100");
        assert_eq!(SortKey::Duration.render_value(&a), "75");
        assert_eq!(SortKey::Name.render_value(&a), "snap-1");
        assert_eq!(SortKey::Repository.render_value(&a), "r1");
        assert_eq!(SortKey::Shards.render_value(&a), "1");
        assert_eq!(SortKey::Indices.render_value(&a), "0");
    }

    #[test]
    fn preflight_availability() {
        let full = SnapshotDetails {
            start_time: Some(1),
            end_time: Some(2),
        };
        let partial = SnapshotDetails {
            start_time: Some(1),
            end_time: None,
        };
        assert!(SortKey::Name.can_preflight(None));
        assert!(SortKey::Indices.can_preflight(None));
        assert!(SortKey::Repository.can_preflight(None));
        assert!(SortKey::StartTime.can_preflight(Some(&full)));
        assert!(!SortKey::StartTime.can_preflight(Some(&partial)));
        assert!(!SortKey::StartTime.can_preflight(None));
        assert!(!SortKey::Duration.can_preflight(Some(&partial)));
        assert!(!SortKey::Shards.can_preflight(Some(&full)));
        assert!(!SortKey::FailedShards.can_preflight(Some(&full)));
    }

    #[test]
    fn serde_uses_canonical_tokens() {
        let json = serde_json::to_string(&SortKey::FailedShards).expect("serialize");
        assert_eq!(json, "\"failed_shard_count\"");
        let key: SortKey = serde_json::from_str("\"index_count\"").expect("deserialize");
        assert_eq!(key, SortKey::Indices);
        assert!(serde_json::from_str::<SortKey>("\"bogus\"").is_err());
    }
}
