//! Snapshot descriptors and per-repository catalogue metadata.
//!
//! A [`SnapshotInfo`] is the expensive, fully loaded record. A
//! [`RepositoryCatalogue`] is the cheap metadata a repository keeps in memory:
//! which snapshots exist, their timestamps when known, and which snapshots
//! contain each index. Listings consult the catalogue first and only load
//! descriptors the catalogue cannot rule out.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Identity of one snapshot: a name plus a uuid unique across its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId {
    pub name: String,
    pub uuid: String,
}

impl SnapshotId {
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.uuid)
    }
}

/// Lifecycle state of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    InProgress,
    #[default]
    Success,
    Partial,
    Failed,
    Incompatible,
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Incompatible => "incompatible",
        })
    }
}

/// A fully loaded snapshot descriptor.
///
/// Immutable once loaded. Listings pass descriptors around as
/// `Arc<SnapshotInfo>` and never clone the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub repository: String,
    pub snapshot: SnapshotId,
    /// Epoch millis.
    pub start_time: i64,
    /// Epoch millis. Zero while the snapshot is still running.
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub indices: BTreeSet<String>,
    #[serde(default)]
    pub total_shards: u32,
    #[serde(default)]
    pub failed_shards: u32,
    #[serde(default)]
    pub state: SnapshotState,
}

impl SnapshotInfo {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    #[must_use]
    pub const fn duration(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time)
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Compare by snapshot identity: name, then uuid.
    #[must_use]
    pub fn cmp_identity(&self, other: &Self) -> Ordering {
        self.snapshot.cmp(&other.snapshot)
    }
}

impl AsRef<Self> for SnapshotInfo {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// Timing details a repository catalogue may carry for a snapshot.
///
/// Older catalogue formats did not record timestamps, so either may be
/// unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotDetails {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl SnapshotDetails {
    #[must_use]
    pub const fn has_timestamps(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }

    /// Duration when both timestamps are known.
    #[must_use]
    pub fn duration(&self) -> Option<i64> {
        Some(self.end_time?.saturating_sub(self.start_time?))
    }
}

/// Identity of an index inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId {
    pub name: String,
    pub id: String,
}

/// Cheap, pre-loaded metadata for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryCatalogue {
    /// Every snapshot in the repository, with details when the catalogue has them.
    pub snapshots: HashMap<SnapshotId, Option<SnapshotDetails>>,
    /// Which snapshots contain each index.
    pub indices: HashMap<IndexId, HashSet<SnapshotId>>,
}

impl RepositoryCatalogue {
    #[must_use]
    pub fn details(&self, id: &SnapshotId) -> Option<&SnapshotDetails> {
        self.snapshots.get(id).and_then(Option::as_ref)
    }

    /// Number of indices whose snapshot set contains `id`.
    ///
    /// Linear in the number of indices in the repository.
    #[must_use]
    pub fn index_count(&self, id: &SnapshotId) -> usize {
        self.indices
            .values()
            .filter(|snapshots| snapshots.contains(id))
            .count()
    }

    /// Snapshot identities in a stable order.
    #[must_use]
    pub fn snapshot_ids(&self) -> Vec<&SnapshotId> {
        let mut ids: Vec<&SnapshotId> = self.snapshots.keys().collect();
        ids.sort();
        ids
    }

    /// Register a snapshot and its indices.
    pub fn insert(&mut self, info: &SnapshotInfo, details: Option<SnapshotDetails>) {
        self.snapshots.insert(info.snapshot.clone(), details);
        for index in &info.indices {
            let index_id = IndexId {
                name: index.clone(),
                id: format!("{}-{index}", info.repository),
            };
            self.indices
                .entry(index_id)
                .or_default()
                .insert(info.snapshot.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, indices: &[&str]) -> SnapshotInfo {
        SnapshotInfo {
            repository: "repo".to_string(),
            snapshot: SnapshotId::new(name, format!("{name}-uuid")),
            start_time: 10,
            end_time: 25,
            indices: indices.iter().map(ToString::to_string).collect(),
            total_shards: 3,
            failed_shards: 0,
            state: SnapshotState::Success,
        }
    }

    #[test]
    fn duration_is_end_minus_start() {
        assert_eq!(info("a", &[]).duration(), 15);
        let details = SnapshotDetails {
            start_time: Some(5),
            end_time: None,
        };
        assert_eq!(details.duration(), None);
        assert!(!details.has_timestamps());
    }

    #[test]
    fn catalogue_counts_indices_per_snapshot() {
        let a = info("a", &["logs", "metrics"]);
        let b = info("b", &["logs"]);
        let mut catalogue = RepositoryCatalogue::default();
        catalogue.insert(&a, None);
        catalogue.insert(&b, None);

        assert_eq!(a.index_count(), 2);
        assert_eq!(catalogue.index_count(&a.snapshot), 2);
        assert_eq!(catalogue.index_count(&b.snapshot), 1);
        assert_eq!(catalogue.index_count(&SnapshotId::new("c", "x")), 0);
        assert!(catalogue.details(&a.snapshot).is_none());
    }

    #[test]
    fn identity_orders_by_name_then_uuid() {
        let x = SnapshotId::new("snap", "b");
        let y = SnapshotId::new("snap", "a");
        let z = SnapshotId::new("alpha", "z");
        let mut ids = vec![x.clone(), y.clone(), z.clone()];
        ids.sort();
        assert_eq!(ids, vec![z, y, x]);
    }

    #[test]
    fn state_deserializes_from_snake_case() {
        let state: SnapshotState = serde_json::from_str("\"in_progress\"").expect("parse state");
        assert_eq!(state, SnapshotState::InProgress);
        assert_eq!(state.to_string(), "in_progress");
    }
}
