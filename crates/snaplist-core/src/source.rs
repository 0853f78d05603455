//! Where listings read repositories from.
//!
//! [`SnapshotSource`] is the seam between the listing driver and whatever
//! actually stores snapshots. Catalogue reads are cheap; descriptor loads are
//! the expensive reads the predicates try to avoid.
//!
//! [`InMemorySource`] is a complete in-process source. It backs the tests and
//! the `snapls` CLI, which loads it from a JSON fixture:
//!
//! ```json
//! {
//!   "repositories": [
//!     {
//!       "name": "backups",
//!       "snapshots": [
//!         { "name": "nightly-1", "start_time": 100, "end_time": 160,
//!           "indices": ["logs"], "total_shards": 3, "failed_shards": 0,
//!           "state": "success", "catalogue_details": false }
//!       ]
//!     },
//!     { "name": "offsite", "unavailable": "bucket credentials expired" }
//!   ]
//! }
//! ```

use crate::model::{
    RepositoryCatalogue, SnapshotDetails, SnapshotId, SnapshotInfo, SnapshotState,
};
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Read access to snapshot repositories.
///
/// Implementations are shared across producer threads.
pub trait SnapshotSource: Sync {
    /// Names of every repository the source knows.
    fn repositories(&self) -> Vec<String>;

    /// Cheap catalogue metadata for one repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be read.
    fn catalogue(&self, repository: &str) -> Result<RepositoryCatalogue>;

    /// Load one full descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is missing or unreadable.
    fn load_snapshot(&self, repository: &str, id: &SnapshotId) -> Result<Arc<SnapshotInfo>>;
}

#[derive(Debug, Default)]
struct InMemoryRepository {
    snapshots: HashMap<SnapshotId, Arc<SnapshotInfo>>,
    catalogue: RepositoryCatalogue,
    unavailable: Option<String>,
}

/// Repositories held in memory.
#[derive(Debug, Default)]
pub struct InMemorySource {
    repositories: BTreeMap<String, InMemoryRepository>,
    loads: AtomicU64,
}

impl InMemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot to its repository, creating the repository if needed.
    ///
    /// With `catalogue_details` false the catalogue lists the snapshot but
    /// withholds its timestamps, as older catalogue formats do.
    pub fn add_snapshot(
        &mut self,
        info: SnapshotInfo,
        catalogue_details: bool,
    ) -> Arc<SnapshotInfo> {
        let details = catalogue_details.then_some(SnapshotDetails {
            start_time: Some(info.start_time),
            end_time: Some(info.end_time),
        });
        let repository = self.repositories.entry(info.repository.clone()).or_default();
        repository.catalogue.insert(&info, details);
        let info = Arc::new(info);
        repository
            .snapshots
            .insert(info.snapshot.clone(), Arc::clone(&info));
        info
    }

    /// Make every read of `repository` fail with `reason`.
    pub fn mark_unavailable(&mut self, repository: &str, reason: impl Into<String>) {
        self.repositories
            .entry(repository.to_string())
            .or_default()
            .unavailable = Some(reason.into());
    }

    /// Keep `id` in the catalogue but make loading it fail.
    pub fn remove_descriptor(&mut self, repository: &str, id: &SnapshotId) {
        if let Some(repository) = self.repositories.get_mut(repository) {
            repository.snapshots.remove(id);
        }
    }

    /// Number of descriptor loads served so far.
    #[must_use]
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Build a source from a JSON fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the fixture layout.
    pub fn from_fixture_json(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json).context("invalid snapshot fixture")?;
        let mut source = Self::new();
        for repository in fixture.repositories {
            source.repositories.entry(repository.name.clone()).or_default();
            if let Some(reason) = repository.unavailable {
                source.mark_unavailable(&repository.name, reason);
            }
            for snapshot in repository.snapshots {
                let catalogue_details = snapshot.catalogue_details;
                source.add_snapshot(snapshot.into_info(&repository.name), catalogue_details);
            }
        }
        Ok(source)
    }

    /// Build a source from a JSON fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_fixture_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_fixture_json(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn repository(&self, name: &str) -> Result<&InMemoryRepository> {
        let repository = self
            .repositories
            .get(name)
            .ok_or_else(|| anyhow!("repository [{name}] missing"))?;
        if let Some(reason) = &repository.unavailable {
            bail!("repository [{name}] unavailable: {reason}");
        }
        Ok(repository)
    }
}

impl SnapshotSource for InMemorySource {
    fn repositories(&self) -> Vec<String> {
        self.repositories.keys().cloned().collect()
    }

    fn catalogue(&self, repository: &str) -> Result<RepositoryCatalogue> {
        Ok(self.repository(repository)?.catalogue.clone())
    }

    fn load_snapshot(&self, repository: &str, id: &SnapshotId) -> Result<Arc<SnapshotInfo>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.repository(repository)?
            .snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("snapshot [{repository}:{id}] is missing"))
    }
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    repositories: Vec<FixtureRepository>,
}

#[derive(Debug, Deserialize)]
struct FixtureRepository {
    name: String,
    #[serde(default)]
    unavailable: Option<String>,
    #[serde(default)]
    snapshots: Vec<FixtureSnapshot>,
}

#[derive(Debug, Deserialize)]
struct FixtureSnapshot {
    name: String,
    #[serde(default)]
    uuid: Option<String>,
    start_time: i64,
    #[serde(default)]
    end_time: i64,
    #[serde(default)]
    indices: BTreeSet<String>,
    #[serde(default)]
    total_shards: u32,
    #[serde(default)]
    failed_shards: u32,
    #[serde(default)]
    state: SnapshotState,
    #[serde(default = "default_true")]
    catalogue_details: bool,
}

const fn default_true() -> bool {
    true
}

impl FixtureSnapshot {
    fn into_info(self, repository: &str) -> SnapshotInfo {
        let uuid = self
            .uuid
            .unwrap_or_else(|| format!("{repository}-{}", self.name));
        SnapshotInfo {
            repository: repository.to_string(),
            snapshot: SnapshotId::new(self.name, uuid),
            start_time: self.start_time,
            end_time: self.end_time,
            indices: self.indices,
            total_shards: self.total_shards,
            failed_shards: self.failed_shards,
            state: self.state,
        }
    }
}
