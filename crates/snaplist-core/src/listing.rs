//! The listing driver.
//!
//! Fans out over the selected repositories, one scoped thread per
//! repository (at most `max_concurrency` at a time), and pushes every
//! descriptor that survives the filters into one shared collector.
//!
//! Per repository:
//!
//! 1. Read the catalogue. A failure is recorded in
//!    [`SnapshotsPage::failures`] and the repository is skipped.
//! 2. Preflight each snapshot identity against the `from_sort_value`
//!    threshold. `Exclude` skips the snapshot without loading it.
//! 3. Load the survivors. A failed load is logged and the snapshot skipped.
//! 4. Re-check the threshold on the descriptor when the preflight could not
//!    decide, then apply the `after` cursor.
//! 5. Add to the collector.
//!
//! Once every producer has joined, the collector yields the page.

use crate::collector::SnapshotCollector;
use crate::cursor::After;
use crate::error::ListingError;
use crate::model::SnapshotInfo;
use crate::predicate::{AfterPredicate, PreflightResult, ThresholdPredicate};
use crate::request::ListingRequest;
use crate::sort::{SortKey, SortOrder};
use crate::source::SnapshotSource;
use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Default number of repositories read in parallel.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Driver tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    /// Repositories read in parallel. Zero is treated as one.
    pub max_concurrency: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Work counters for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListingStats {
    /// Repositories whose catalogue was read.
    pub repositories: u64,
    /// Snapshot identities found in catalogues.
    pub candidates: u64,
    /// Identities rejected from catalogue metadata alone.
    pub preflight_excluded: u64,
    /// Descriptors loaded.
    pub loaded: u64,
    /// Descriptor loads that failed.
    pub load_failures: u64,
}

impl AddAssign for ListingStats {
    fn add_assign(&mut self, rhs: Self) {
        self.repositories += rhs.repositories;
        self.candidates += rhs.candidates;
        self.preflight_excluded += rhs.preflight_excluded;
        self.loaded += rhs.loaded;
        self.load_failures += rhs.load_failures;
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct SnapshotsPage {
    /// Descriptors in listing order.
    pub snapshots: Vec<Arc<SnapshotInfo>>,
    /// Token for the next page, when more matches remain.
    pub next: Option<String>,
    /// Matches across all pages.
    pub total: u64,
    /// Matches after this page.
    pub remaining: u64,
    /// Repositories that could not be read, with the reason.
    pub failures: BTreeMap<String, String>,
    pub stats: ListingStats,
}

/// Filters shared by every producer of one listing.
struct Filters {
    after: AfterPredicate,
    threshold: ThresholdPredicate,
}

/// Run one page request against `source`.
///
/// # Errors
///
/// Returns [`ListingError::InvalidArgument`] or
/// [`ListingError::InvalidCursor`] for a bad request, and
/// [`ListingError::TooManyItems`] if the collector overflows. Repository and
/// descriptor read failures are not errors: they are reported in
/// [`SnapshotsPage::failures`] or skipped.
pub fn list_snapshots<S>(
    source: &S,
    request: &ListingRequest,
    options: &ListingOptions,
) -> Result<SnapshotsPage, ListingError>
where
    S: SnapshotSource + ?Sized,
{
    request.validate()?;

    let comparator = request.sort.comparator(request.order);
    let filters = Filters {
        after: AfterPredicate::for_after(request.after.as_ref(), request.sort, request.order)?,
        threshold: ThresholdPredicate::for_from_sort_value(
            request.from_sort_value.as_deref(),
            request.sort,
            request.order,
        )?,
    };
    let collector = SnapshotCollector::create(comparator, request.size, request.offset)?;

    let repositories: Vec<String> = source
        .repositories()
        .into_iter()
        .filter(|name| request.selects(name))
        .filter(|name| repository_in_range(request, name))
        .collect();
    tracing::debug!(
        repositories = repositories.len(),
        sort = %request.sort,
        order = %request.order,
        size = request.size,
        offset = request.offset,
        "listing snapshots"
    );

    let abort = AtomicBool::new(false);
    let mut failures = BTreeMap::new();
    let mut stats = ListingStats::default();
    let mut first_error = None;

    for chunk in repositories.chunks(options.max_concurrency.max(1)) {
        let outcomes: Vec<(String, thread::Result<RepositoryOutcome>)> = thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|name| {
                    let (filters, collector, abort) = (&filters, &collector, &abort);
                    let handle = scope.spawn(move || {
                        collect_repository(source, name, filters, collector, abort)
                    });
                    (name.clone(), handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| (name, handle.join()))
                .collect()
        });

        for (name, outcome) in outcomes {
            match outcome {
                Ok(RepositoryOutcome::Collected(repo_stats)) => stats += repo_stats,
                Ok(RepositoryOutcome::Unavailable(reason)) => {
                    failures.insert(name, reason);
                }
                Ok(RepositoryOutcome::Aborted(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(_) => {
                    tracing::error!(repository = %name, "snapshot producer panicked");
                    failures.insert(name, "snapshot producer panicked".to_string());
                }
            }
        }
        if let Some(err) = first_error.take() {
            return Err(err);
        }
    }

    let page = collector.into_page();
    let next = match page.snapshots.last() {
        Some(last) if page.remaining > 0 => Some(After::encode(last, request.sort).to_token()?),
        _ => None,
    };
    tracing::info!(
        returned = page.snapshots.len(),
        total = page.total,
        remaining = page.remaining,
        failed_repositories = failures.len(),
        loaded = stats.loaded,
        preflight_excluded = stats.preflight_excluded,
        "snapshot listing finished"
    );

    Ok(SnapshotsPage {
        snapshots: page.snapshots,
        next,
        total: page.total,
        remaining: page.remaining,
        failures,
        stats,
    })
}

/// `from_sort_value` for repository-sorted listings filters whole repositories.
fn repository_in_range(request: &ListingRequest, name: &str) -> bool {
    match (&request.from_sort_value, request.sort) {
        (Some(from), SortKey::Repository) => match request.order {
            SortOrder::Asc => name >= from.as_str(),
            SortOrder::Desc => name <= from.as_str(),
        },
        _ => true,
    }
}

enum RepositoryOutcome {
    Collected(ListingStats),
    Unavailable(String),
    Aborted(ListingError),
}

fn collect_repository<S>(
    source: &S,
    repository: &str,
    filters: &Filters,
    collector: &SnapshotCollector,
    abort: &AtomicBool,
) -> RepositoryOutcome
where
    S: SnapshotSource + ?Sized,
{
    let catalogue = match source.catalogue(repository) {
        Ok(catalogue) => catalogue,
        Err(err) => {
            tracing::warn!(repository, error = %err, "skipping unreadable repository");
            return RepositoryOutcome::Unavailable(format!("{err:#}"));
        }
    };

    let mut stats = ListingStats {
        repositories: 1,
        ..ListingStats::default()
    };
    for id in catalogue.snapshot_ids() {
        if abort.load(Ordering::Relaxed) {
            break;
        }
        stats.candidates += 1;

        let preflight = filters.threshold.preflight_test(id, &catalogue);
        if preflight == PreflightResult::Exclude {
            stats.preflight_excluded += 1;
            continue;
        }

        let info = match source.load_snapshot(repository, id) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(
                    repository,
                    snapshot = %id,
                    error = %err,
                    "skipping unloadable snapshot"
                );
                stats.load_failures += 1;
                continue;
            }
        };
        stats.loaded += 1;

        if !preflight.is_conclusive() && !filters.threshold.full_test(&info) {
            continue;
        }
        if !filters.after.test(&info) {
            continue;
        }
        if let Err(err) = collector.add(info) {
            abort.store(true, Ordering::Relaxed);
            tracing::error!(repository, error = %err, "aborting snapshot listing");
            return RepositoryOutcome::Aborted(err);
        }
    }
    tracing::debug!(repository, ?stats, "repository scanned");
    RepositoryOutcome::Collected(stats)
}
