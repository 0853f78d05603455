//! Page collectors.
//!
//! A [`SnapshotCollector`] receives every descriptor that passed the
//! listing's filters, possibly from many producer threads at once, and keeps
//! only what the requested page needs.
//!
//! # Variants
//!
//! - **Unbounded**: used when `size` is [`NO_LIMIT`]. Keeps everything and
//!   sorts once at the end.
//! - **Bounded**: keeps at most `capacity = offset + size` descriptors: the
//!   best `capacity` seen so far by the listing comparator. Retention is a
//!   max-heap keyed by the comparator, so the worst retained descriptor is
//!   always at the top and can be evicted in O(log capacity).
//!
//! # Exactness
//!
//! A bounded collector only discards descriptors that sort after every
//! retained one, so `collected - capacity` discarded descriptors are exactly
//! the matches beyond the page. [`SnapshotCollector::remaining`] is therefore
//! exact, and the returned page equals "retain all, sort, slice".
//!
//! # Concurrency
//!
//! `add` takes `&self` and holds one mutex for the whole
//! count-compare-evict step. Reads are meant to happen once, after every
//! producer has finished.

use crate::error::ListingError;
use crate::model::SnapshotInfo;
use crate::sort::SnapshotComparator;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Page size sentinel meaning "return every match".
pub const NO_LIMIT: i32 = -1;

/// Result of a finished collection.
#[derive(Debug, Clone, Default)]
pub struct CollectedPage {
    /// The page, in listing order. Same `Arc`s that were added.
    pub snapshots: Vec<Arc<SnapshotInfo>>,
    /// Matches that sort after the page.
    pub remaining: u64,
    /// Every descriptor accepted by the collector.
    pub total: u64,
}

/// Sink for filtered descriptors.
#[derive(Debug)]
pub enum SnapshotCollector {
    Unbounded(UnboundedCollector),
    Bounded(BoundedCollector),
}

impl SnapshotCollector {
    /// Create the collector for one page request.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidArgument`] when `offset` is negative,
    /// `size` is neither [`NO_LIMIT`] nor positive, or `offset + size`
    /// overflows `i32`.
    pub fn create(
        comparator: SnapshotComparator,
        size: i32,
        offset: i32,
    ) -> Result<Self, ListingError> {
        if offset < 0 {
            return Err(ListingError::invalid_argument(format!(
                "offset must be >= 0, got {offset}"
            )));
        }
        let offset_len = usize::try_from(offset).unwrap_or_default();

        if size == NO_LIMIT {
            tracing::debug!(?comparator, offset, "creating unbounded snapshot collector");
            return Ok(Self::Unbounded(UnboundedCollector {
                comparator,
                offset: offset_len,
                items: Mutex::new(Vec::new()),
            }));
        }
        if size <= 0 {
            return Err(ListingError::invalid_argument(format!(
                "size must be {NO_LIMIT} or greater than 0, got {size}"
            )));
        }

        let capacity = offset.checked_add(size).ok_or_else(|| {
            ListingError::invalid_argument(format!(
                "offset [{offset}] + size [{size}] exceeds the maximum page window of {}",
                i32::MAX
            ))
        })?;
        let capacity = usize::try_from(capacity).unwrap_or_default();

        tracing::debug!(?comparator, offset, size, capacity, "creating bounded snapshot collector");
        Ok(Self::Bounded(BoundedCollector {
            comparator,
            offset: offset_len,
            capacity,
            state: Mutex::new(BoundedState {
                // Small pages allocate up front; huge windows grow on demand.
                heap: BinaryHeap::with_capacity(capacity.min(1024)),
                collected: 0,
            }),
        }))
    }

    /// Offer one descriptor that passed every filter.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::TooManyItems`] when a bounded collector's
    /// counter is exhausted.
    pub fn add(&self, info: Arc<SnapshotInfo>) -> Result<(), ListingError> {
        match self {
            Self::Unbounded(collector) => {
                collector.add(info);
                Ok(())
            }
            Self::Bounded(collector) => collector.add(info),
        }
    }

    /// The requested page, sorted by the listing comparator.
    #[must_use]
    pub fn snapshot_infos(&self) -> Vec<Arc<SnapshotInfo>> {
        match self {
            Self::Unbounded(collector) => collector.snapshot_infos(),
            Self::Bounded(collector) => collector.snapshot_infos(),
        }
    }

    /// Number of matches that sort after the returned page.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        match self {
            Self::Unbounded(_) => 0,
            Self::Bounded(collector) => collector.remaining(),
        }
    }

    /// Number of descriptors accepted so far.
    #[must_use]
    pub fn collected(&self) -> u64 {
        match self {
            Self::Unbounded(collector) => collector.lock().len() as u64,
            Self::Bounded(collector) => u64::from(collector.lock().collected),
        }
    }

    /// Consume the collector and produce the page.
    #[must_use]
    pub fn into_page(self) -> CollectedPage {
        let remaining = self.remaining();
        let total = self.collected();
        let snapshots = match self {
            Self::Unbounded(collector) => {
                let offset = collector.offset;
                let comparator = collector.comparator;
                let items = collector
                    .items
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner);
                window(items, &comparator, offset)
            }
            Self::Bounded(collector) => {
                let offset = collector.offset;
                let comparator = collector.comparator;
                let state = collector
                    .state
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner);
                let items = state.heap.into_iter().map(|ranked| ranked.info).collect();
                window(items, &comparator, offset)
            }
        };
        CollectedPage {
            snapshots,
            remaining,
            total,
        }
    }
}

/// Sort `items` and keep `[offset, end)`.
fn window(
    mut items: Vec<Arc<SnapshotInfo>>,
    comparator: &SnapshotComparator,
    offset: usize,
) -> Vec<Arc<SnapshotInfo>> {
    if offset >= items.len() {
        return Vec::new();
    }
    comparator.sort(&mut items);
    items.split_off(offset)
}

/// Keeps every descriptor.
#[derive(Debug)]
pub struct UnboundedCollector {
    comparator: SnapshotComparator,
    offset: usize,
    items: Mutex<Vec<Arc<SnapshotInfo>>>,
}

impl UnboundedCollector {
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<SnapshotInfo>>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, info: Arc<SnapshotInfo>) {
        self.lock().push(info);
    }

    fn snapshot_infos(&self) -> Vec<Arc<SnapshotInfo>> {
        let items = self.lock().clone();
        window(items, &self.comparator, self.offset)
    }
}

/// Keeps the best `capacity` descriptors seen.
#[derive(Debug)]
pub struct BoundedCollector {
    comparator: SnapshotComparator,
    offset: usize,
    capacity: usize,
    state: Mutex<BoundedState>,
}

#[derive(Debug)]
struct BoundedState {
    /// Max-heap by the listing comparator: the top is the worst retained item.
    heap: BinaryHeap<Ranked>,
    collected: u32,
}

impl BoundedCollector {
    fn lock(&self) -> MutexGuard<'_, BoundedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, info: Arc<SnapshotInfo>) -> Result<(), ListingError> {
        let mut state = self.lock();
        state.collected = state
            .collected
            .checked_add(1)
            .ok_or(ListingError::TooManyItems {
                limit: u64::from(u32::MAX),
            })?;

        if state.heap.len() < self.capacity {
            state.heap.push(Ranked {
                comparator: self.comparator,
                info,
            });
            return Ok(());
        }

        if let Some(mut worst) = state.heap.peek_mut() {
            if self.comparator.compare(&info, &worst.info) == Ordering::Less {
                // Dropping the `PeekMut` restores the heap order.
                worst.info = info;
            }
        }
        Ok(())
    }

    fn snapshot_infos(&self) -> Vec<Arc<SnapshotInfo>> {
        let state = self.lock();
        if self.offset >= state.heap.len() {
            return Vec::new();
        }
        let items = state.heap.iter().map(|ranked| Arc::clone(&ranked.info)).collect();
        drop(state);
        window(items, &self.comparator, self.offset)
    }

    fn remaining(&self) -> u64 {
        let collected = u64::from(self.lock().collected);
        collected.saturating_sub(self.capacity as u64)
    }

    #[cfg(test)]
    fn set_collected(&self, collected: u32) {
        self.lock().collected = collected;
    }
}

/// Heap entry ordered by the listing comparator.
#[derive(Debug)]
struct Ranked {
    comparator: SnapshotComparator,
    info: Arc<SnapshotInfo>,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator.compare(&self.info, &other.info)
    }
}
