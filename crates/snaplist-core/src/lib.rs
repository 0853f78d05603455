//! snaplist-core library.
//!
//! Sorted, paginated listings of snapshot descriptors spread over many
//! repositories. A [`ListingRequest`] names the sort key, order, page window,
//! and optional `after` cursor or `from_sort_value` threshold;
//! [`list_snapshots`] pushes the filters down to catalogue metadata where it
//! can, loads the remaining descriptors in parallel, and keeps only the
//! requested page in a bounded top-K collector.
//!
//! # Conventions
//!
//! - **Errors**: Listing operations return [`ListingError`]. Source and config
//!   IO uses `anyhow::Result` with context.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod collector;
pub mod config;
pub mod cursor;
pub mod error;
pub mod listing;
pub mod model;
pub mod predicate;
pub mod request;
pub mod sort;
pub mod source;

pub use collector::{CollectedPage, NO_LIMIT, SnapshotCollector};
pub use cursor::After;
pub use error::{ErrorCode, ListingError};
pub use listing::{ListingOptions, ListingStats, SnapshotsPage, list_snapshots};
pub use model::{
    IndexId, RepositoryCatalogue, SnapshotDetails, SnapshotId, SnapshotInfo, SnapshotState,
};
pub use predicate::{AfterPredicate, PreflightResult, ThresholdPredicate};
pub use request::ListingRequest;
pub use sort::{SnapshotComparator, SortKey, SortOrder};
pub use source::{InMemorySource, SnapshotSource};
