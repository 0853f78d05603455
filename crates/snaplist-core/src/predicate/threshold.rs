use super::parse_numeric;
use crate::error::ListingError;
use crate::model::{RepositoryCatalogue, SnapshotId, SnapshotInfo};
use crate::sort::{SortKey, SortOrder};
use std::cmp::Ordering;
use std::fmt;

/// Outcome of testing a snapshot against catalogue metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreflightResult {
    Include,
    Exclude,
    /// The catalogue lacks what the threshold needs; load the descriptor and
    /// call [`ThresholdPredicate::full_test`].
    Inconclusive,
}

impl PreflightResult {
    #[must_use]
    pub const fn is_conclusive(self) -> bool {
        !matches!(self, Self::Inconclusive)
    }
}

impl From<bool> for PreflightResult {
    fn from(include: bool) -> Self {
        if include { Self::Include } else { Self::Exclude }
    }
}

type Preflight = Box<dyn Fn(&SnapshotId, &RepositoryCatalogue) -> PreflightResult + Send + Sync>;
type Full = Box<dyn Fn(&SnapshotInfo) -> bool + Send + Sync>;

/// Keeps descriptors whose sort value is at or beyond a `from_sort_value`.
///
/// The threshold is inclusive: ascending listings keep values `>=` the
/// threshold, descending listings keep values `<=` it.
pub struct ThresholdPredicate {
    preflight: Option<Preflight>,
    full: Option<Full>,
}

impl ThresholdPredicate {
    /// Predicate that keeps everything.
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            preflight: None,
            full: None,
        }
    }

    /// Build the threshold predicate for `raw`.
    ///
    /// Absent `raw`, or a [`SortKey::Repository`] listing (filtered per
    /// repository by the driver), yields [`ThresholdPredicate::match_all`].
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidArgument`] if `raw` is not an integer
    /// for a numeric sort key.
    pub fn for_from_sort_value(
        raw: Option<&str>,
        key: SortKey,
        order: SortOrder,
    ) -> Result<Self, ListingError> {
        let Some(raw) = raw else {
            return Ok(Self::match_all());
        };

        let predicate = match key {
            SortKey::Repository => Self::match_all(),
            SortKey::Name => {
                let threshold = raw.to_string();
                Self::conclusive(move |id: &SnapshotId, _: &RepositoryCatalogue| {
                    keeps(order, threshold.as_str().cmp(id.name.as_str()))
                })
            }
            SortKey::Indices => {
                let threshold = parse_numeric(raw, key, "from_sort_value")?;
                Self::conclusive(move |id: &SnapshotId, catalogue: &RepositoryCatalogue| {
                    let count = i64::try_from(catalogue.index_count(id)).unwrap_or(i64::MAX);
                    keeps(order, threshold.cmp(&count))
                })
            }
            SortKey::StartTime => {
                let threshold = parse_numeric(raw, key, "from_sort_value")?;
                Self {
                    preflight: Some(Box::new(move |id: &SnapshotId, catalogue: &RepositoryCatalogue| {
                        catalogue
                            .details(id)
                            .filter(|details| details.has_timestamps())
                            .and_then(|details| details.start_time)
                            .map_or(PreflightResult::Inconclusive, |start| {
                                keeps(order, threshold.cmp(&start)).into()
                            })
                    })),
                    full: Some(Box::new(move |info: &SnapshotInfo| {
                        keeps(order, threshold.cmp(&info.start_time))
                    })),
                }
            }
            SortKey::Duration => {
                let threshold = parse_numeric(raw, key, "from_sort_value")?;
                Self {
                    preflight: Some(Box::new(move |id: &SnapshotId, catalogue: &RepositoryCatalogue| {
                        catalogue
                            .details(id)
                            .and_then(|details| details.duration())
                            .map_or(PreflightResult::Inconclusive, |duration| {
                                keeps(order, threshold.cmp(&duration)).into()
                            })
                    })),
                    full: Some(Box::new(move |info: &SnapshotInfo| {
                        keeps(order, threshold.cmp(&info.duration()))
                    })),
                }
            }
            SortKey::Shards | SortKey::FailedShards => {
                let threshold = parse_numeric(raw, key, "from_sort_value")?;
                Self {
                    preflight: Some(Box::new(|_: &SnapshotId, _: &RepositoryCatalogue| {
                        PreflightResult::Inconclusive
                    })),
                    full: Some(Box::new(move |info: &SnapshotInfo| {
                        let value = key.numeric_value(info).unwrap_or_default();
                        keeps(order, threshold.cmp(&value))
                    })),
                }
            }
        };
        Ok(predicate)
    }

    /// Predicate decided entirely by the catalogue; the full test always passes.
    fn conclusive(
        test: impl Fn(&SnapshotId, &RepositoryCatalogue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            preflight: Some(Box::new(move |id: &SnapshotId, catalogue: &RepositoryCatalogue| {
                test(id, catalogue).into()
            })),
            full: None,
        }
    }

    /// Decide from catalogue metadata alone, if possible.
    #[must_use]
    pub fn preflight_test(
        &self,
        id: &SnapshotId,
        catalogue: &RepositoryCatalogue,
    ) -> PreflightResult {
        self.preflight
            .as_ref()
            .map_or(PreflightResult::Include, |test| test(id, catalogue))
    }

    /// Decide from the loaded descriptor.
    ///
    /// Keys whose preflight is always conclusive return `true` here; callers
    /// only reach this for descriptors that survived the preflight.
    #[must_use]
    pub fn full_test(&self, info: &SnapshotInfo) -> bool {
        self.full.as_ref().is_none_or(|test| test(info))
    }

    #[must_use]
    pub const fn is_match_all(&self) -> bool {
        self.preflight.is_none() && self.full.is_none()
    }
}

impl fmt::Debug for ThresholdPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdPredicate")
            .field("match_all", &self.is_match_all())
            .finish_non_exhaustive()
    }
}

/// Inclusive threshold check given `threshold.cmp(value)`.
const fn keeps(order: SortOrder, threshold_vs_value: Ordering) -> bool {
    match order {
        SortOrder::Asc => !matches!(threshold_vs_value, Ordering::Greater),
        SortOrder::Desc => !matches!(threshold_vs_value, Ordering::Less),
    }
}
