use super::{compare_pair, parse_numeric};
use crate::cursor::After;
use crate::error::ListingError;
use crate::model::SnapshotInfo;
use crate::sort::{SortKey, SortOrder};
use std::cmp::Ordering;
use std::fmt;

type Test = Box<dyn Fn(&SnapshotInfo) -> bool + Send + Sync>;

/// Accepts descriptors strictly after a cursor in listing order.
///
/// Ties on the sort value are broken on `(snapshot name, repository)`, or on
/// `(repository, snapshot name)` when sorting by repository. This is not the
/// comparator's own identity tie-break (name, then uuid): two snapshots
/// with the same name in different repositories can be ordered differently
/// by the two rules.
pub struct AfterPredicate {
    test: Option<Test>,
}

impl AfterPredicate {
    /// Predicate that accepts everything.
    #[must_use]
    pub const fn match_all() -> Self {
        Self { test: None }
    }

    /// Build the predicate for resuming after `cursor`.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidArgument`] if the cursor's value is not
    /// an integer for a numeric sort key.
    pub fn for_after(
        cursor: Option<&After>,
        key: SortKey,
        order: SortOrder,
    ) -> Result<Self, ListingError> {
        let Some(cursor) = cursor else {
            return Ok(Self::match_all());
        };

        // Ordering of the cursor relative to the candidate that lets the candidate through.
        let wanted = match order {
            SortOrder::Asc => Ordering::Less,
            SortOrder::Desc => Ordering::Greater,
        };
        let repo = cursor.repo_name.clone();
        let name = cursor.snapshot_name.clone();

        let test: Test = match key {
            SortKey::Name => {
                Box::new(move |info: &SnapshotInfo| by_name(&name, &repo, info) == wanted)
            }
            SortKey::Repository => {
                Box::new(move |info: &SnapshotInfo| by_repository(&name, &repo, info) == wanted)
            }
            numeric => {
                let after = parse_numeric(&cursor.value, numeric, "cursor value")?;
                Box::new(move |info: &SnapshotInfo| {
                    let value = numeric.numeric_value(info).unwrap_or_default();
                    match after.cmp(&value) {
                        Ordering::Equal => by_name(&name, &repo, info) == wanted,
                        primary => primary == wanted,
                    }
                })
            }
        };
        Ok(Self { test: Some(test) })
    }

    #[must_use]
    pub fn test(&self, info: &SnapshotInfo) -> bool {
        self.test.as_ref().is_none_or(|test| test(info))
    }

    #[must_use]
    pub const fn is_match_all(&self) -> bool {
        self.test.is_none()
    }
}

fn by_name(name: &str, repo: &str, info: &SnapshotInfo) -> Ordering {
    compare_pair((name, repo), (info.name(), info.repository.as_str()))
}

fn by_repository(name: &str, repo: &str, info: &SnapshotInfo) -> Ordering {
    compare_pair((repo, name), (info.repository.as_str(), info.name()))
}

impl fmt::Debug for AfterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterPredicate")
            .field("match_all", &self.is_match_all())
            .finish_non_exhaustive()
    }
}
