//! Listing requests and their query-parameter surface.

use crate::collector::NO_LIMIT;
use crate::cursor::After;
use crate::error::ListingError;
use crate::sort::{SortKey, SortOrder};
use serde::{Deserialize, Serialize};

/// Repository selectors that match every repository.
const ALL_REPOSITORIES: [&str; 2] = ["_all", "*"];

/// One page request over one or more repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRequest {
    /// Repository names to list. Empty, `_all`, or `*` selects all.
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    /// Page size, or [`NO_LIMIT`].
    #[serde(default = "default_size")]
    pub size: i32,
    #[serde(default)]
    pub offset: i32,
    #[serde(default)]
    pub after: Option<After>,
    #[serde(default)]
    pub from_sort_value: Option<String>,
}

const fn default_size() -> i32 {
    NO_LIMIT
}

impl Default for ListingRequest {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            sort: SortKey::default(),
            order: SortOrder::default(),
            size: NO_LIMIT,
            offset: 0,
            after: None,
            from_sort_value: None,
        }
    }
}

impl ListingRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sorted_by(mut self, sort: SortKey, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    #[must_use]
    pub const fn page(mut self, size: i32, offset: i32) -> Self {
        self.size = size;
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn after(mut self, after: After) -> Self {
        self.after = Some(after);
        self
    }

    #[must_use]
    pub fn from_sort_value(mut self, raw: impl Into<String>) -> Self {
        self.from_sort_value = Some(raw.into());
        self
    }

    #[must_use]
    pub fn repositories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repositories = names.into_iter().map(Into::into).collect();
        self
    }

    /// Parse query parameters into a validated request.
    ///
    /// Recognised keys: `sort`, `order`, `size`, `offset`, `after`,
    /// `from_sort_value`, and `repository` (repeatable, comma-separated).
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidArgument`] for unknown keys, malformed
    /// values, or combinations rejected by [`ListingRequest::validate`], and
    /// [`ListingError::InvalidCursor`] for a malformed `after` token.
    pub fn from_query<'a, I>(params: I) -> Result<Self, ListingError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::default();
        for (key, value) in params {
            match key {
                "sort" => request.sort = SortKey::of(value)?,
                "order" => request.order = value.parse()?,
                "size" => request.size = parse_int("size", value)?,
                "offset" => request.offset = parse_int("offset", value)?,
                "after" => request.after = Some(After::from_token(value)?),
                "from_sort_value" => request.from_sort_value = Some(value.to_string()),
                "repository" => request.repositories.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(ToString::to_string),
                ),
                other => {
                    return Err(ListingError::invalid_argument(format!(
                        "unrecognized parameter '{other}'"
                    )));
                }
            }
        }
        request.validate()?;
        Ok(request)
    }

    /// Check parameter combinations.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::InvalidArgument`] describing the first
    /// violated rule.
    pub fn validate(&self) -> Result<(), ListingError> {
        if self.size != NO_LIMIT && self.size <= 0 {
            return Err(ListingError::invalid_argument(format!(
                "size must be {NO_LIMIT} or greater than 0, got {}",
                self.size
            )));
        }
        if self.offset < 0 {
            return Err(ListingError::invalid_argument(format!(
                "offset must be >= 0, got {}",
                self.offset
            )));
        }
        if self.after.is_some() && self.offset > 0 {
            return Err(ListingError::invalid_argument(
                "can't use after and offset simultaneously",
            ));
        }
        if self.after.is_some() && self.from_sort_value.is_some() {
            return Err(ListingError::invalid_argument(
                "can't use after and from_sort_value simultaneously",
            ));
        }
        Ok(())
    }

    /// Whether `repository` is selected by this request.
    #[must_use]
    pub fn selects(&self, repository: &str) -> bool {
        self.repositories.is_empty()
            || self
                .repositories
                .iter()
                .any(|name| name == repository || ALL_REPOSITORIES.contains(&name.as_str()))
    }
}

fn parse_int(name: &str, value: &str) -> Result<i32, ListingError> {
    value.trim().parse::<i32>().map_err(|_| {
        ListingError::invalid_argument(format!("{name} must be an integer, got '{value}'"))
    })
}
