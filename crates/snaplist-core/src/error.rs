//! Error taxonomy for snapshot listings.
//!
//! Every failure the core can raise is a [`ListingError`]. Each variant maps
//! to a stable [`ErrorCode`] so callers (and the CLI's JSON output) can make
//! decisions without parsing messages.

use std::fmt;

/// Machine-readable error codes for listing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    InvalidCursor,
    TooManyItems,
    RepositoryUnavailable,
    ConfigParseError,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "E1001",
            Self::InvalidCursor => "E1002",
            Self::TooManyItems => "E4001",
            Self::RepositoryUnavailable => "E5001",
            Self::ConfigParseError => "E6001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidArgument => "Invalid listing argument",
            Self::InvalidCursor => "Malformed pagination cursor",
            Self::TooManyItems => "Too many snapshots collected",
            Self::RepositoryUnavailable => "Repository unavailable",
            Self::ConfigParseError => "Config file parse error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidArgument => {
                Some("Check sort, order, size, offset and from_sort_value parameters.")
            }
            Self::InvalidCursor => {
                Some("Pass the `next` token from a previous page unchanged, or drop `after`.")
            }
            Self::TooManyItems => Some("Narrow the repositories or add a from_sort_value filter."),
            Self::RepositoryUnavailable => None,
            Self::ConfigParseError => Some("Fix syntax in snaplist/config.toml and retry."),
        }
    }

    /// Whether failures with this code are caller mistakes that must not be retried.
    #[must_use]
    pub const fn is_invalid_argument(self) -> bool {
        matches!(self, Self::InvalidArgument | Self::InvalidCursor)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by sort-key parsing, cursors, predicates, and collectors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingError {
    /// A parameter was malformed or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A cursor token (or its binary form) could not be decoded.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// The bounded collector saw more descriptors than it can count.
    #[error("too many snapshots collected: more than {limit}")]
    TooManyItems { limit: u64 },
}

impl ListingError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_cursor(msg: impl Into<String>) -> Self {
        Self::InvalidCursor(msg.into())
    }

    /// The stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InvalidCursor(_) => ErrorCode::InvalidCursor,
            Self::TooManyItems { .. } => ErrorCode::TooManyItems,
        }
    }
}
