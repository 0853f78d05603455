use crate::collector::NO_LIMIT;
use crate::listing::{DEFAULT_MAX_CONCURRENCY, ListingOptions};
use crate::request::ListingRequest;
use crate::sort::{SortKey, SortOrder};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_size")]
    pub default_size: i32,
    #[serde(default)]
    pub default_sort: SortKey,
    #[serde(default)]
    pub default_order: SortOrder,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_size: default_size(),
            default_sort: SortKey::default(),
            default_order: SortOrder::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

const fn default_size() -> i32 {
    NO_LIMIT
}

const fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl ListingConfig {
    #[must_use]
    pub const fn options(&self) -> ListingOptions {
        ListingOptions {
            max_concurrency: self.max_concurrency,
        }
    }

    /// A request carrying the configured sort, order, and page size.
    #[must_use]
    pub fn request(&self) -> ListingRequest {
        ListingRequest::new()
            .sorted_by(self.default_sort, self.default_order)
            .page(self.default_size, 0)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.default_size != NO_LIMIT && self.default_size <= 0 {
            bail!(
                "{}: listing.default_size must be {NO_LIMIT} or greater than 0, got {}",
                path.display(),
                self.default_size
            );
        }
        if self.max_concurrency == 0 {
            bail!("{}: listing.max_concurrency must be at least 1", path.display());
        }
        Ok(())
    }
}

/// Default location: `<config_dir>/snaplist/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snaplist/config.toml"))
}

/// Load configuration from `path`. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or holds
/// out-of-range values.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.listing.validate(path)?;
    Ok(config)
}

/// Load the explicit config file, or the default location when none is given.
///
/// # Errors
///
/// See [`load_config`].
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => default_config_path()
            .map_or_else(|| Ok(Config::default()), |path| load_config(&path)),
    }
}
