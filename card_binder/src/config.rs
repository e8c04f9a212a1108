//! Run configuration
//!
//! Every section has a `Default`; the CLI only overrides what the user passes.

use crate::cache::CachePolicy;
use crate::error::{BinderError, Result};
use crate::inventory::ParseOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default Scryfall API endpoint
pub const DEFAULT_API_URL: &str = "https://api.scryfall.com";

/// User-Agent sent with every Scryfall request
pub const USER_AGENT: &str = concat!("MTG-CardBinder/", env!("CARGO_PKG_VERSION"));

/// Upper bound accepted for concurrent lookups
pub const MAX_CONCURRENCY: usize = 64;

/// Grid of card slots on one binder page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    pub rows: usize,
    pub cols: usize,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self { rows: 3, cols: 3 }
    }
}

impl PageLayout {
    /// Number of slots per page
    pub fn page_size(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }
}

/// Remote fetch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Minimum spacing between two requests to the API
    pub min_interval: Duration,
    /// Upper bound on keys resolved at once
    pub max_concurrency: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            min_interval: Duration::from_millis(100),
            max_concurrency: 4,
        }
    }
}

/// What to do when some keys could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the run on the first transient error
    #[default]
    Abort,
    /// Render placeholders for keys that could not be resolved
    BestEffort,
}

/// How to treat an existing, non-empty output directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    RequireEmpty,
    Overwrite,
}

/// Complete configuration of a binder run
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub layout: PageLayout,
    pub cache: CachePolicy,
    pub fetch: FetchSettings,
    pub failure_policy: FailurePolicy,
    pub output_mode: OutputMode,
    pub parse: ParseOptions,
}

impl Settings {
    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.layout.rows == 0 || self.layout.cols == 0 {
            return Err(BinderError::Config(format!(
                "page layout must have at least one row and column, got {}x{}",
                self.layout.rows, self.layout.cols
            )));
        }
        if self.layout.rows.checked_mul(self.layout.cols).is_none() {
            return Err(BinderError::Config(format!(
                "page layout {}x{} is too large",
                self.layout.rows, self.layout.cols
            )));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.fetch.max_concurrency) {
            return Err(BinderError::Config(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.fetch.max_concurrency
            )));
        }
        if self.fetch.timeout.is_zero() {
            return Err(BinderError::Config("timeout must be positive".to_string()));
        }
        if self.cache.negative_ttl < chrono::Duration::zero() {
            return Err(BinderError::Config(
                "negative cache TTL must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default home directory: ~/.local/share/card_binder
pub fn default_home_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("card_binder")
}
