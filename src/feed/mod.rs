//! Loading of release, vulnerability and defect feeds.
//!
//! A feed location is either a URL (`http://` or `https://`), fetched with
//! [`reqwest`] and kept in the [`Cache`], or a path on disk. The parsers
//! in the submodules turn feed bodies into model records and count the rows
//! they could not use.
//!
//! # Example
//!
//! ```no_run
//! use lagscan::feed::{parse_catalog, FeedLoader, FeedLocation};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let loader = FeedLoader::new();
//!     let location: FeedLocation = "data/debian_packages.csv".parse()?;
//!     let body = loader.load_text(&location).await?;
//!     let catalog = parse_catalog(&body)?;
//!     println!("{} catalog entries", catalog.records.len());
//!     Ok(())
//! }
//! ```

mod catalog;
mod defects;
mod npm;
mod security_tracker;

pub use catalog::parse_catalog;
pub use defects::{normalize_bound, parse_defects};
pub use npm::{parse_registry_times, NpmRegistry, ReleaseHistory, NPM_REGISTRY_URL};
pub use security_tracker::{parse_security_tracker, SECURITY_TRACKER_URL};

use crate::cache::Cache;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Records parsed from a feed, plus the number of rows that were dropped.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Url(String),
    Path(PathBuf),
}

impl FeedLocation {
    pub fn is_remote(&self) -> bool {
        matches!(self, FeedLocation::Url(_))
    }
}

impl std::str::FromStr for FeedLocation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("Feed location cannot be empty");
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(FeedLocation::Url(s.to_string()))
        } else {
            Ok(FeedLocation::Path(PathBuf::from(s)))
        }
    }
}

impl std::fmt::Display for FeedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedLocation::Url(url) => write!(f, "{}", url),
            FeedLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct FeedLoader {
    client: reqwest::Client,
    cache: Cache,
}

impl FeedLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            cache: Cache::new(),
        }
    }

    pub fn with_cache(cache: Cache) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
        }
    }

    /// Reads a feed body from disk or the network.
    pub async fn load_text(&self, location: &FeedLocation) -> Result<String> {
        match location {
            FeedLocation::Path(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read feed {}", path.display())),
            FeedLocation::Url(url) => self.fetch(url).await,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let cache_key = format!("feed_{}", url);

        if let Some(body) = self.cache.get::<String>(&cache_key) {
            debug!(url, "Feed served from cache");
            return Ok(body);
        }

        info!(url, "Fetching feed");
        let body = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Feed request failed: {}", url))?
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        if let Err(e) = self.cache.set(&cache_key, &body) {
            debug!(url, "Could not cache feed: {}", e);
        }

        Ok(body)
    }
}

impl Default for FeedLoader {
    fn default() -> Self {
        Self::new()
    }
}
