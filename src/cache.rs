//! File-based caching for API responses.
//!
//! Remote feed bodies and registry histories are large and change slowly,
//! so they are kept as JSON files with a TTL (time-to-live) checked against
//! the file's modification time.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/lagscan/`
//! - macOS: `~/Library/Caches/lagscan/`
//! - Windows: `%LOCALAPPDATA%\lagscan\`
//!
//! # Example
//!
//! ```no_run
//! use lagscan::Cache;
//!
//! let cache = Cache::new();
//!
//! // Store a value
//! cache.set("my_key", &"cached value".to_string()).unwrap();
//!
//! // Retrieve it later (within TTL)
//! let value: Option<String> = cache.get("my_key");
//! assert_eq!(value, Some("cached value".to_string()));
//! ```

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default cache TTL in hours.
const CACHE_TTL_HOURS: u64 = 24;

/// A file-based cache with TTL support.
///
/// Values are stored as JSON files in the cache directory. Each entry
/// expires after the configured TTL period.
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Creates a new cache with the default 24-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl_hours(CACHE_TTL_HOURS)
    }

    /// Creates a new cache with a custom TTL.
    ///
    /// # Example
    ///
    /// ```
    /// use lagscan::Cache;
    ///
    /// // Security tracker data is refreshed several times a day
    /// let cache = Cache::with_ttl_hours(6);
    /// ```
    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::with_dir(default_dir(), Duration::from_secs(hours * 3600))
    }

    /// Creates a cache rooted at `dir`.
    pub fn with_dir(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensures the cache directory exists.
    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Converts a cache key to a safe filename.
    ///
    /// Keys that differ only in replaced characters share a file, which is
    /// acceptable for the URL and package-name keys used here.
    fn cache_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe_key))
    }

    /// Retrieves a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist, has expired, or no longer
    /// deserializes as `T`. Expired files are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.cache_path(key);

        if self.is_expired(&path)? {
            let _ = fs::remove_file(&path);
            return None;
        }

        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// `None` when the file is missing. Unreadable mtimes count as fresh.
    fn is_expired(&self, path: &Path) -> Option<bool> {
        let metadata = fs::metadata(path).ok()?;
        let expired = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|elapsed| elapsed > self.ttl)
            .unwrap_or(false);
        Some(expired)
    }

    /// Stores a value in the cache.
    ///
    /// The value is serialized to JSON and written to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or
    /// the file cannot be written.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.cache_path(key);
        let content = serde_json::to_string(value)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Removes all JSON files from the cache directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be read.
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)?.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let _ = fs::remove_file(path);
                }
            }
        }
        Ok(())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

fn default_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("lagscan")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(ttl: Duration) -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::with_dir(dir.path().join("cache"), ttl);
        (dir, cache)
    }

    #[test]
    fn test_set_then_get() {
        let (_dir, cache) = temp_cache(Duration::from_secs(3600));
        cache.set("npm_history_grunt", &vec!["1.0.0".to_string()]).unwrap();

        let value: Option<Vec<String>> = cache.get("npm_history_grunt");
        assert_eq!(value, Some(vec!["1.0.0".to_string()]));
        assert_eq!(cache.get::<String>("missing"), None);
    }

    #[test]
    fn test_cache_path_is_sanitized() {
        let (_dir, cache) = temp_cache(Duration::from_secs(3600));
        let path = cache.cache_path("feed_https://example.org/a b.json");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "feed_https___example_org_a_b_json.json"
        );
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let (_dir, cache) = temp_cache(Duration::ZERO);
        cache.set("stale", &"value".to_string()).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(cache.get::<String>("stale"), None);
        assert!(!cache.cache_path("stale").exists());
    }

    #[test]
    fn test_clear_removes_entries() {
        let (_dir, cache) = temp_cache(Duration::from_secs(3600));
        cache.set("a", &1u32).unwrap();
        cache.set("b", &2u32).unwrap();

        cache.clear().unwrap();
        assert_eq!(cache.get::<u32>("a"), None);
        assert_eq!(cache.get::<u32>("b"), None);
    }
}
