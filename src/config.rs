//! Configuration file handling.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/lagscan/config.toml`
//! - macOS: `~/Library/Application Support/lagscan/config.toml`
//! - Windows: `%APPDATA%\lagscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! cache_ttl_hours = 24
//! default_format = "table"
//!
//! [feeds]
//! catalog = "data/debian_packages.csv"
//! vulnerabilities = "https://security-tracker.debian.org/tracker/data/json"
//! defects = "data/bugs.csv"
//! npm_registry = "https://registry.npmjs.org"
//!
//! [matching]
//! done_defect_policy = "exclude-stale"
//!
//! [ignore]
//! packages = ["linux-image-*"]
//! vulnerabilities = ["CVE-2017-3735"]
//! defects = ["881234"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::checker::DoneDefectPolicy;
use crate::feed::{NPM_REGISTRY_URL, SECURITY_TRACKER_URL};

/// Application configuration.
///
/// Missing fields fall back to their defaults, so a partial file is valid.
///
/// # Example
///
/// ```no_run
/// use lagscan::Config;
///
/// let config = Config::load().unwrap();
/// println!("Cache TTL: {} hours", config.cache_ttl_hours);
/// println!("Defect policy: {:?}", config.matching.done_defect_policy);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long to cache remote feeds and registry histories, in hours.
    pub cache_ttl_hours: u64,

    /// Valid values: "table", "json"
    pub default_format: String,

    pub feeds: FeedConfig,

    pub matching: MatchingConfig,

    /// Ignore list configuration for suppressing known issues.
    pub ignore: IgnoreConfig,
}

/// Where feeds are loaded from. Each location is a URL or a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Release catalog CSV. Required for Debian analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    pub vulnerabilities: String,

    /// Bug tracker export. Defect matching is skipped when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defects: Option<String>,

    pub npm_registry: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            vulnerabilities: SECURITY_TRACKER_URL.to_string(),
            defects: None,
            npm_registry: NPM_REGISTRY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub done_defect_policy: DoneDefectPolicy,
}

/// Configuration for ignoring specific packages, CVEs or defects.
///
/// Use this to suppress known false positives or accepted risks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names to leave out of the report.
    ///
    /// Supports glob patterns (e.g., "linux-image-*", "@types/*").
    pub packages: Vec<String>,

    /// CVE identifiers to ignore.
    pub vulnerabilities: Vec<String>,

    /// Defect (bug) numbers to ignore.
    pub defects: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a package should be ignored.
    pub fn should_ignore_package(&self, package: &str) -> bool {
        self.packages.iter().any(|pattern| glob_match(pattern, package))
    }

    /// Check if a vulnerability should be ignored.
    pub fn should_ignore_vulnerability(&self, cve: &str) -> bool {
        self.vulnerabilities.iter().any(|id| id == cve)
    }

    pub fn should_ignore_defect(&self, id: &str) -> bool {
        self.defects.iter().any(|d| d == id)
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.vulnerabilities.is_empty() && self.defects.is_empty()
    }
}

/// Glob matching where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return pattern == text;
    };
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };

    let rest: Vec<&str> = parts.collect();
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };

    for part in middle.iter().filter(|p| !p.is_empty()) {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }

    remaining.ends_with(last)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_hours: 24,
            default_format: "table".to_string(),
            feeds: FeedConfig::default(),
            matching: MatchingConfig::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use lagscan::Config;
    ///
    /// let path = Config::config_path();
    /// assert!(path.ends_with("lagscan/config.toml"));
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lagscan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("bash", "bash"));
        assert!(!glob_match("bash", "dash"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("linux-image-*", "linux-image-4.9.0-6-amd64"));
        assert!(glob_match("lib*", "lib"));
        assert!(!glob_match("linux-image-*", "linux-libc-dev"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*-dev", "libssl-dev"));
        assert!(!glob_match("*-dev", "libssl1.1"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*ssl*", "libssl1.1"));
        assert!(glob_match("*ssl*", "openssl"));
        assert!(!glob_match("*ssl*", "gnutls30"));
    }

    #[test]
    fn test_glob_match_scoped() {
        assert!(glob_match("@types/*", "@types/node"));
        assert!(!glob_match("@types/*", "@babel/core"));
    }

    #[test]
    fn test_ignore_config() {
        let config = IgnoreConfig {
            packages: vec!["bash".to_string(), "@types/*".to_string()],
            vulnerabilities: vec!["CVE-2017-3735".to_string()],
            defects: vec!["881234".to_string()],
        };

        assert!(config.should_ignore_package("bash"));
        assert!(config.should_ignore_package("@types/node"));
        assert!(!config.should_ignore_package("curl"));
        assert!(config.should_ignore_vulnerability("CVE-2017-3735"));
        assert!(!config.should_ignore_vulnerability("CVE-2017-3736"));
        assert!(config.should_ignore_defect("881234"));
        assert!(!config.should_ignore_defect("881235"));
        assert!(!config.is_empty());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.cache_ttl_hours, 24);
        assert_eq!(config.default_format, "table");
        assert_eq!(config.feeds.vulnerabilities, SECURITY_TRACKER_URL);
        assert_eq!(config.feeds.npm_registry, NPM_REGISTRY_URL);
        assert_eq!(config.matching.done_defect_policy, DoneDefectPolicy::ExcludeStale);
        assert!(config.ignore.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [feeds]
            catalog = "packages.csv"

            [matching]
            done_defect_policy = "report-stale"
            "#,
        )
        .unwrap();

        assert_eq!(config.feeds.catalog.as_deref(), Some("packages.csv"));
        assert_eq!(config.feeds.vulnerabilities, SECURITY_TRACKER_URL);
        assert_eq!(config.matching.done_defect_policy, DoneDefectPolicy::ReportStale);
        assert_eq!(config.cache_ttl_hours, 24);
    }

    #[test]
    fn test_default_config_round_trips() {
        let generated = Config::generate_default_config();
        assert_eq!(Config::from_toml(&generated).unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = Config::from_toml("[matching]\ndone_defect_policy = \"sometimes\"\n");
        assert!(result.is_err());
    }
}
