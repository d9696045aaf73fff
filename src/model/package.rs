use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Debian,
    Npm,
}

impl Ecosystem {
    pub fn display_name(&self) -> &'static str {
        match self {
            Ecosystem::Debian => "Debian",
            Ecosystem::Npm => "NPM",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A binary package found installed in the target environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub package: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

impl InstalledPackage {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            release: None,
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }
}

/// One historically observed package version inside a distribution release.
///
/// `release` is the release the version was first seen in; it doubles as
/// the grouping key for "competing" versions when computing missing updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub package: String,
    pub version: String,
    pub source: String,
    pub source_version: String,
    pub release: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_date: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn new(
        package: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
        source_version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            source: source.into(),
            source_version: source_version.into(),
            release: release.into(),
            package_date: None,
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.package_date = Some(date);
        self
    }
}

/// An installed package resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPackage {
    pub package: String,
    pub version: String,
    pub source: String,
    pub source_version: String,
    pub release: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_date: Option<DateTime<Utc>>,
    pub missing_updates: usize,
}

impl TrackedPackage {
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            package: entry.package.clone(),
            version: entry.version.clone(),
            source: entry.source.clone(),
            source_version: entry.source_version.clone(),
            release: entry.release.clone(),
            package_date: entry.package_date,
            missing_updates: 0,
        }
    }

    pub fn is_outdated(&self) -> bool {
        self.missing_updates > 0
    }
}

/// A released version and its publication date, as listed by a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasedVersion {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl ReleasedVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            date: None,
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}
