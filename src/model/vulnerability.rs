use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnStatus {
    Open,
    Undetermined,
    Resolved,
    #[serde(other)]
    Unknown,
}

impl VulnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnStatus::Open => "open",
            VulnStatus::Undetermined => "undetermined",
            VulnStatus::Resolved => "resolved",
            VulnStatus::Unknown => "unknown",
        }
    }
}

/// The status of one CVE as seen from one distribution release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseView {
    pub status: VulnStatus,
    pub urgency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
}

impl ReleaseView {
    pub fn new(status: VulnStatus, urgency: impl Into<String>) -> Self {
        Self {
            status,
            urgency: urgency.into(),
            fixed_version: None,
        }
    }

    pub fn fixed_in(mut self, version: impl Into<String>) -> Self {
        self.fixed_version = Some(version.into());
        self
    }
}

/// A CVE affecting a source package, with its per-release views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    pub source: String,
    pub cve: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug: Option<String>,
    pub releases: BTreeMap<String, ReleaseView>,
}

impl VulnerabilityRecord {
    pub fn new(source: impl Into<String>, cve: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            cve: cve.into(),
            bug: None,
            releases: BTreeMap::new(),
        }
    }

    pub fn with_release(mut self, release: impl Into<String>, view: ReleaseView) -> Self {
        self.releases.insert(release.into(), view);
        self
    }

    pub fn with_bug(mut self, bug: impl Into<String>) -> Self {
        self.bug = Some(bug.into());
        self
    }

    pub fn view(&self, release: &str) -> Option<&ReleaseView> {
        self.releases.get(release)
    }
}
