use super::{DefectKind, VulnStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// A fix exists but is newer than the installed version.
    AffectedOpen,
    /// No fix exists yet.
    AffectedUnresolved,
    NotAffected,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::AffectedOpen => "affected-open",
            Classification::AffectedUnresolved => "affected-unresolved",
            Classification::NotAffected => "not-affected",
        }
    }

    pub fn is_affected(&self) -> bool {
        !matches!(self, Classification::NotAffected)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reporting attributes carried along with an exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExposureDetail {
    Vulnerability {
        release: String,
        urgency: String,
        status: VulnStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        fixed_version: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bug: Option<String>,
    },
    Defect {
        kind: DefectKind,
        status: String,
        severity: String,
        found_in: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fixed_in: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_modified: Option<DateTime<Utc>>,
    },
}

/// A vulnerability or defect that applies to an installed source version.
///
/// Always derived from its source records and never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureResult {
    pub package: String,
    pub version: String,
    pub identifier: String,
    pub classification: Classification,
    pub detail: ExposureDetail,
}

impl ExposureResult {
    /// Urgency for vulnerabilities, severity for defects.
    pub fn severity(&self) -> &str {
        match &self.detail {
            ExposureDetail::Vulnerability { urgency, .. } => urgency,
            ExposureDetail::Defect { severity, .. } => severity,
        }
    }

    pub fn fixed_version(&self) -> Option<&str> {
        match &self.detail {
            ExposureDetail::Vulnerability { fixed_version, .. } => fixed_version.as_deref(),
            ExposureDetail::Defect { fixed_in, .. } => fixed_in.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewReason {
    /// The version range applies but the defect was closed before the
    /// package was published, so it was left out.
    ExcludedByTimestamp,
    /// The version range does not apply but the defect was closed before
    /// the package was published, so it was reported anyway.
    ReportedByTimestamp,
}

impl ReviewReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewReason::ExcludedByTimestamp => "excluded-by-timestamp",
            ReviewReason::ReportedByTimestamp => "reported-by-timestamp",
        }
    }
}

/// A defect whose timestamp and version range disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub package: String,
    pub version: String,
    pub identifier: String,
    pub reason: ReviewReason,
}
