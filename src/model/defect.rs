use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which defect table a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectKind {
    Normal,
    Archived,
}

impl DefectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectKind::Normal => "normal",
            DefectKind::Archived => "archived",
        }
    }
}

/// One (found_in, fixed_in) pair of a defect report.
///
/// A report found in several versions or fixed in several versions appears
/// as several records sharing the same `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectRecord {
    pub source: String,
    pub id: String,
    pub found_in: Option<String>,
    pub fixed_in: Option<String>,
    pub kind: DefectKind,
    pub status: String,
    pub severity: String,
    pub arrival: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl DefectRecord {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
            found_in: None,
            fixed_in: None,
            kind: DefectKind::Normal,
            status: "pending".to_string(),
            severity: "normal".to_string(),
            arrival: None,
            last_modified: None,
        }
    }

    pub fn found_in(mut self, version: impl Into<String>) -> Self {
        self.found_in = Some(version.into());
        self
    }

    pub fn fixed_in(mut self, version: impl Into<String>) -> Self {
        self.fixed_in = Some(version.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    pub fn with_kind(mut self, kind: DefectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn modified_at(mut self, date: DateTime<Utc>) -> Self {
        self.last_modified = Some(date);
        self
    }

    pub fn is_done(&self) -> bool {
        self.status.eq_ignore_ascii_case("done")
    }
}
