//! Core data types for packages, catalogs, exposures, and analysis reports.
//!
//! This module contains the records exchanged between the feed loaders,
//! the matchers and the output renderers:
//!
//! - [`InstalledPackage`] - A package found installed in the target
//! - [`CatalogEntry`] - A historically observed package version
//! - [`TrackedPackage`] - An installed package resolved against the catalog
//! - [`VulnerabilityRecord`] - A CVE and its per-release status
//! - [`DefectRecord`] - A defect report with found-in/fixed-in bounds
//! - [`ExposureResult`] - A vulnerability or defect that applies
//! - [`AnalysisReport`] - Complete analysis results
//!
//! # Example
//!
//! ```
//! use lagscan::model::{AnalysisReport, Ecosystem};
//!
//! let report = AnalysisReport::new(Ecosystem::Debian);
//! assert_eq!(report.summary().exposures(), 0);
//! ```

mod defect;
mod exposure;
mod package;
mod timestamp;
mod vulnerability;

pub use defect::*;
pub use exposure::*;
pub use package::*;
pub use timestamp::{is_placeholder, parse_timestamp};
pub use vulnerability::*;

use crate::checker::{Lag, SkipStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Technical lag of one installed package measured against its registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageLag {
    pub package: String,
    pub version: String,
    #[serde(flatten)]
    pub lag: Lag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ecosystem: Ecosystem,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    pub tracked: Vec<TrackedPackage>,
    pub untracked: Vec<InstalledPackage>,
    pub lag: Vec<PackageLag>,
    pub vulnerabilities: Vec<ExposureResult>,
    pub defects: Vec<ExposureResult>,
    pub review: Vec<ReviewItem>,
    pub skipped: SkipStats,
}

impl AnalysisReport {
    pub fn new(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            generated_at: Utc::now(),
            release: None,
            tracked: Vec::new(),
            untracked: Vec::new(),
            lag: Vec::new(),
            vulnerabilities: Vec::new(),
            defects: Vec::new(),
            review: Vec::new(),
            skipped: SkipStats::default(),
        }
    }

    pub fn has_exposures(&self) -> bool {
        !self.vulnerabilities.is_empty() || !self.defects.is_empty()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_report(self)
    }
}

/// Counts used by the report renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub up_to_date: usize,
    pub out_of_date: usize,
    pub vulnerabilities_by_urgency: BTreeMap<String, usize>,
    pub defects_by_severity: BTreeMap<String, usize>,
    pub by_classification: BTreeMap<Classification, usize>,
    pub skipped: usize,
}

impl Summary {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let mut summary = Summary::default();

        // A package is counted once even when it was seen in several releases.
        let mut outdated: BTreeMap<(&str, &str), bool> = BTreeMap::new();
        for tracked in &report.tracked {
            let entry = outdated
                .entry((tracked.package.as_str(), tracked.version.as_str()))
                .or_default();
            *entry |= tracked.is_outdated();
        }
        for lag in &report.lag {
            let entry = outdated
                .entry((lag.package.as_str(), lag.version.as_str()))
                .or_default();
            *entry |= !lag.lag.is_up_to_date();
        }
        summary.out_of_date = outdated.values().filter(|o| **o).count();
        summary.up_to_date = outdated.len() - summary.out_of_date;

        for vuln in &report.vulnerabilities {
            *summary
                .vulnerabilities_by_urgency
                .entry(vuln.severity().to_string())
                .or_default() += 1;
            *summary.by_classification.entry(vuln.classification).or_default() += 1;
        }
        for defect in &report.defects {
            *summary
                .defects_by_severity
                .entry(defect.severity().to_string())
                .or_default() += 1;
            *summary.by_classification.entry(defect.classification).or_default() += 1;
        }

        summary.skipped = report.skipped.total();
        summary
    }

    pub fn exposures(&self) -> usize {
        self.by_classification
            .iter()
            .filter(|(classification, _)| classification.is_affected())
            .map(|(_, count)| count)
            .sum()
    }
}
