use super::{log_outcome, ExposureMatcher, MatchOutcome, SkipReason};
use crate::model::{
    Classification, DefectRecord, ExposureDetail, ExposureResult, ReviewItem, ReviewReason,
    TrackedPackage,
};
use crate::version::{compare, Scheme};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How a `done` defect closed before the package was published is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoneDefectPolicy {
    /// Leave it out even when the version range applies.
    #[default]
    ExcludeStale,
    /// Report it even when the version range does not apply.
    ReportStale,
    /// Ignore timestamps.
    VersionOnly,
}

impl std::str::FromStr for DoneDefectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclude-stale" => Ok(DoneDefectPolicy::ExcludeStale),
            "report-stale" => Ok(DoneDefectPolicy::ReportStale),
            "version-only" => Ok(DoneDefectPolicy::VersionOnly),
            _ => Err(format!(
                "Unknown policy: {}. Use 'exclude-stale', 'report-stale', or 'version-only'",
                s
            )),
        }
    }
}

/// Verdict for one (tracked package, defect record) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Applicable,
    NotApplicable,
    Review(ReviewReason, bool),
}

/// Decides which defect reports still apply to installed source versions.
///
/// A defect applies when `found_in <= version < fixed_in`, where a missing
/// `fixed_in` means the defect is still open. Results are deduplicated per
/// (defect id, source package), keeping the first match in input order.
pub struct DefectMatcher<'a> {
    by_source: HashMap<&'a str, Vec<&'a DefectRecord>>,
    policy: DoneDefectPolicy,
}

impl<'a> DefectMatcher<'a> {
    pub fn new(defects: &'a [DefectRecord], policy: DoneDefectPolicy) -> Self {
        let mut by_source: HashMap<&'a str, Vec<&'a DefectRecord>> = HashMap::new();
        for defect in defects {
            by_source.entry(defect.source.as_str()).or_default().push(defect);
        }
        Self { by_source, policy }
    }

    /// Whether `version` lies inside the defect's affected range.
    pub fn in_range(version: &str, defect: &DefectRecord) -> Result<bool, SkipReason> {
        let found_in = defect.found_in.as_deref().ok_or(SkipReason::MissingFoundIn)?;
        let cmp = |a: &str, b: &str| {
            compare(a, b, Scheme::Debian).map_err(|e| {
                debug!(defect = %defect.id, "{}", e);
                SkipReason::InvalidVersion
            })
        };

        if cmp(found_in, version)? == Ordering::Greater {
            return Ok(false);
        }

        match defect.fixed_in.as_deref() {
            Some(fixed_in) => Ok(cmp(version, fixed_in)? == Ordering::Less),
            None => Ok(true),
        }
    }

    /// A `done` defect last touched before the package was published.
    pub fn is_stale(defect: &DefectRecord, package_date: Option<DateTime<Utc>>) -> bool {
        match (defect.last_modified, package_date) {
            (Some(modified), Some(published)) => defect.is_done() && modified < published,
            _ => false,
        }
    }

    pub(crate) fn verdict(&self, row: &TrackedPackage, defect: &DefectRecord) -> Result<Verdict, SkipReason> {
        let in_range = Self::in_range(&row.source_version, defect)?;
        let stale = Self::is_stale(defect, row.package_date);

        let verdict = match (self.policy, in_range, stale) {
            (DoneDefectPolicy::ExcludeStale, true, true) => {
                Verdict::Review(ReviewReason::ExcludedByTimestamp, false)
            }
            (DoneDefectPolicy::ReportStale, false, true) => {
                Verdict::Review(ReviewReason::ReportedByTimestamp, true)
            }
            (_, true, _) => Verdict::Applicable,
            (_, false, _) => Verdict::NotApplicable,
        };
        Ok(verdict)
    }

    fn exposure(row: &TrackedPackage, defect: &DefectRecord) -> ExposureResult {
        let classification = if defect.fixed_in.is_some() {
            Classification::AffectedOpen
        } else {
            Classification::AffectedUnresolved
        };

        ExposureResult {
            package: row.source.clone(),
            version: row.source_version.clone(),
            identifier: defect.id.clone(),
            classification,
            detail: ExposureDetail::Defect {
                kind: defect.kind,
                status: defect.status.clone(),
                severity: defect.severity.clone(),
                found_in: defect.found_in.clone().unwrap_or_default(),
                fixed_in: defect.fixed_in.clone(),
                last_modified: defect.last_modified,
            },
        }
    }
}

impl ExposureMatcher for DefectMatcher<'_> {
    fn name(&self) -> &'static str {
        "defects"
    }

    fn run(&self, tracked: &[TrackedPackage]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        let mut reported: HashSet<(&str, &str)> = HashSet::new();
        let mut reviewed: HashSet<(&str, &str, &str)> = HashSet::new();

        for row in tracked {
            let Some(defects) = self.by_source.get(row.source.as_str()) else {
                continue;
            };

            for defect in defects {
                if reported.contains(&(defect.id.as_str(), row.source.as_str())) {
                    continue;
                }

                let report = match self.verdict(row, defect) {
                    Ok(Verdict::Applicable) => true,
                    Ok(Verdict::NotApplicable) => false,
                    Ok(Verdict::Review(reason, report)) => {
                        let key = (defect.id.as_str(), row.source.as_str(), row.source_version.as_str());
                        if reviewed.insert(key) {
                            outcome.review.push(ReviewItem {
                                package: row.source.clone(),
                                version: row.source_version.clone(),
                                identifier: defect.id.clone(),
                                reason,
                            });
                        }
                        report
                    }
                    Err(reason) => {
                        debug!(source = %row.source, defect = %defect.id, reason = reason.as_str(), "Skipping defect");
                        outcome.skipped.record(reason);
                        false
                    }
                };

                if report {
                    reported.insert((defect.id.as_str(), row.source.as_str()));
                    outcome.results.push(Self::exposure(row, defect));
                }
            }
        }

        log_outcome(self.name(), &outcome);
        outcome
    }
}
