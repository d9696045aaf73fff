//! Lag calculation and exposure matching.
//!
//! Every matcher works over fully materialised, read-only inputs and
//! returns a [`MatchOutcome`]: the exposures it found plus a count of the
//! records it had to skip. A malformed record never aborts a pass.

mod catalog;
mod defect;
mod lag;
mod vulnerability;

pub use catalog::Catalog;
pub use defect::{DefectMatcher, DoneDefectPolicy};
pub use lag::{compute_lag, missing_updates, DistroLag, Lag};
pub use vulnerability::{VulnerabilityIndex, VulnerabilityMatcher};

use crate::model::{ExposureResult, ReviewItem, TrackedPackage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a record was left out of a matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    InvalidVersion,
    MissingFixedVersion,
    UnknownStatus,
    MissingFoundIn,
    MissingRelease,
    MalformedRow,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InvalidVersion => "invalid-version",
            SkipReason::MissingFixedVersion => "missing-fixed-version",
            SkipReason::UnknownStatus => "unknown-status",
            SkipReason::MissingFoundIn => "missing-found-in",
            SkipReason::MissingRelease => "missing-release",
            SkipReason::MalformedRow => "malformed-row",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkipStats {
    counts: BTreeMap<SkipReason, usize>,
}

impl SkipStats {
    pub fn record(&mut self, reason: SkipReason) {
        self.add(reason, 1);
    }

    pub fn add(&mut self, reason: SkipReason, count: usize) {
        if count > 0 {
            *self.counts.entry(reason).or_default() += count;
        }
    }

    pub fn merge(&mut self, other: &SkipStats) {
        for (reason, count) in &other.counts {
            self.add(*reason, *count);
        }
    }

    pub fn get(&self, reason: SkipReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SkipReason, usize)> + '_ {
        self.counts.iter().map(|(reason, count)| (*reason, *count))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub results: Vec<ExposureResult>,
    pub review: Vec<ReviewItem>,
    pub skipped: SkipStats,
}

/// A matcher that finds exposures for tracked packages.
pub trait ExposureMatcher {
    fn name(&self) -> &'static str;
    fn run(&self, tracked: &[TrackedPackage]) -> MatchOutcome;
}

pub(crate) fn log_outcome(name: &str, outcome: &MatchOutcome) {
    tracing::info!(
        matcher = name,
        results = outcome.results.len(),
        review = outcome.review.len(),
        skipped = outcome.skipped.total(),
        "Matching pass finished"
    );
    if !outcome.skipped.is_empty() {
        for (reason, count) in outcome.skipped.iter() {
            tracing::warn!(matcher = name, reason = reason.as_str(), count, "Skipped records");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_stats_merge() {
        let mut a = SkipStats::default();
        a.record(SkipReason::InvalidVersion);
        a.record(SkipReason::InvalidVersion);

        let mut b = SkipStats::default();
        b.record(SkipReason::MissingFixedVersion);
        b.add(SkipReason::MalformedRow, 0);

        a.merge(&b);
        assert_eq!(a.get(SkipReason::InvalidVersion), 2);
        assert_eq!(a.get(SkipReason::MissingFixedVersion), 1);
        assert_eq!(a.get(SkipReason::MalformedRow), 0);
        assert_eq!(a.total(), 3);
    }

    #[test]
    fn test_skip_stats_serialize_as_map() {
        let mut stats = SkipStats::default();
        stats.record(SkipReason::MissingFoundIn);
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"missing-found-in":1}"#);
    }
}
