use super::{log_outcome, Catalog, ExposureMatcher, MatchOutcome, SkipReason};
use crate::model::{
    Classification, ExposureDetail, ExposureResult, TrackedPackage, VulnStatus, VulnerabilityRecord,
};
use crate::version::{compare, Scheme};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Vulnerability records grouped by source package.
#[derive(Debug, Default)]
pub struct VulnerabilityIndex {
    by_source: HashMap<String, Vec<VulnerabilityRecord>>,
}

impl VulnerabilityIndex {
    pub fn new(records: Vec<VulnerabilityRecord>) -> Self {
        let mut by_source: HashMap<String, Vec<VulnerabilityRecord>> = HashMap::new();
        for record in records {
            by_source.entry(record.source.clone()).or_default().push(record);
        }
        for records in by_source.values_mut() {
            records.sort_by(|a, b| a.cve.cmp(&b.cve));
        }
        Self { by_source }
    }

    pub fn for_source(&self, source: &str) -> &[VulnerabilityRecord] {
        self.by_source.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Decides which CVEs leave an installed source version exposed.
///
/// Each source version is judged against the release it was first seen in.
pub struct VulnerabilityMatcher<'a> {
    catalog: &'a Catalog,
    index: &'a VulnerabilityIndex,
}

impl<'a> VulnerabilityMatcher<'a> {
    pub fn new(catalog: &'a Catalog, index: &'a VulnerabilityIndex) -> Self {
        Self { catalog, index }
    }

    /// Judges one record against one installed source version.
    ///
    /// `Ok(None)` means the record does not apply or the installed version
    /// already carries the fix.
    pub fn match_record(
        source: &str,
        version: &str,
        release: &str,
        record: &VulnerabilityRecord,
    ) -> Result<Option<ExposureResult>, SkipReason> {
        let Some(view) = record.view(release) else {
            return Ok(None);
        };

        let classification = match view.status {
            VulnStatus::Open | VulnStatus::Undetermined => Classification::AffectedUnresolved,
            VulnStatus::Resolved => {
                let fixed = view
                    .fixed_version
                    .as_deref()
                    .ok_or(SkipReason::MissingFixedVersion)?;
                match compare(version, fixed, Scheme::Debian) {
                    Ok(Ordering::Less) => Classification::AffectedOpen,
                    Ok(_) => return Ok(None),
                    Err(e) => {
                        debug!(cve = %record.cve, "{}", e);
                        return Err(SkipReason::InvalidVersion);
                    }
                }
            }
            VulnStatus::Unknown => return Err(SkipReason::UnknownStatus),
        };

        let fixed_version = match view.status {
            VulnStatus::Resolved => view.fixed_version.clone(),
            _ => None,
        };

        Ok(Some(ExposureResult {
            package: source.to_string(),
            version: version.to_string(),
            identifier: record.cve.clone(),
            classification,
            detail: ExposureDetail::Vulnerability {
                release: release.to_string(),
                urgency: view.urgency.clone(),
                status: view.status,
                fixed_version,
                bug: record.bug.clone(),
            },
        }))
    }
}

impl ExposureMatcher for VulnerabilityMatcher<'_> {
    fn name(&self) -> &'static str {
        "vulnerabilities"
    }

    fn run(&self, tracked: &[TrackedPackage]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        let sources: BTreeSet<(&str, &str)> = tracked
            .iter()
            .map(|row| (row.source.as_str(), row.source_version.as_str()))
            .collect();

        for (source, version) in sources {
            let records = self.index.for_source(source);
            if records.is_empty() {
                continue;
            }

            let Some(first_seen) = self.catalog.first_seen(source, version) else {
                debug!(source, version, "No first-seen release");
                outcome.skipped.add(SkipReason::MissingRelease, records.len());
                continue;
            };

            for record in records {
                match Self::match_record(source, version, &first_seen.release, record) {
                    Ok(Some(result)) => outcome.results.push(result),
                    Ok(None) => {}
                    Err(reason) => {
                        debug!(source, version, cve = %record.cve, reason = reason.as_str(), "Skipping vulnerability");
                        outcome.skipped.record(reason);
                    }
                }
            }
        }

        log_outcome(self.name(), &outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CatalogEntry, ReleaseView};
    use chrono::{TimeZone, Utc};

    fn catalog() -> Catalog {
        let date = |day| Utc.with_ymd_and_hms(2017, 6, day, 0, 0, 0).unwrap();
        Catalog::new(vec![
            CatalogEntry::new("libfoo1", "1.4-1", "foo", "1.4-1", "buster").with_date(date(20)),
            CatalogEntry::new("foo-bin", "1.4-1", "foo", "1.4-1", "stretch").with_date(date(2)),
            CatalogEntry::new("libfoo1", "1.6-1", "foo", "1.6-1", "stretch").with_date(date(3)),
        ])
    }

    fn tracked(catalog: &Catalog, package: &str, version: &str) -> Vec<TrackedPackage> {
        catalog
            .track(&[crate::model::InstalledPackage::new(package, version)])
            .0
    }

    fn resolved(cve: &str, release: &str, fixed: &str) -> VulnerabilityRecord {
        VulnerabilityRecord::new("foo", cve)
            .with_release(release, ReleaseView::new(VulnStatus::Resolved, "medium").fixed_in(fixed))
    }

    #[test]
    fn test_resolved_fix_newer_than_installed() {
        let record = resolved("CVE-2017-0001", "stretch", "1.5");
        let result = VulnerabilityMatcher::match_record("foo", "1.4", "stretch", &record)
            .unwrap()
            .unwrap();
        assert_eq!(result.classification, Classification::AffectedOpen);
        assert_eq!(result.fixed_version(), Some("1.5"));

        let none = VulnerabilityMatcher::match_record("foo", "1.6", "stretch", &record).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_fix_boundary_is_not_affected() {
        let record = resolved("CVE-2017-0001", "stretch", "1.4-1");
        let result = VulnerabilityMatcher::match_record("foo", "1.4-1", "stretch", &record).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_open_and_undetermined_are_unresolved() {
        for status in [VulnStatus::Open, VulnStatus::Undetermined] {
            let record = VulnerabilityRecord::new("foo", "CVE-2018-0002")
                .with_release("stretch", ReleaseView::new(status, "high"))
                .with_bug("881234");
            let result = VulnerabilityMatcher::match_record("foo", "99.0", "stretch", &record)
                .unwrap()
                .unwrap();
            assert_eq!(result.classification, Classification::AffectedUnresolved);
            assert_eq!(result.severity(), "high");
        }
    }

    #[test]
    fn test_other_release_does_not_apply() {
        let record = resolved("CVE-2017-0001", "jessie", "1.5");
        let result = VulnerabilityMatcher::match_record("foo", "1.4", "stretch", &record).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let missing_fix = VulnerabilityRecord::new("foo", "CVE-1")
            .with_release("stretch", ReleaseView::new(VulnStatus::Resolved, "low"));
        assert_eq!(
            VulnerabilityMatcher::match_record("foo", "1.4", "stretch", &missing_fix),
            Err(SkipReason::MissingFixedVersion)
        );

        let bad_fix = resolved("CVE-2", "stretch", "not/a version");
        assert_eq!(
            VulnerabilityMatcher::match_record("foo", "1.4", "stretch", &bad_fix),
            Err(SkipReason::InvalidVersion)
        );

        let unknown = VulnerabilityRecord::new("foo", "CVE-3")
            .with_release("stretch", ReleaseView::new(VulnStatus::Unknown, "low"));
        assert_eq!(
            VulnerabilityMatcher::match_record("foo", "1.4", "stretch", &unknown),
            Err(SkipReason::UnknownStatus)
        );
    }

    #[test]
    fn test_run_uses_first_seen_release() {
        let catalog = catalog();
        let index = VulnerabilityIndex::new(vec![
            resolved("CVE-2017-0002", "buster", "1.5-1"),
            resolved("CVE-2017-0001", "stretch", "1.5-1"),
            VulnerabilityRecord::new("foo", "CVE-2017-0003")
                .with_release("stretch", ReleaseView::new(VulnStatus::Resolved, "low")),
        ]);

        // libfoo1 1.4-1 is only catalogued in buster, but its source version
        // was first seen in stretch through foo-bin.
        let tracked = tracked(&catalog, "libfoo1", "1.4-1");
        let outcome = VulnerabilityMatcher::new(&catalog, &index).run(&tracked);

        let ids: Vec<_> = outcome.results.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["CVE-2017-0001"]);
        assert_eq!(outcome.skipped.get(SkipReason::MissingFixedVersion), 1);
    }

    #[test]
    fn test_run_is_deterministic() {
        let catalog = catalog();
        let index = VulnerabilityIndex::new(vec![
            resolved("CVE-2017-0009", "stretch", "2.0"),
            resolved("CVE-2017-0001", "stretch", "2.0"),
        ]);
        let mut tracked = tracked(&catalog, "libfoo1", "1.6-1");
        tracked.extend(self::tracked(&catalog, "foo-bin", "1.4-1"));

        let matcher = VulnerabilityMatcher::new(&catalog, &index);
        let first = serde_json::to_string(&matcher.run(&tracked).results).unwrap();
        let second = serde_json::to_string(&matcher.run(&tracked).results).unwrap();
        assert_eq!(first, second);
        assert_eq!(matcher.run(&tracked).results.len(), 4);
    }
}
