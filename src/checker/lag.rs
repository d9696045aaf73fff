use super::{Catalog, SkipReason, SkipStats};
use crate::error::MatchError;
use crate::model::{ReleasedVersion, TrackedPackage};
use crate::version::{DebianVersion, ReleaseType, SemanticVersion};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Releases published after the installed version, by magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lag {
    pub major: usize,
    pub minor: usize,
    pub patch: usize,
    pub latest: String,
}

impl Lag {
    pub fn total(&self) -> usize {
        self.major + self.minor + self.patch
    }

    pub fn is_up_to_date(&self) -> bool {
        self.total() == 0
    }
}

/// Counts distinct candidate versions ordered strictly after `installed`.
///
/// Candidates are distinct under dpkg ordering, so `1.0-2` and `0:1.0-2`
/// count once. Candidates that fail to parse are counted in `skipped` and ignored.
pub fn missing_updates<'a>(
    installed: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    skipped: &mut SkipStats,
) -> Result<usize, MatchError> {
    let installed: DebianVersion = installed.parse()?;
    let mut newer = BTreeSet::new();

    for candidate in candidates {
        match candidate.parse::<DebianVersion>() {
            Ok(version) if version > installed => {
                newer.insert(version);
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Skipping catalog version: {}", e);
                skipped.record(SkipReason::InvalidVersion);
            }
        }
    }

    Ok(newer.len())
}

/// Computes semantic-version lag of `installed` against a release history.
///
/// Versions are ordered by their encoded value; each release is classified
/// by the step from its predecessor, and the steps landing after the
/// installed version are counted. Unparseable history entries are skipped.
pub fn compute_lag(
    package: &str,
    versions: &[ReleasedVersion],
    installed: &str,
    skipped: &mut SkipStats,
) -> Result<Lag, MatchError> {
    let empty = || MatchError::EmptyCatalog {
        package: package.to_string(),
    };
    if versions.is_empty() {
        return Err(empty());
    }

    let installed: SemanticVersion = installed.parse()?;

    let mut known: Vec<(SemanticVersion, &str)> = Vec::with_capacity(versions.len());
    for released in versions {
        match released.version.parse::<SemanticVersion>() {
            Ok(version) => known.push((version, SemanticVersion::base(&released.version))),
            Err(e) => {
                debug!(package, "Skipping registry version: {}", e);
                skipped.record(SkipReason::InvalidVersion);
            }
        }
    }

    known.sort_by_key(|(version, _)| *version);
    known.dedup_by_key(|(version, _)| *version);

    let (_, latest) = known.last().ok_or_else(empty)?;
    let mut lag = Lag {
        major: 0,
        minor: 0,
        patch: 0,
        latest: latest.to_string(),
    };

    let mut previous = None;
    for (version, _) in &known {
        let step = ReleaseType::between(previous, *version);
        previous = Some(*version);
        if *version <= installed {
            continue;
        }
        match step {
            ReleaseType::Major => lag.major += 1,
            ReleaseType::Minor => lag.minor += 1,
            ReleaseType::Patch => lag.patch += 1,
        }
    }

    Ok(lag)
}

/// Fills in missing updates for tracked distribution packages.
///
/// Only catalog versions observed in a release the installed version was
/// also observed in are compared.
pub struct DistroLag<'a> {
    catalog: &'a Catalog,
}

impl<'a> DistroLag<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn annotate(&self, tracked: Vec<TrackedPackage>) -> (Vec<TrackedPackage>, SkipStats) {
        let mut skipped = SkipStats::default();
        let mut counts: HashMap<(String, String), usize> = HashMap::new();

        let mut releases: HashMap<(&str, &str), BTreeSet<&str>> = HashMap::new();
        for row in &tracked {
            releases
                .entry((row.package.as_str(), row.version.as_str()))
                .or_default()
                .insert(row.release.as_str());
        }

        for ((package, version), releases) in &releases {
            let candidates = self
                .catalog
                .package_entries(package)
                .filter(|entry| releases.contains(entry.release.as_str()))
                .map(|entry| entry.version.as_str());

            match missing_updates(version, candidates, &mut skipped) {
                Ok(count) => {
                    counts.insert((package.to_string(), version.to_string()), count);
                }
                Err(e) => {
                    debug!(package, "Cannot compute missing updates: {}", e);
                    skipped.record(SkipReason::InvalidVersion);
                }
            }
        }

        let annotated = tracked
            .iter()
            .map(|row| TrackedPackage {
                missing_updates: counts
                    .get(&(row.package.clone(), row.version.clone()))
                    .copied()
                    .unwrap_or(0),
                ..row.clone()
            })
            .collect();

        (annotated, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogEntry;

    fn released(versions: &[&str]) -> Vec<ReleasedVersion> {
        versions.iter().map(|v| ReleasedVersion::new(*v)).collect()
    }

    #[test]
    fn test_missing_updates_counts_distinct_newer() {
        let mut skipped = SkipStats::default();
        let candidates = ["1.0-1", "1.0-2", "1.0-2", "1.1-1", "0.9-1", "1.0-1~bpo1"];
        let count = missing_updates("1.0-1", candidates, &mut skipped).unwrap();
        assert_eq!(count, 2);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_missing_updates_treats_equal_spellings_as_one() {
        let mut skipped = SkipStats::default();
        let count = missing_updates("1.0-1", ["1.0-2", "0:1.0-2", "1.00-2"], &mut skipped).unwrap();
        assert_eq!(count, 1);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_missing_updates_skips_bad_candidates() {
        let mut skipped = SkipStats::default();
        let count = missing_updates("1.0-1", ["1.0-2", "bad version"], &mut skipped).unwrap();
        assert_eq!(count, 1);
        assert_eq!(skipped.get(SkipReason::InvalidVersion), 1);
    }

    #[test]
    fn test_missing_updates_rejects_bad_installed_version() {
        let mut skipped = SkipStats::default();
        assert!(missing_updates("", ["1.0"], &mut skipped).is_err());
    }

    #[test]
    fn test_compute_lag_buckets_by_step() {
        let mut skipped = SkipStats::default();
        let lag = compute_lag("grunt", &released(&["1.0.0", "1.2.0", "2.0.0"]), "1.0.0", &mut skipped)
            .unwrap();
        assert_eq!(
            lag,
            Lag {
                major: 1,
                minor: 1,
                patch: 0,
                latest: "2.0.0".to_string(),
            }
        );
    }

    #[test]
    fn test_compute_lag_up_to_date() {
        let mut skipped = SkipStats::default();
        let lag = compute_lag("grunt", &released(&["2.0.0", "1.0.0"]), "2.0.0", &mut skipped).unwrap();
        assert!(lag.is_up_to_date());
        assert_eq!(lag.latest, "2.0.0");
    }

    #[test]
    fn test_compute_lag_ignores_qualifiers_and_duplicates() {
        let mut skipped = SkipStats::default();
        let versions = released(&["1.0.0", "1.0.1-beta.1", "1.0.1", "1.0.2", "nightly"]);
        let lag = compute_lag("left-pad", &versions, "v1.0.0-rc.1", &mut skipped).unwrap();
        assert_eq!((lag.major, lag.minor, lag.patch), (0, 0, 2));
        assert_eq!(lag.latest, "1.0.2");
        assert_eq!(skipped.get(SkipReason::InvalidVersion), 1);
    }

    #[test]
    fn test_compute_lag_first_release_counts_as_major() {
        let mut skipped = SkipStats::default();
        let lag = compute_lag("grunt", &released(&["0.1.0", "0.1.1"]), "0.0.1", &mut skipped).unwrap();
        assert_eq!((lag.major, lag.minor, lag.patch), (1, 0, 1));
    }

    #[test]
    fn test_compute_lag_empty_catalog() {
        let mut skipped = SkipStats::default();
        let err = compute_lag("grunt", &[], "1.0.0", &mut skipped).unwrap_err();
        assert_eq!(
            err,
            MatchError::EmptyCatalog {
                package: "grunt".to_string()
            }
        );
        let err = compute_lag("grunt", &released(&["latest"]), "1.0.0", &mut skipped).unwrap_err();
        assert!(matches!(err, MatchError::EmptyCatalog { .. }));
    }

    #[test]
    fn test_distro_lag_compares_within_observed_releases() {
        let catalog = Catalog::new(vec![
            CatalogEntry::new("curl", "7.52.1-5", "curl", "7.52.1-5", "stretch"),
            CatalogEntry::new("curl", "7.52.1-5+deb9u1", "curl", "7.52.1-5+deb9u1", "stretch"),
            CatalogEntry::new("curl", "7.52.1-5+deb9u2", "curl", "7.52.1-5+deb9u2", "stretch"),
            CatalogEntry::new("curl", "7.64.0-4", "curl", "7.64.0-4", "buster"),
        ]);
        let (tracked, _) = catalog.track(&[crate::model::InstalledPackage::new("curl", "7.52.1-5")]);

        let (annotated, skipped) = DistroLag::new(&catalog).annotate(tracked);
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].missing_updates, 2);
        assert!(skipped.is_empty());
    }
}
