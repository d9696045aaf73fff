use crate::model::{CatalogEntry, InstalledPackage, TrackedPackage};
use std::collections::{HashMap, HashSet};

/// Read-only index over the release history of a distribution.
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_package: HashMap<String, Vec<usize>>,
    by_source: HashMap<(String, String), Vec<usize>>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut by_package: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_source: HashMap<(String, String), Vec<usize>> = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            by_package.entry(entry.package.clone()).or_default().push(idx);
            by_source
                .entry((entry.source.clone(), entry.source_version.clone()))
                .or_default()
                .push(idx);
        }

        Self {
            entries,
            by_package,
            by_source,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries for a binary package, in input order.
    pub fn package_entries<'a>(&'a self, package: &str) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.by_package
            .get(package)
            .into_iter()
            .flatten()
            .map(|idx| &self.entries[*idx])
    }

    /// Resolves installed packages against the catalog.
    ///
    /// Each catalog entry matching an installed (package, version) yields
    /// one tracked row, so a version seen in several releases is tracked
    /// once per release. Installed packages without any match are returned
    /// separately.
    pub fn track(&self, installed: &[InstalledPackage]) -> (Vec<TrackedPackage>, Vec<InstalledPackage>) {
        let mut tracked = Vec::new();
        let mut untracked = Vec::new();
        let mut seen = HashSet::new();

        for package in installed {
            let mut matched = false;
            for entry in self.package_entries(&package.package) {
                if entry.version != package.version {
                    continue;
                }
                matched = true;
                let key = (
                    &entry.package,
                    &entry.version,
                    &entry.source,
                    &entry.source_version,
                    &entry.release,
                );
                if seen.insert(key) {
                    tracked.push(TrackedPackage::from_entry(entry));
                }
            }
            if !matched {
                untracked.push(package.clone());
            }
        }

        (tracked, untracked)
    }

    /// The entry a source version was first observed in.
    ///
    /// The earliest dated entry wins; undated entries come after dated ones
    /// and ties keep input order.
    pub fn first_seen(&self, source: &str, source_version: &str) -> Option<&CatalogEntry> {
        self.by_source
            .get(&(source.to_string(), source_version.to_string()))?
            .iter()
            .map(|idx| &self.entries[*idx])
            .min_by_key(|entry| (entry.package_date.is_none(), entry.package_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(package: &str, version: &str, release: &str, day: Option<u32>) -> CatalogEntry {
        let entry = CatalogEntry::new(package, version, "openssl", version, release);
        match day {
            Some(day) => entry.with_date(Utc.with_ymd_and_hms(2017, 1, day, 0, 0, 0).unwrap()),
            None => entry,
        }
    }

    #[test]
    fn test_track_joins_on_package_and_version() {
        let catalog = Catalog::new(vec![
            entry("libssl1.1", "1.1.0f-3", "stretch", Some(1)),
            entry("libssl1.1", "1.1.0f-3", "buster", Some(9)),
            entry("libssl1.1", "1.1.0g-2", "buster", Some(12)),
            entry("openssl", "1.1.0f-3", "stretch", Some(1)),
        ]);
        let installed = vec![
            InstalledPackage::new("libssl1.1", "1.1.0f-3"),
            InstalledPackage::new("libssl1.1", "1.1.0f-3"),
            InstalledPackage::new("zlib1g", "1:1.2.8.dfsg-5"),
        ];

        let (tracked, untracked) = catalog.track(&installed);
        assert_eq!(tracked.len(), 2);
        assert_eq!(tracked[0].release, "stretch");
        assert_eq!(tracked[1].release, "buster");
        assert_eq!(untracked, vec![InstalledPackage::new("zlib1g", "1:1.2.8.dfsg-5")]);
    }

    #[test]
    fn test_first_seen_prefers_earliest_date() {
        let catalog = Catalog::new(vec![
            entry("libssl1.1", "1.1.0f-3", "buster", Some(9)),
            entry("openssl", "1.1.0f-3", "sid", None),
            entry("openssl", "1.1.0f-3", "stretch", Some(1)),
        ]);
        let first = catalog.first_seen("openssl", "1.1.0f-3").unwrap();
        assert_eq!(first.release, "stretch");
    }

    #[test]
    fn test_first_seen_ties_keep_input_order() {
        let catalog = Catalog::new(vec![
            entry("openssl", "1.1.0f-3", "buster", Some(1)),
            entry("libssl1.1", "1.1.0f-3", "stretch", Some(1)),
        ]);
        assert_eq!(catalog.first_seen("openssl", "1.1.0f-3").unwrap().release, "buster");
        assert!(catalog.first_seen("openssl", "9.9").is_none());
    }
}
