//! End-to-end analysis of an installed-package inventory.
//!
//! [`DebianAnalysis`] tracks dpkg packages against the release catalog,
//! counts missing updates and runs the vulnerability and defect matchers.
//! [`npm_lag`] measures semantic-version lag of npm packages against a
//! [`ReleaseHistory`].
//!
//! # Example
//!
//! ```
//! use lagscan::analysis::DebianAnalysis;
//! use lagscan::checker::Catalog;
//! use lagscan::model::{CatalogEntry, InstalledPackage};
//!
//! let catalog = Catalog::new(vec![
//!     CatalogEntry::new("bash", "4.4-5", "bash", "4.4-5", "stretch"),
//!     CatalogEntry::new("bash", "4.4-5+deb9u1", "bash", "4.4-5+deb9u1", "stretch"),
//! ]);
//! let report = DebianAnalysis::new(catalog).run(&[InstalledPackage::new("bash", "4.4-5")]);
//!
//! assert_eq!(report.tracked[0].missing_updates, 1);
//! ```

use crate::checker::{
    compute_lag, Catalog, DefectMatcher, DistroLag, DoneDefectPolicy, ExposureMatcher,
    SkipReason, SkipStats, VulnerabilityIndex, VulnerabilityMatcher,
};
use crate::config::IgnoreConfig;
use crate::error::MatchError;
use crate::feed::ReleaseHistory;
use crate::model::{
    AnalysisReport, DefectRecord, Ecosystem, ExposureResult, InstalledPackage, PackageLag,
};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Registry lookups in flight at once.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Inputs for analysing a Debian image.
pub struct DebianAnalysis {
    catalog: Catalog,
    vulnerabilities: VulnerabilityIndex,
    defects: Vec<DefectRecord>,
    policy: DoneDefectPolicy,
    ignore: IgnoreConfig,
    release: Option<String>,
}

impl DebianAnalysis {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            vulnerabilities: VulnerabilityIndex::default(),
            defects: Vec::new(),
            policy: DoneDefectPolicy::default(),
            ignore: IgnoreConfig::default(),
            release: None,
        }
    }

    pub fn with_vulnerabilities(mut self, index: VulnerabilityIndex) -> Self {
        self.vulnerabilities = index;
        self
    }

    pub fn with_defects(mut self, defects: Vec<DefectRecord>, policy: DoneDefectPolicy) -> Self {
        self.defects = defects;
        self.policy = policy;
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreConfig) -> Self {
        self.ignore = ignore;
        self
    }

    /// Release codename of the image, reported alongside the results.
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn run(&self, installed: &[InstalledPackage]) -> AnalysisReport {
        let mut report = AnalysisReport::new(Ecosystem::Debian);
        report.release = self.release.clone();

        let installed: Vec<InstalledPackage> = installed
            .iter()
            .filter(|p| !self.ignore.should_ignore_package(&p.package))
            .map(|p| match (&p.release, &self.release) {
                (None, Some(release)) => p.clone().with_release(release.as_str()),
                _ => p.clone(),
            })
            .collect();

        let (tracked, untracked) = self.catalog.track(&installed);
        info!(
            tracked = tracked.len(),
            untracked = untracked.len(),
            "Resolved installed packages against the catalog"
        );

        let (tracked, lag_skips) = DistroLag::new(&self.catalog).annotate(tracked);
        report.skipped.merge(&lag_skips);

        if !self.vulnerabilities.is_empty() {
            let outcome = VulnerabilityMatcher::new(&self.catalog, &self.vulnerabilities).run(&tracked);
            report.vulnerabilities = self.retain(outcome.results, |id| {
                self.ignore.should_ignore_vulnerability(id)
            });
            report.skipped.merge(&outcome.skipped);
        }

        if !self.defects.is_empty() {
            let outcome = DefectMatcher::new(&self.defects, self.policy).run(&tracked);
            report.defects = self.retain(outcome.results, |id| self.ignore.should_ignore_defect(id));
            report.review = outcome
                .review
                .into_iter()
                .filter(|item| !self.ignore.should_ignore_defect(&item.identifier))
                .collect();
            report.skipped.merge(&outcome.skipped);
        }

        if !report.skipped.is_empty() {
            warn!(skipped = report.skipped.total(), "Some records could not be evaluated");
        }

        report.tracked = tracked;
        report.untracked = untracked;
        report
    }

    fn retain(
        &self,
        results: Vec<ExposureResult>,
        ignored: impl Fn(&str) -> bool,
    ) -> Vec<ExposureResult> {
        results
            .into_iter()
            .filter(|r| !ignored(&r.identifier) && !self.ignore.should_ignore_package(&r.package))
            .collect()
    }
}

enum LagOutcome {
    Measured(PackageLag),
    Untracked(InstalledPackage),
    Skipped(SkipReason),
}

async fn measure<H: ReleaseHistory + ?Sized>(
    history: &H,
    package: InstalledPackage,
    skipped: &mut SkipStats,
) -> LagOutcome {
    let versions = match history.versions(&package.package).await {
        Ok(versions) => versions,
        Err(e) => {
            warn!(package = %package.package, "Registry lookup failed: {:#}", e);
            return LagOutcome::Untracked(package);
        }
    };

    match compute_lag(&package.package, &versions, &package.version, skipped) {
        Ok(lag) => LagOutcome::Measured(PackageLag {
            package: package.package,
            version: package.version,
            lag,
        }),
        Err(MatchError::EmptyCatalog { .. }) => LagOutcome::Untracked(package),
        Err(e) => {
            debug!(package = %package.package, "{}", e);
            LagOutcome::Skipped(SkipReason::InvalidVersion)
        }
    }
}

/// Measures semantic-version lag for installed npm packages.
///
/// Packages the registry does not know are reported as untracked. Rows keep
/// the order of `installed`.
pub async fn npm_lag<H: ReleaseHistory + ?Sized>(
    history: &H,
    installed: &[InstalledPackage],
    ignore: &IgnoreConfig,
) -> AnalysisReport {
    let mut report = AnalysisReport::new(Ecosystem::Npm);

    let outcomes: Vec<(LagOutcome, SkipStats)> = stream::iter(
        installed
            .iter()
            .filter(|p| !ignore.should_ignore_package(&p.package))
            .cloned(),
    )
    .map(|package| async move {
        let mut skipped = SkipStats::default();
        let outcome = measure(history, package, &mut skipped).await;
        (outcome, skipped)
    })
    .buffered(MAX_CONCURRENT_LOOKUPS)
    .collect()
    .await;

    for (outcome, skipped) in outcomes {
        report.skipped.merge(&skipped);
        match outcome {
            LagOutcome::Measured(lag) => report.lag.push(lag),
            LagOutcome::Untracked(package) => report.untracked.push(package),
            LagOutcome::Skipped(reason) => report.skipped.record(reason),
        }
    }

    info!(
        measured = report.lag.len(),
        untracked = report.untracked.len(),
        skipped = report.skipped.total(),
        "Computed npm lag"
    );
    report
}
