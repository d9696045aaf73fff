//! Installed-package inventory parsers.
//!
//! Inventories are captured elsewhere (`dpkg -l` or `npm ls -g` run inside
//! the image under study) and handed to a [`Scanner`] as text.
//!
//! # Available Scanners
//!
//! | Scanner | Ecosystem | Input |
//! |---------|-----------|-------|
//! | [`DpkgScanner`] | Debian | `dpkg -l` |
//! | [`NpmScanner`] | NPM | `npm ls -g` or `npm ls -g --json` |
//!
//! # Example
//!
//! ```no_run
//! use lagscan::scanner::{DpkgScanner, Scanner};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let packages = DpkgScanner.scan_file(Path::new("dpkg.txt")).await?;
//!     println!("Found {} packages", packages.len());
//!     Ok(())
//! }
//! ```

mod dpkg;
mod npm;

pub use dpkg::{release_codename, DpkgScanner};
pub use npm::NpmScanner;

use crate::model::{Ecosystem, InstalledPackage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

/// Trait for reading installed packages out of a package manager listing.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Returns the human-readable name of this scanner.
    fn name(&self) -> &'static str;

    fn ecosystem(&self) -> Ecosystem;

    /// Parses a listing into installed packages.
    ///
    /// Duplicate (package, version) pairs are dropped, keeping the first.
    fn parse(&self, listing: &str) -> Result<Vec<InstalledPackage>>;

    /// Reads and parses a listing file.
    async fn scan_file(&self, path: &Path) -> Result<Vec<InstalledPackage>> {
        let listing = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {} listing {}", self.name(), path.display()))?;
        self.parse(&listing)
    }
}

/// Returns the scanner for an ecosystem.
///
/// # Example
///
/// ```
/// use lagscan::{Ecosystem, scanner::get_scanner};
///
/// let scanner = get_scanner(Ecosystem::Npm);
/// assert_eq!(scanner.name(), "npm global packages");
/// ```
pub fn get_scanner(ecosystem: Ecosystem) -> Box<dyn Scanner> {
    match ecosystem {
        Ecosystem::Debian => Box::new(DpkgScanner),
        Ecosystem::Npm => Box::new(NpmScanner),
    }
}

fn dedup(packages: Vec<InstalledPackage>) -> Vec<InstalledPackage> {
    let mut seen = HashSet::new();
    packages
        .into_iter()
        .filter(|p| seen.insert((p.package.clone(), p.version.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_scanner_matches_ecosystem() {
        for ecosystem in [Ecosystem::Debian, Ecosystem::Npm] {
            assert_eq!(get_scanner(ecosystem).ecosystem(), ecosystem);
        }
    }

    #[test]
    fn test_dedup_keeps_first() {
        let packages = dedup(vec![
            InstalledPackage::new("a", "1"),
            InstalledPackage::new("b", "1"),
            InstalledPackage::new("a", "1"),
            InstalledPackage::new("a", "2"),
        ]);
        let pairs: Vec<_> = packages
            .iter()
            .map(|p| (p.package.as_str(), p.version.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "1"), ("a", "2")]);
    }

    #[tokio::test]
    async fn test_scan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dpkg.txt");
        std::fs::write(&path, "ii  bash  4.4-5  amd64  GNU Bourne Again SHell\n").unwrap();

        let packages = DpkgScanner.scan_file(&path).await.unwrap();
        assert_eq!(packages, vec![InstalledPackage::new("bash", "4.4-5")]);
        assert!(DpkgScanner.scan_file(&dir.path().join("missing")).await.is_err());
    }
}
