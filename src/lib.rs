//! # lagscan
//!
//! Measures how far the packages installed in a container image lag behind
//! their distribution and which known vulnerabilities and defects still
//! apply to them.
//!
//! ## Ecosystems
//!
//! - **Debian**: `dpkg -l` inventories, tracked against a release catalog,
//!   the Debian Security Tracker and a bug tracker export
//! - **npm**: `npm ls -g` inventories, measured against the npm registry
//!
//! ## Quick Start
//!
//! ```no_run
//! use lagscan::analysis::DebianAnalysis;
//! use lagscan::checker::{Catalog, VulnerabilityIndex};
//! use lagscan::feed::{parse_catalog, parse_security_tracker, FeedLoader, SECURITY_TRACKER_URL};
//! use lagscan::scanner::{DpkgScanner, Scanner};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let installed = DpkgScanner.scan_file(Path::new("dpkg.txt")).await?;
//!
//!     let loader = FeedLoader::new();
//!     let catalog = parse_catalog(&loader.load_text(&"packages.csv".parse()?).await?)?;
//!     let tracker = loader.load_text(&SECURITY_TRACKER_URL.parse()?).await?;
//!     let vulnerabilities = parse_security_tracker(&tracker)?;
//!
//!     let report = DebianAnalysis::new(Catalog::new(catalog.records))
//!         .with_vulnerabilities(VulnerabilityIndex::new(vulnerabilities.records))
//!         .run(&installed);
//!
//!     println!("{} vulnerabilities", report.vulnerabilities.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Comparing versions
//!
//! ```
//! use lagscan::version::{compare, Scheme};
//! use std::cmp::Ordering;
//!
//! assert_eq!(compare("1.0~rc1", "1.0", Scheme::Debian).unwrap(), Ordering::Less);
//! assert_eq!(compare("1:0.9", "2.0", Scheme::Debian).unwrap(), Ordering::Greater);
//! assert_eq!(compare("v1.2.3", "1.2.3-beta", Scheme::Semantic).unwrap(), Ordering::Equal);
//! ```

pub mod analysis;
pub mod cache;
pub mod checker;
pub mod config;
pub mod error;
pub mod feed;
pub mod model;
pub mod output;
pub mod scanner;
pub mod version;

pub use cache::Cache;
pub use config::Config;
pub use error::MatchError;
pub use model::{AnalysisReport, Ecosystem, ExposureResult, InstalledPackage};
pub use scanner::Scanner;
pub use version::{compare, Scheme};
