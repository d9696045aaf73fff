//! Version parsing and ordering.
//!
//! Two schemes are supported:
//!
//! - [`Scheme::Debian`] - `[epoch:]upstream[-revision]`, ordered the way
//!   `dpkg --compare-versions` orders them (see [`DebianVersion`]).
//! - [`Scheme::Semantic`] - `major.minor.patch` with an optional leading `v`
//!   and a `-qualifier` suffix that is dropped (see [`SemanticVersion`]).
//!
//! # Example
//!
//! ```
//! use lagscan::version::{compare, Scheme};
//! use std::cmp::Ordering;
//!
//! assert_eq!(compare("1.0~beta1", "1.0", Scheme::Debian).unwrap(), Ordering::Less);
//! assert_eq!(compare("1:0.5", "2.0", Scheme::Debian).unwrap(), Ordering::Greater);
//! assert_eq!(compare("v1.2.0", "1.10.0", Scheme::Semantic).unwrap(), Ordering::Less);
//! ```

mod debian;
mod semantic;

pub use debian::DebianVersion;
pub use semantic::{ReleaseType, SemanticVersion};

use crate::error::MatchError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Debian,
    Semantic,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Debian => "debian",
            Scheme::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debian" | "deb" | "dpkg" => Ok(Scheme::Debian),
            "semantic" | "semver" | "npm" => Ok(Scheme::Semantic),
            _ => Err(format!("Unknown version scheme: {}. Use 'debian' or 'semantic'", s)),
        }
    }
}

/// Compares two version strings under `scheme`.
///
/// Fails with [`MatchError::InvalidVersionFormat`] if either side does not
/// follow the scheme's grammar.
pub fn compare(a: &str, b: &str, scheme: Scheme) -> Result<Ordering, MatchError> {
    match scheme {
        Scheme::Debian => {
            let a: DebianVersion = a.parse()?;
            let b: DebianVersion = b.parse()?;
            Ok(a.cmp(&b))
        }
        Scheme::Semantic => {
            let a: SemanticVersion = a.parse()?;
            let b: SemanticVersion = b.parse()?;
            Ok(a.cmp(&b))
        }
    }
}
