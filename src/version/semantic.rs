use super::Scheme;
use crate::error::MatchError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const MAJOR_WEIGHT: u64 = 1_000_000;
const MINOR_WEIGHT: u64 = 1_000;

/// A `major.minor.patch` version reduced to a single ordering key.
///
/// The key is `major * 1_000_000 + minor * 1_000 + patch`. Components of
/// 1000 or more bleed into the next one and pre-release qualifiers are
/// discarded, so this ordering is lossy by construction. Equality,
/// hashing and ordering use the key alone; the parsed components are kept
/// for classifying release steps.
#[derive(Debug, Clone, Copy)]
pub struct SemanticVersion {
    encoded: u64,
    major: u64,
    minor: u64,
    patch: u64,
}

impl SemanticVersion {
    pub fn encoded(&self) -> u64 {
        self.encoded
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// Returns the text that remains once the `v` prefix and any
    /// `-qualifier` suffix are removed.
    pub fn base(version: &str) -> &str {
        let trimmed = version.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        trimmed.split('-').next().unwrap_or(trimmed)
    }
}

impl FromStr for SemanticVersion {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MatchError::invalid(s, Scheme::Semantic);
        let base = Self::base(s);

        let mut components = Vec::new();
        for group in base.split('.') {
            if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            components.push(group.parse::<u64>().map_err(|_| invalid())?);
        }

        let component = |idx: usize| components.get(idx).copied().unwrap_or(0);
        let encoded = component(0)
            .checked_mul(MAJOR_WEIGHT)
            .and_then(|major| component(1).checked_mul(MINOR_WEIGHT)?.checked_add(major))
            .and_then(|value| value.checked_add(component(2)))
            .ok_or_else(invalid)?;

        Ok(Self {
            encoded,
            major: component(0),
            minor: component(1),
            patch: component(2),
        })
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encoded.hash(state);
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encoded.cmp(&other.encoded)
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Magnitude of the step between two consecutive releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
}

impl ReleaseType {
    /// Classifies the step from `previous` to `next` by the first parsed
    /// component that differs.
    ///
    /// With no previous release the step counts as a major release.
    pub fn between(previous: Option<SemanticVersion>, next: SemanticVersion) -> Self {
        match previous {
            None => ReleaseType::Major,
            Some(prev) if prev.major != next.major => ReleaseType::Major,
            Some(prev) if prev.minor != next.minor => ReleaseType::Minor,
            Some(_) => ReleaseType::Patch,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(s: &str) -> u64 {
        s.parse::<SemanticVersion>().unwrap().encoded()
    }

    #[test]
    fn test_encoding() {
        assert_eq!(enc("1.2.3"), 1_002_003);
        assert_eq!(enc("v2.0.0"), 2_000_000);
        assert_eq!(enc("3"), 3_000_000);
        assert_eq!(enc("3.4"), 3_004_000);
        assert_eq!(enc("1.2.3.4"), 1_002_003);
    }

    #[test]
    fn test_qualifier_is_dropped() {
        assert_eq!(enc("1.0.0-beta.2"), enc("1.0.0"));
        assert_eq!(SemanticVersion::base("v1.0.0-rc1"), "1.0.0");
    }

    #[test]
    fn test_rejects_non_numeric() {
        for s in ["", "latest", "1..0", "1.0.0+build", "1.x", ".1.0", "1.0.0~rc1"] {
            assert!(s.parse::<SemanticVersion>().is_err(), "accepted {:?}", s);
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!("99999999999999999999.0.0".parse::<SemanticVersion>().is_err());
        assert!("18446744073710.0.0".parse::<SemanticVersion>().is_err());
    }

    #[test]
    fn test_encoding_is_monotonic_below_one_thousand() {
        let samples = [
            (0, 0, 0),
            (0, 0, 999),
            (0, 1, 0),
            (0, 999, 999),
            (1, 0, 0),
            (1, 2, 3),
            (1, 10, 0),
            (2, 0, 0),
            (999, 999, 999),
        ];
        for pair in samples.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let a = enc(&format!("{}.{}.{}", a.0, a.1, a.2));
            let b = enc(&format!("{}.{}.{}", b.0, b.1, b.2));
            assert!(a < b);
        }
    }

    #[test]
    fn test_components() {
        let v: SemanticVersion = "4.17.21".parse().unwrap();
        assert_eq!((v.major(), v.minor(), v.patch()), (4, 17, 21));
    }

    #[test]
    fn test_release_type_between() {
        let v = |s: &str| s.parse::<SemanticVersion>().unwrap();
        assert_eq!(ReleaseType::between(None, v("1.0.0")), ReleaseType::Major);
        assert_eq!(ReleaseType::between(Some(v("1.0.0")), v("2.0.0")), ReleaseType::Major);
        assert_eq!(ReleaseType::between(Some(v("1.0.0")), v("1.2.0")), ReleaseType::Minor);
        assert_eq!(ReleaseType::between(Some(v("1.2.0")), v("1.2.7")), ReleaseType::Patch);
    }

    #[test]
    fn test_release_type_uses_components_past_the_encoding_range() {
        let v = |s: &str| s.parse::<SemanticVersion>().unwrap();
        assert_eq!(ReleaseType::between(Some(v("1.0.999")), v("1.0.1000")), ReleaseType::Patch);
        assert_eq!(ReleaseType::between(Some(v("0.999.0")), v("0.1000.0")), ReleaseType::Minor);

        // The key still collides, so ordering and equality follow it.
        assert_eq!(v("1.0.1000"), v("1.1.0"));
        assert_eq!((v("1.0.1000").minor(), v("1.0.1000").patch()), (0, 1000));
    }
}
