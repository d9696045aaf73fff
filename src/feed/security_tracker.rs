use super::Parsed;
use crate::model::{ReleaseView, VulnStatus, VulnerabilityRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const SECURITY_TRACKER_URL: &str = "https://security-tracker.debian.org/tracker/data/json";

#[derive(Debug, Deserialize)]
struct TrackerEntry {
    #[serde(default)]
    debianbug: Option<Value>,
    #[serde(default)]
    releases: BTreeMap<String, TrackerView>,
}

#[derive(Debug, Deserialize)]
struct TrackerView {
    status: Option<VulnStatus>,
    urgency: Option<String>,
    #[serde(default)]
    fixed_version: Option<String>,
}

impl TrackerView {
    /// A view is usable only when it carries both a status and an urgency.
    fn into_view(self) -> Option<ReleaseView> {
        let view = ReleaseView::new(self.status?, self.urgency?);
        Some(match self.fixed_version {
            Some(fixed) => view.fixed_in(fixed),
            None => view,
        })
    }
}

fn bug_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Parses the Debian Security Tracker JSON dump.
///
/// The document maps source package to CVE to per-release views. Keys that
/// are not CVE identifiers (`TEMP-*` and similar) are ignored. Entries that
/// do not have the expected shape are counted as skipped, as is every
/// release view missing its status or urgency.
pub fn parse_security_tracker(body: &str) -> Result<Parsed<VulnerabilityRecord>> {
    let document: BTreeMap<String, BTreeMap<String, Value>> =
        serde_json::from_str(body).context("Failed to parse security tracker data")?;

    let mut parsed = Parsed::default();
    for (source, issues) in document {
        for (cve, entry) in issues {
            if !cve.starts_with("CVE") {
                continue;
            }

            let entry: TrackerEntry = match serde_json::from_value(entry) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(source = %source, cve = %cve, "Skipping tracker entry: {}", e);
                    parsed.skipped += 1;
                    continue;
                }
            };

            let mut releases = BTreeMap::new();
            for (release, view) in entry.releases {
                match view.into_view() {
                    Some(view) => {
                        releases.insert(release, view);
                    }
                    None => {
                        debug!(source = %source, cve = %cve, release = %release, "Skipping incomplete release view");
                        parsed.skipped += 1;
                    }
                }
            }

            parsed.records.push(VulnerabilityRecord {
                source: source.clone(),
                cve,
                bug: entry.debianbug.as_ref().and_then(bug_id),
                releases,
            });
        }
    }

    Ok(parsed)
}
