use super::Parsed;
use crate::model::{is_placeholder, parse_timestamp, CatalogEntry};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    package: Option<String>,
    version: Option<String>,
    source: Option<String>,
    source_version: Option<String>,
    first_seen: Option<String>,
    package_date: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !is_placeholder(v))
}

impl CatalogRow {
    fn into_entry(self) -> Option<CatalogEntry> {
        let package = present(self.package)?;
        let version = present(self.version)?;
        let release = present(self.first_seen)?;
        // Binary packages built from a same-named source often leave these out.
        let source = present(self.source).unwrap_or_else(|| package.clone());
        let source_version = present(self.source_version).unwrap_or_else(|| version.clone());

        let mut entry = CatalogEntry::new(package, version, source, source_version, release);
        if let Some(date) = self.package_date.as_deref().and_then(parse_timestamp) {
            entry = entry.with_date(date);
        }
        Some(entry)
    }
}

/// Parses the release catalog CSV.
///
/// Expects the header `package,version,source,source_version,first_seen,package_date`.
/// Rows without a package, version or release are counted as skipped.
pub fn parse_catalog(body: &str) -> Result<Parsed<CatalogEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers().context("Catalog feed has no header")?;
    for required in ["package", "version", "first_seen"] {
        if !headers.iter().any(|h| h == required) {
            anyhow::bail!("Catalog feed is missing the {} column", required);
        }
    }

    let mut parsed = Parsed::default();
    for (line, row) in reader.deserialize::<CatalogRow>().enumerate() {
        match row.ok().and_then(CatalogRow::into_entry) {
            Some(entry) => parsed.records.push(entry),
            None => {
                debug!(line = line + 2, "Skipping malformed catalog row");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}
