use super::Parsed;
use crate::model::{is_placeholder, parse_timestamp, DefectKind, DefectRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct DefectRow {
    source: Option<String>,
    debianbug: Option<String>,
    found_in: Option<String>,
    fixed_in: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
    severity: Option<String>,
    arrival: Option<String>,
    last_modified: Option<String>,
}

/// Normalises a `found_in`/`fixed_in` value.
///
/// `pkg/1.2-3` becomes `1.2-3`; placeholders become `None`.
pub fn normalize_bound(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if is_placeholder(raw) {
        return None;
    }
    let version = raw.rsplit('/').next().unwrap_or(raw).trim();
    if is_placeholder(version) {
        None
    } else {
        Some(version.to_string())
    }
}

/// Bug numbers sometimes arrive as floats (`881234.0`).
fn normalize_bug(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if is_placeholder(raw) {
        return None;
    }
    let id = raw.strip_suffix(".0").unwrap_or(raw);
    Some(id.to_string())
}

impl DefectRow {
    fn into_record(self) -> Option<DefectRecord> {
        let source = self
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !is_placeholder(s))?;
        let id = self.debianbug.as_deref().and_then(normalize_bug)?;

        let kind = match self.kind.as_deref().map(str::trim) {
            Some(kind) if kind.eq_ignore_ascii_case("archived") => DefectKind::Archived,
            _ => DefectKind::Normal,
        };
        let mut record = DefectRecord::new(source, id).with_kind(kind);
        record.found_in = self.found_in.as_deref().and_then(normalize_bound);
        record.fixed_in = self.fixed_in.as_deref().and_then(normalize_bound);
        if let Some(status) = self.status.filter(|s| !is_placeholder(s.trim())) {
            record = record.with_status(status.trim());
        }
        if let Some(severity) = self.severity.filter(|s| !is_placeholder(s.trim())) {
            record = record.with_severity(severity.trim());
        }
        record.arrival = self.arrival.as_deref().and_then(parse_timestamp);
        record.last_modified = self.last_modified.as_deref().and_then(parse_timestamp);
        Some(record)
    }
}

/// Parses the semicolon-separated bug tracker export.
pub fn parse_defects(body: &str) -> Result<Parsed<DefectRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers().context("Defect feed has no header")?;
    for required in ["source", "debianbug"] {
        if !headers.iter().any(|h| h == required) {
            anyhow::bail!("Defect feed is missing the {} column", required);
        }
    }

    let mut parsed = Parsed::default();
    for (line, row) in reader.deserialize::<DefectRow>().enumerate() {
        match row.ok().and_then(DefectRow::into_record) {
            Some(record) => parsed.records.push(record),
            None => {
                debug!(line = line + 2, "Skipping malformed defect row");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}
