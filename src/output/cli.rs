use crate::model::{AnalysisReport, Classification, ExposureDetail, ExposureResult, Summary};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Release")]
    release: String,
    #[tabled(rename = "Missing Updates")]
    missing_updates: usize,
}

#[derive(Tabled)]
struct VulnRow {
    #[tabled(rename = "Urgency")]
    urgency: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "CVE")]
    cve: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Fixed In")]
    fixed_in: String,
}

#[derive(Tabled)]
struct DefectRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Bug")]
    bug: String,
    #[tabled(rename = "Found In")]
    found_in: String,
    #[tabled(rename = "Fixed In")]
    fixed_in: String,
}

#[derive(Tabled)]
struct LagRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Major")]
    major: usize,
    #[tabled(rename = "Minor")]
    minor: usize,
    #[tabled(rename = "Patch")]
    patch: usize,
}

#[derive(Tabled)]
struct ReviewRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Bug")]
    bug: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

pub fn print_cli_table(report: &AnalysisReport) -> Result<()> {
    println!();
    println!(
        "{} analysis completed at: {}",
        report.ecosystem,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(release) = &report.release {
        println!("Release: {}", release);
    }
    println!();

    print_packages(report);
    print_lag(report);
    print_vulnerabilities(&report.vulnerabilities);
    print_defects(&report.defects);
    print_review(report);

    println!();
    print_summary(report, &report.summary());

    Ok(())
}

fn print_packages(report: &AnalysisReport) {
    if report.tracked.is_empty() {
        return;
    }

    let outdated: Vec<PackageRow> = report
        .tracked
        .iter()
        .filter(|t| t.is_outdated())
        .map(|t| PackageRow {
            package: truncate(&t.package, 40),
            version: t.version.clone(),
            source: truncate(&t.source, 30),
            release: t.release.clone(),
            missing_updates: t.missing_updates,
        })
        .collect();

    if outdated.is_empty() {
        println!("All {} tracked packages are up to date.", report.tracked.len());
        return;
    }

    println!("Found {} outdated packages:", outdated.len());
    println!();
    println!("{}", Table::new(outdated).with(Style::rounded()));
}

fn print_lag(report: &AnalysisReport) {
    if report.lag.is_empty() {
        return;
    }

    let rows: Vec<LagRow> = report
        .lag
        .iter()
        .filter(|l| !l.lag.is_up_to_date())
        .map(|l| LagRow {
            package: truncate(&l.package, 40),
            installed: l.version.clone(),
            latest: l.lag.latest.clone(),
            major: l.lag.major,
            minor: l.lag.minor,
            patch: l.lag.patch,
        })
        .collect();

    if rows.is_empty() {
        println!("All {} packages are on their latest release.", report.lag.len());
        return;
    }

    println!("Found {} lagging packages:", rows.len());
    println!();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_vulnerabilities(vulnerabilities: &[ExposureResult]) {
    if vulnerabilities.is_empty() {
        return;
    }

    println!();
    println!("Found {} vulnerabilities:", vulnerabilities.len());
    println!();

    let mut sorted: Vec<&ExposureResult> = vulnerabilities.iter().collect();
    sorted.sort_by_key(|v| urgency_rank(v.severity()));

    let rows: Vec<VulnRow> = sorted
        .into_iter()
        .map(|v| {
            let status = match &v.detail {
                ExposureDetail::Vulnerability { status, .. } => status.as_str(),
                ExposureDetail::Defect { .. } => "-",
            };
            VulnRow {
                urgency: format_urgency(v.severity()),
                source: truncate(&v.package, 30),
                version: v.version.clone(),
                cve: v.identifier.clone(),
                status: status.to_string(),
                fixed_in: v.fixed_version().unwrap_or("-").to_string(),
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_defects(defects: &[ExposureResult]) {
    if defects.is_empty() {
        return;
    }

    println!();
    println!("Found {} open defects:", defects.len());
    println!();

    println!("{}", Table::new(defect_rows(defects)).with(Style::rounded()));
}

fn defect_rows(defects: &[ExposureResult]) -> Vec<DefectRow> {
    defects
        .iter()
        .map(|d| {
            let (kind, found_in) = match &d.detail {
                ExposureDetail::Defect { kind, found_in, .. } => (kind.as_str(), found_in.clone()),
                ExposureDetail::Vulnerability { .. } => ("-", "-".to_string()),
            };
            DefectRow {
                severity: d.severity().to_string(),
                kind: kind.to_string(),
                source: truncate(&d.package, 30),
                version: d.version.clone(),
                bug: d.identifier.clone(),
                found_in,
                fixed_in: d.fixed_version().unwrap_or("-").to_string(),
            }
        })
        .collect()
}

fn print_review(report: &AnalysisReport) {
    if report.review.is_empty() {
        return;
    }

    println!();
    println!(
        "{} defects need review (timestamp and version range disagree):",
        report.review.len()
    );
    println!();

    let rows: Vec<ReviewRow> = report
        .review
        .iter()
        .map(|r| ReviewRow {
            source: r.package.clone(),
            version: r.version.clone(),
            bug: r.identifier.clone(),
            reason: r.reason.as_str().to_string(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Security tracker urgencies, most pressing first.
fn urgency_rank(urgency: &str) -> u8 {
    match urgency.trim_end_matches('*') {
        "high" => 0,
        "medium" => 1,
        "low" => 2,
        "unimportant" => 3,
        "not yet assigned" => 4,
        _ => 5,
    }
}

fn format_urgency(urgency: &str) -> String {
    match urgency_rank(urgency) {
        0 => "\x1b[91mHIGH\x1b[0m".to_string(),
        1 => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        2 => "\x1b[32mLOW\x1b[0m".to_string(),
        _ => urgency.to_uppercase(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn join_counts<'a>(counts: impl Iterator<Item = (&'a String, &'a usize)>) -> String {
    counts
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_summary(report: &AnalysisReport, summary: &Summary) {
    println!("Summary:");
    println!(
        "  Packages: {} up to date, {} out of date",
        summary.up_to_date, summary.out_of_date
    );
    if !report.untracked.is_empty() {
        println!("  Untracked packages: {}", report.untracked.len());
    }

    if !summary.vulnerabilities_by_urgency.is_empty() {
        println!(
            "  Vulnerabilities: {}",
            join_counts(summary.vulnerabilities_by_urgency.iter())
        );
    }
    if !summary.defects_by_severity.is_empty() {
        println!("  Defects: {}", join_counts(summary.defects_by_severity.iter()));
    }

    let open = summary
        .by_classification
        .get(&Classification::AffectedOpen)
        .copied()
        .unwrap_or(0);
    let unresolved = summary
        .by_classification
        .get(&Classification::AffectedUnresolved)
        .copied()
        .unwrap_or(0);
    if summary.exposures() > 0 {
        println!(
            "  Exposures: {} with a fix available, {} without a fix",
            open, unresolved
        );
    }

    if summary.skipped > 0 {
        let reasons: Vec<String> = report
            .skipped
            .iter()
            .map(|(reason, count)| format!("{} {}", count, reason.as_str()))
            .collect();
        println!(
            "  Skipped records: {} ({})",
            summary.skipped,
            reasons.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DefectKind;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("bash", 10), "bash");
        assert_eq!(truncate("libreoffice-common", 10), "libreof...");
        assert_eq!(truncate("ünïcödé-package", 8), "ünïcö...");
    }

    #[test]
    fn test_urgency_rank() {
        assert!(urgency_rank("high") < urgency_rank("medium"));
        assert_eq!(urgency_rank("low*"), urgency_rank("low"));
        assert_eq!(urgency_rank("unknown"), 5);
    }

    #[test]
    fn test_print_empty_report() {
        let report = AnalysisReport::new(crate::model::Ecosystem::Debian);
        assert!(print_cli_table(&report).is_ok());
    }

    #[test]
    fn test_defect_rows_show_kind() {
        let archived = ExposureResult {
            package: "curl".to_string(),
            version: "7.52.1-5".to_string(),
            identifier: "870669".to_string(),
            classification: Classification::AffectedUnresolved,
            detail: ExposureDetail::Defect {
                kind: DefectKind::Archived,
                status: "pending".to_string(),
                severity: "important".to_string(),
                found_in: "7.52.1-1".to_string(),
                fixed_in: None,
                last_modified: None,
            },
        };

        let rows = defect_rows(&[archived]);
        assert_eq!(rows[0].kind, "archived");
        assert_eq!(rows[0].found_in, "7.52.1-1");
        assert_eq!(rows[0].fixed_in, "-");
    }
}
