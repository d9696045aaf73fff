use crate::model::{AnalysisReport, Summary};
use anyhow::Result;
use serde::Serialize;

/// The report with its summary alongside.
#[derive(Serialize)]
pub(super) struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a AnalysisReport,
    summary: Summary,
}

impl<'a> JsonReport<'a> {
    pub(super) fn new(report: &'a AnalysisReport) -> Self {
        Self {
            report,
            summary: report.summary(),
        }
    }
}

pub fn print_json(report: &AnalysisReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport::new(report))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ecosystem;

    #[test]
    fn test_json_report_carries_summary() {
        let report = AnalysisReport::new(Ecosystem::Npm);
        let value = serde_json::to_value(JsonReport::new(&report)).unwrap();

        assert_eq!(value["ecosystem"], "npm");
        assert_eq!(value["summary"]["up_to_date"], 0);
        assert!(value["lag"].as_array().unwrap().is_empty());
        assert!(value.get("release").is_none());
    }
}
