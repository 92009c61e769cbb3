//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use safext_core::ExtractionReport;
use serde::Serialize;
use std::io;
use std::io::Write;

pub struct JsonFormatter;

/// The telemetry report as emitted on stdout.
#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    extracted_type: &'a str,
    files: u64,
    dirs: u64,
    symlinks: u64,
    pattern_mismatches: u64,
    unsupported_files: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_unsupported_file: Option<&'a str>,
    extraction_size: u64,
    input_size: u64,
    extraction_errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_extraction_error: Option<&'a str>,
    duration_ms: u128,
}

impl<'a> From<&'a ExtractionReport> for ReportOutput<'a> {
    fn from(report: &'a ExtractionReport) -> Self {
        Self {
            extracted_type: &report.extracted_type,
            files: report.files,
            dirs: report.dirs,
            symlinks: report.symlinks,
            pattern_mismatches: report.pattern_mismatches,
            unsupported_files: report.unsupported_files,
            last_unsupported_file: report.last_unsupported_file.as_deref(),
            extraction_size: report.extraction_size,
            input_size: report.input_size,
            extraction_errors: report.extraction_errors,
            last_extraction_error: report.last_extraction_error.as_deref(),
            duration_ms: report.duration.as_millis(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        Self::output(&JsonOutput::success("extract", ReportOutput::from(report)))
    }

    fn format_extraction_failure(
        &self,
        report: &ExtractionReport,
        error: &anyhow::Error,
    ) -> Result<()> {
        Self::output(&JsonOutput::failure(
            "extract",
            ReportOutput::from(report),
            error.to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_report_output_fields() {
        let mut report = ExtractionReport::new();
        report.extracted_type = "tar.gz".into();
        report.files = 3;
        report.last_extraction_error = Some("path traversal detected: ../x".into());

        let json = serde_json::to_value(JsonOutput::success("extract", ReportOutput::from(&report)))
            .unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["extracted_type"], "tar.gz");
        assert_eq!(json["data"]["files"], 3);
        assert!(json["data"].get("last_unsupported_file").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_carries_error() {
        let report = ExtractionReport::new();
        let json = serde_json::to_value(JsonOutput::failure(
            "extract",
            ReportOutput::from(&report),
            "boom",
        ))
        .unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
    }
}
