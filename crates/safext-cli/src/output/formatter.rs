//! Output formatter trait for CLI results.

use anyhow::Result;
use safext_core::ExtractionReport;
use serde::Serialize;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format a finished extraction
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()>;

    /// Format a failed extraction, with whatever was done before the error
    fn format_extraction_failure(&self, report: &ExtractionReport, error: &anyhow::Error)
    -> Result<()>;
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: Some(data),
            error: Some(error.into()),
        }
    }
}
