//! Extraction telemetry.

use std::sync::Arc;
use std::time::Duration;

use crate::ExtractionContext;
use crate::ExtractionError;

/// Report of one top-level extraction call.
///
/// Counters only grow while the walk runs. The report is handed to the
/// configured [`TelemetryHook`] exactly once, when the call returns, whether
/// it succeeded or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Format label, e.g. `zip`, `tar.gz` or `xz`.
    pub extracted_type: String,

    /// Regular files written.
    pub files: u64,

    /// Directory entries created.
    pub dirs: u64,

    /// Symlinks created.
    pub symlinks: u64,

    /// Entries skipped because no pattern matched.
    pub pattern_mismatches: u64,

    /// Entries skipped because their kind cannot be materialized.
    pub unsupported_files: u64,

    /// Name of the most recent unsupported entry.
    pub last_unsupported_file: Option<String>,

    /// Bytes written to the target.
    pub extraction_size: u64,

    /// Bytes consumed from the input.
    pub input_size: u64,

    /// Errors recorded, including ones that were continued past.
    pub extraction_errors: u64,

    /// Text of the most recent error.
    pub last_extraction_error: Option<String>,

    /// Wall-clock time of the call.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects created on the target.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.files + self.dirs + self.symlinks
    }

    /// Returns whether any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.extraction_errors > 0
    }

    pub(crate) fn record_error(&mut self, err: &ExtractionError) {
        self.extraction_errors += 1;
        self.last_extraction_error = Some(err.to_string());
    }

    pub(crate) fn record_unsupported(&mut self, name: &str) {
        self.unsupported_files += 1;
        self.last_unsupported_file = Some(name.to_string());
    }
}

/// Sink receiving the final report of every top-level call.
pub type TelemetryHook = Arc<dyn Fn(&ExtractionContext, &ExtractionReport) + Send + Sync>;
