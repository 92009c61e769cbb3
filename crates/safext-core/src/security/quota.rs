//! Entry count and extraction size accounting.

use crate::ExtractionConfig;
use crate::ExtractionError;
use crate::LimitKind;
use crate::Result;

/// Tracks resource usage during one extraction.
///
/// Every entry that passes the name filter counts towards `max_files`,
/// whether it turns out to be a file, a directory or a symlink. Bytes are
/// counted as files are written; the remaining budget bounds the next file.
#[derive(Debug, Default, Clone)]
pub struct QuotaTracker {
    max_files: Option<u64>,
    max_extraction_size: Option<u64>,
    entries: u64,
    bytes_written: u64,
}

impl QuotaTracker {
    /// Creates a tracker with the limits of `config`.
    #[must_use]
    pub const fn new(config: &ExtractionConfig) -> Self {
        Self::with_limits(config.max_files, config.max_extraction_size)
    }

    /// Creates a tracker with explicit limits.
    #[must_use]
    pub const fn with_limits(max_files: Option<u64>, max_extraction_size: Option<u64>) -> Self {
        Self {
            max_files,
            max_extraction_size,
            entries: 0,
            bytes_written: 0,
        }
    }

    /// Counts one more entry.
    ///
    /// # Errors
    ///
    /// `LimitExceeded(Files)` once the count is strictly greater than the
    /// limit; the limit itself is allowed.
    pub fn begin_entry(&mut self) -> Result<()> {
        self.entries += 1;
        match self.max_files {
            Some(limit) if self.entries > limit => Err(ExtractionError::LimitExceeded {
                kind: LimitKind::Files,
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Bytes still allowed, `None` when unlimited.
    #[must_use]
    pub fn remaining_size(&self) -> Option<u64> {
        self.max_extraction_size
            .map(|limit| limit.saturating_sub(self.bytes_written))
    }

    /// The configured extraction-size limit.
    #[must_use]
    pub const fn size_limit(&self) -> Option<u64> {
        self.max_extraction_size
    }

    /// Adds `bytes` to the written total.
    pub fn record_written(&mut self, bytes: u64) {
        self.bytes_written = self.bytes_written.saturating_add(bytes);
    }

    /// Entries counted so far.
    #[must_use]
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Total bytes written so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
