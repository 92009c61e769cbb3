//! Attack scenario tests, run end to end against a real temporary directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod hardlink_attack;
mod path_traversal;
mod symlink_escape;
mod zip_bomb;

use std::sync::Arc;

use safext_core::ArchiveSource;
use safext_core::ExtractionConfig;
use safext_core::ExtractionContext;
use safext_core::ExtractionReport;
use safext_core::Result;
use safext_core::logger::NoopLogger;
use tempfile::TempDir;

/// Secure defaults without log noise.
pub fn config() -> ExtractionConfig {
    ExtractionConfig::default().with_logger(Arc::new(NoopLogger))
}

/// Extracts `data` into `<temp>/out`, which is created first.
pub fn extract_bytes(data: &[u8], config: &ExtractionConfig) -> (TempDir, Result<ExtractionReport>) {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    std::fs::create_dir(&out).unwrap();
    let result = safext_core::extract(
        &ExtractionContext::new(),
        ArchiveSource::new(data),
        &out,
        config,
    );
    (temp, result)
}
