//! Error conversion utilities for CLI.
//!
//! Converts safext-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use safext_core::ExtractionError;
use safext_core::LimitKind;
use std::path::Path;

const fn limit_flag(kind: LimitKind) -> &'static str {
    match kind {
        LimitKind::Files => "--max-files",
        LimitKind::ExtractionSize => "--max-extraction-size",
        LimitKind::InputSize => "--max-input-size",
    }
}

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    let archive = archive.display();
    match err {
        ExtractionError::PathTraversal { .. }
        | ExtractionError::AbsolutePath { .. }
        | ExtractionError::SymlinkInPath { .. }
        | ExtractionError::SymlinkAbsoluteTarget { .. } => {
            anyhow!(
                "Security violation in '{archive}': {err}\n\
                 HINT: This archive may be malicious. Do not extract from untrusted sources."
            )
        }
        ExtractionError::LimitExceeded { kind, limit } => {
            anyhow!(
                "Extraction limit exceeded for '{archive}': {kind} ({limit})\n\
                 HINT: Use {} to raise the limit, or -1 to disable it.",
                limit_flag(kind)
            )
        }
        ExtractionError::SymlinkDenied { path } => {
            anyhow!(
                "Symlink rejected in '{archive}': {}\n\
                 HINT: Drop --deny-symlinks, or add --continue-on-unsupported-files to skip it.",
                path.display()
            )
        }
        ExtractionError::UnsupportedEntry { name, kind } => {
            anyhow!(
                "Cannot extract {kind} '{name}' from '{archive}'\n\
                 HINT: Use --continue-on-unsupported-files to skip such entries."
            )
        }
        ExtractionError::UnsupportedFormat => {
            anyhow!(
                "Archive format not recognized: {archive}\n\
                 HINT: Supported: tar, zip, 7z, rar, gz, bz2, xz, zst, lz4, sz, br, zz. \
                 Use --type for formats without a signature (brotli)."
            )
        }
        ExtractionError::DestinationMissing { path } => {
            anyhow!(
                "Destination does not exist: {}\n\
                 HINT: Use --create-destination to create it.",
                path.display()
            )
        }
        ExtractionError::AlreadyExists { path } => {
            anyhow!(
                "Refusing to replace '{}'\n\
                 HINT: Use --overwrite to replace existing files.",
                path.display()
            )
        }
        ExtractionError::Cancelled { reason } => {
            anyhow!("Extraction of '{archive}' stopped: {reason}")
        }
        ExtractionError::Io(io_err) => {
            anyhow!("I/O error while processing '{archive}': {io_err}")
        }
        ExtractionError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{archive}': {reason}\n\
                 HINT: The archive may be corrupted or malformed."
            )
        }
        _ => anyhow::Error::from(err).context(format!("Error processing archive '{archive}'")),
    }
}
