//! Secure extraction of untrusted archives.
//!
//! `safext-core` unpacks tar, zip, 7z and rar containers and single-stream
//! compressed files (gzip, bzip2, xz, zstd, lz4, snappy, brotli, zlib) onto
//! a real directory or an in-memory tree. Every path derived from an archive
//! passes the same guard: traversal above the destination root, absolute
//! names without a root, writes through existing symlinks and symlinks
//! pointing outside the root are refused. Entry count, written bytes and
//! consumed input are bounded.
//!
//! # Examples
//!
//! ```no_run
//! use safext_core::ExtractionConfig;
//! use safext_core::extract_file;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractionConfig::default()
//!     .with_create_destination(true)
//!     .with_max_files(Some(10_000));
//! let report = extract_file("archive.tar.gz", "/output/dir", &config)?;
//! println!("Extracted {} files ({})", report.files, report.extracted_type);
//! # Ok(())
//! # }
//! ```
//!
//! Extraction into memory, with a deadline:
//!
//! ```no_run
//! use safext_core::target::MemoryTarget;
//! use safext_core::{ArchiveSource, ExtractionConfig, ExtractionContext, extract_to};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = ExtractionContext::with_timeout(Duration::from_secs(30));
//! let fs = MemoryTarget::new();
//! let input = std::io::stdin().lock();
//! extract_to(&ctx, &fs, ArchiveSource::new(input), "/", &ExtractionConfig::default())?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod context;
pub mod copy;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod io;
pub mod logger;
pub mod report;
pub mod security;
pub mod target;
pub mod types;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use api::ArchiveSource;
pub use api::ReadSeek;
pub use api::extract;
pub use api::extract_file;
pub use api::extract_to;
pub use api::extract_to_with_registry;
pub use config::ExtractionConfig;
pub use context::CancelHandle;
pub use context::ExtractionContext;
pub use error::ExtractionError;
pub use error::LimitKind;
pub use error::Result;
pub use logger::Logger;
pub use report::ExtractionReport;
pub use report::TelemetryHook;

pub use types::DestDir;
pub use types::EntryKind;
pub use types::SafePath;
