//! Extraction drivers: the container walk and the decompression pipeline.

pub mod engine;
pub mod naming;
pub mod stream;

use std::path::Path;

pub use engine::ArchiveDriver;
pub use engine::ensure_directory;
pub use engine::extract_entries;

use crate::ExtractionConfig;
use crate::ExtractionContext;
use crate::formats::FormatRegistry;
use crate::target::Target;

/// Everything one top-level call shares with the pipeline stages.
#[derive(Clone, Copy)]
pub struct Job<'a> {
    /// Cancellation.
    pub ctx: &'a ExtractionContext,
    /// Where objects are created.
    pub target: &'a dyn Target,
    /// Known formats.
    pub registry: &'a FormatRegistry,
    /// Policy.
    pub config: &'a ExtractionConfig,
    /// Input name, used to name single decompressed files.
    pub source_name: Option<&'a str>,
    /// Destination root, or the output file for single streams.
    pub dst: &'a Path,
}
