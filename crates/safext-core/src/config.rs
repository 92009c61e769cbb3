//! Extraction policy.

use std::fmt;
use std::sync::Arc;

use crate::logger::LogLogger;
use crate::logger::Logger;
use crate::report::TelemetryHook;

/// One gibibyte, the default for both size ceilings.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Fully resolved policy for one extraction call.
///
/// Built once before extraction begins and only read afterwards. Fields are
/// public so a struct literal with `..Default::default()` works; the
/// `with_*` setters exist for chaining, and repeated calls keep the last
/// value.
///
/// Limits are `Option<u64>`: `None` disables the ceiling.
///
/// # Examples
///
/// ```
/// use safext_core::ExtractionConfig;
///
/// let config = ExtractionConfig::default()
///     .with_max_files(Some(500))
///     .with_overwrite(true)
///     .with_patterns(["*.txt"]);
/// assert_eq!(config.max_files, Some(500));
///
/// let literal = ExtractionConfig {
///     deny_symlinks: true,
///     ..Default::default()
/// };
/// assert!(literal.deny_symlinks);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Replace existing files and symlinks.
    pub overwrite: bool,

    /// Record per-entry errors and keep walking.
    pub continue_on_error: bool,

    /// Skip entries whose kind cannot be materialized.
    pub continue_on_unsupported_files: bool,

    /// Refuse every symlink entry.
    pub deny_symlinks: bool,

    /// Follow existing symlinks found among path ancestors. Insecure.
    pub traverse_symlinks: bool,

    /// Create the destination root when it does not exist.
    pub create_destination: bool,

    /// Ceiling on archive entries processed.
    pub max_files: Option<u64>,

    /// Ceiling on bytes written across all files.
    pub max_extraction_size: Option<u64>,

    /// Ceiling on bytes read from the input.
    pub max_input_size: Option<u64>,

    /// Mode for directories the extraction creates.
    pub dir_mode: u32,

    /// Mode for files that carry none, including single decompressed files.
    pub file_mode: u32,

    /// Skip sniffing and force this format (`zip`, `gz`, `tar.xz`, ...).
    pub extract_type: Option<String>,

    /// Write decompressed tar content as one file instead of unpacking it.
    pub no_untar_after_decompression: bool,

    /// Shell globs; entries matching none are skipped. Empty matches all.
    pub patterns: Vec<String>,

    /// Apply archived modes and timestamps.
    pub preserve_file_attributes: bool,

    /// Apply archived uid/gid.
    pub preserve_owner: bool,

    /// Buffer non-seekable input in memory instead of a temporary file.
    pub cache_in_memory: bool,

    /// Receives the final report.
    pub telemetry_hook: Option<TelemetryHook>,

    /// Receives log records.
    pub logger: Arc<dyn Logger>,
}

impl Default for ExtractionConfig {
    /// Creates an `ExtractionConfig` with secure default settings.
    ///
    /// Default values:
    /// - all boolean switches: false
    /// - `max_files`: 100,000
    /// - `max_extraction_size`: 1 GiB
    /// - `max_input_size`: 1 GiB
    /// - `dir_mode`: `0o750`
    /// - `file_mode`: `0o640`
    /// - `extract_type`: none (sniff)
    /// - `patterns`: empty (match all)
    /// - `telemetry_hook`: none
    /// - `logger`: [`LogLogger`]
    fn default() -> Self {
        Self {
            overwrite: false,
            continue_on_error: false,
            continue_on_unsupported_files: false,
            deny_symlinks: false,
            traverse_symlinks: false,
            create_destination: false,
            max_files: Some(100_000),
            max_extraction_size: Some(GIB),
            max_input_size: Some(GIB),
            dir_mode: 0o750,
            file_mode: 0o640,
            extract_type: None,
            no_untar_after_decompression: false,
            patterns: Vec::new(),
            preserve_file_attributes: false,
            preserve_owner: false,
            cache_in_memory: false,
            telemetry_hook: None,
            logger: Arc::new(LogLogger),
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("overwrite", &self.overwrite)
            .field("continue_on_error", &self.continue_on_error)
            .field(
                "continue_on_unsupported_files",
                &self.continue_on_unsupported_files,
            )
            .field("deny_symlinks", &self.deny_symlinks)
            .field("traverse_symlinks", &self.traverse_symlinks)
            .field("create_destination", &self.create_destination)
            .field("max_files", &self.max_files)
            .field("max_extraction_size", &self.max_extraction_size)
            .field("max_input_size", &self.max_input_size)
            .field("dir_mode", &format_args!("{:#o}", self.dir_mode))
            .field("file_mode", &format_args!("{:#o}", self.file_mode))
            .field("extract_type", &self.extract_type)
            .field(
                "no_untar_after_decompression",
                &self.no_untar_after_decompression,
            )
            .field("patterns", &self.patterns)
            .field("preserve_file_attributes", &self.preserve_file_attributes)
            .field("preserve_owner", &self.preserve_owner)
            .field("cache_in_memory", &self.cache_in_memory)
            .field("telemetry_hook", &self.telemetry_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl ExtractionConfig {
    /// Configuration with every ceiling disabled.
    ///
    /// Only for archives from trusted sources.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_files: None,
            max_extraction_size: None,
            max_input_size: None,
            ..Self::default()
        }
    }

    /// Sets [`overwrite`](Self::overwrite).
    pub fn with_overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }

    /// Sets [`continue_on_error`](Self::continue_on_error).
    pub fn with_continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Sets [`continue_on_unsupported_files`](Self::continue_on_unsupported_files).
    pub fn with_continue_on_unsupported_files(mut self, enabled: bool) -> Self {
        self.continue_on_unsupported_files = enabled;
        self
    }

    /// Sets [`deny_symlinks`](Self::deny_symlinks).
    pub fn with_deny_symlinks(mut self, enabled: bool) -> Self {
        self.deny_symlinks = enabled;
        self
    }

    /// Sets [`traverse_symlinks`](Self::traverse_symlinks).
    pub fn with_traverse_symlinks(mut self, enabled: bool) -> Self {
        self.traverse_symlinks = enabled;
        self
    }

    /// Sets [`create_destination`](Self::create_destination).
    pub fn with_create_destination(mut self, enabled: bool) -> Self {
        self.create_destination = enabled;
        self
    }

    /// Sets [`max_files`](Self::max_files).
    pub fn with_max_files(mut self, limit: Option<u64>) -> Self {
        self.max_files = limit;
        self
    }

    /// Sets [`max_extraction_size`](Self::max_extraction_size).
    pub fn with_max_extraction_size(mut self, limit: Option<u64>) -> Self {
        self.max_extraction_size = limit;
        self
    }

    /// Sets [`max_input_size`](Self::max_input_size).
    pub fn with_max_input_size(mut self, limit: Option<u64>) -> Self {
        self.max_input_size = limit;
        self
    }

    /// Sets [`dir_mode`](Self::dir_mode).
    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Sets [`file_mode`](Self::file_mode).
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Sets [`extract_type`](Self::extract_type).
    pub fn with_extract_type(mut self, name: impl Into<String>) -> Self {
        self.extract_type = Some(name.into());
        self
    }

    /// Sets [`no_untar_after_decompression`](Self::no_untar_after_decompression).
    pub fn with_no_untar_after_decompression(mut self, enabled: bool) -> Self {
        self.no_untar_after_decompression = enabled;
        self
    }

    /// Replaces [`patterns`](Self::patterns).
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets [`preserve_file_attributes`](Self::preserve_file_attributes).
    pub fn with_preserve_file_attributes(mut self, enabled: bool) -> Self {
        self.preserve_file_attributes = enabled;
        self
    }

    /// Sets [`preserve_owner`](Self::preserve_owner).
    pub fn with_preserve_owner(mut self, enabled: bool) -> Self {
        self.preserve_owner = enabled;
        self
    }

    /// Sets [`cache_in_memory`](Self::cache_in_memory).
    pub fn with_cache_in_memory(mut self, enabled: bool) -> Self {
        self.cache_in_memory = enabled;
        self
    }

    /// Sets [`telemetry_hook`](Self::telemetry_hook).
    pub fn with_telemetry_hook(mut self, hook: TelemetryHook) -> Self {
        self.telemetry_hook = Some(hook);
        self
    }

    /// Sets [`logger`](Self::logger).
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }
}
