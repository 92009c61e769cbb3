//! High-level public API for archive extraction.

use std::fs::File;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use crate::ExtractionConfig;
use crate::ExtractionContext;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::LimitKind;
use crate::Result;
use crate::extraction::Job;
use crate::extraction::extract_entries;
use crate::extraction::stream;
use crate::formats::ContainerFormat;
use crate::formats::FormatKind;
use crate::formats::FormatRegistry;
use crate::formats::RarWalker;
use crate::formats::Selection;
use crate::formats::SevenZWalker;
use crate::formats::TarWalker;
use crate::formats::ZipWalker;
use crate::io::ByteMeter;
use crate::io::LimitedReader;
use crate::io::PeekReader;
use crate::io::Spool;
use crate::target::DiskTarget;
use crate::target::Target;

/// A reader that can also seek.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

enum Input<'a> {
    Stream(Box<dyn Read + 'a>),
    Seekable {
        reader: Box<dyn ReadSeek + 'a>,
        path: Option<PathBuf>,
    },
}

/// Input of one extraction call.
///
/// Any reader works. Formats that need random access are spooled first,
/// unless the source was built with [`seekable`](Self::seekable) or
/// [`from_path`](Self::from_path). The optional name is only used to name
/// single decompressed files.
pub struct ArchiveSource<'a> {
    input: Input<'a>,
    name: Option<String>,
}

impl std::fmt::Debug for ArchiveSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSource")
            .field("name", &self.name)
            .field("seekable", &matches!(self.input, Input::Seekable { .. }))
            .finish_non_exhaustive()
    }
}

impl<'a> ArchiveSource<'a> {
    /// Wraps an unnamed reader.
    pub fn new(reader: impl Read + 'a) -> Self {
        Self {
            input: Input::Stream(Box::new(reader)),
            name: None,
        }
    }

    /// Wraps an unnamed reader that supports seeking. zip and 7z archives
    /// are then read in place instead of being spooled.
    pub fn seekable(reader: impl Read + Seek + 'a) -> Self {
        Self {
            input: Input::Seekable {
                reader: Box::new(reader),
                path: None,
            },
            name: None,
        }
    }

    /// Sets the input name, e.g. the file name the stream came from.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The input name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the source supports seeking.
    #[must_use]
    pub const fn is_seekable(&self) -> bool {
        matches!(self.input, Input::Seekable { .. })
    }
}

impl ArchiveSource<'static> {
    /// Opens a file for seekable reading. Paths that are not valid UTF-8
    /// stay unnamed.
    ///
    /// rar archives are opened through `path` directly.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(ExtractionError::Io)?;
        let source = Self {
            input: Input::Seekable {
                reader: Box::new(file),
                path: Some(path.to_path_buf()),
            },
            name: None,
        };
        Ok(match path.to_str() {
            Some(name) => source.named(name),
            None => source,
        })
    }
}

/// Extracts the archive at `archive_path` onto disk under `output_dir`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or extraction fails.
///
/// # Examples
///
/// ```no_run
/// use safext_core::ExtractionConfig;
/// use safext_core::extract_file;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let report = extract_file("archive.tar.gz", "/tmp/output", &config)?;
/// println!("Extracted {} files", report.files);
/// # Ok(())
/// # }
/// ```
pub fn extract_file<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    config: &ExtractionConfig,
) -> Result<ExtractionReport> {
    let ctx = ExtractionContext::new();
    match ArchiveSource::from_path(archive_path) {
        Ok(source) => extract(&ctx, source, output_dir, config),
        Err(err) => {
            let mut report = ExtractionReport::new();
            report.record_error(&err);
            flush(&ctx, config, &report);
            Err(err)
        }
    }
}

/// Extracts `source` onto disk under `dst`.
///
/// # Errors
///
/// See [`extract_to_with_registry`].
pub fn extract<Q: AsRef<Path>>(
    ctx: &ExtractionContext,
    source: ArchiveSource<'_>,
    dst: Q,
    config: &ExtractionConfig,
) -> Result<ExtractionReport> {
    extract_to(ctx, &DiskTarget::new(), source, dst, config)
}

/// Extracts `source` onto any [`Target`], with the default registry.
///
/// # Errors
///
/// See [`extract_to_with_registry`].
///
/// # Examples
///
/// ```
/// use safext_core::{ArchiveSource, ExtractionConfig, ExtractionContext, extract_to};
/// use safext_core::target::{MemoryTarget, Target};
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut tar = tar::Builder::new(Vec::new());
/// let mut header = tar::Header::new_gnu();
/// header.set_size(5);
/// header.set_mode(0o644);
/// header.set_cksum();
/// tar.append_data(&mut header, "hello.txt", &b"hello"[..])?;
/// let data = tar.into_inner()?;
///
/// let fs = MemoryTarget::new();
/// let config = ExtractionConfig::default().with_create_destination(true);
/// let report = extract_to(
///     &ExtractionContext::new(),
///     &fs,
///     ArchiveSource::new(&data[..]),
///     "/out",
///     &config,
/// )?;
/// assert_eq!(report.extracted_type, "tar");
/// assert_eq!(fs.read_file("/out/hello.txt")?, b"hello");
/// # Ok(())
/// # }
/// ```
pub fn extract_to<Q: AsRef<Path>>(
    ctx: &ExtractionContext,
    target: &dyn Target,
    source: ArchiveSource<'_>,
    dst: Q,
    config: &ExtractionConfig,
) -> Result<ExtractionReport> {
    extract_to_with_registry(ctx, target, &FormatRegistry::default(), source, dst, config)
}

/// Extracts `source` onto `target`, identifying it with `registry`.
///
/// The telemetry hook of `config` receives the report exactly once, on
/// success and on failure alike. On failure the error that ended the call
/// is the last error in the report.
///
/// # Errors
///
/// Returns an error if:
/// - the input is not a known format or the type override is unknown
/// - the destination is missing and may not be created
/// - an entry violates a security rule or a limit and the policy does not
///   allow skipping it
/// - the context is cancelled or its deadline passes
/// - decoding or target I/O fails
pub fn extract_to_with_registry<Q: AsRef<Path>>(
    ctx: &ExtractionContext,
    target: &dyn Target,
    registry: &FormatRegistry,
    source: ArchiveSource<'_>,
    dst: Q,
    config: &ExtractionConfig,
) -> Result<ExtractionReport> {
    let started = Instant::now();
    let mut report = ExtractionReport::new();
    let logger = config.logger.as_ref();

    let ArchiveSource { input, name } = source;
    let job = Job {
        ctx,
        target,
        registry,
        config,
        source_name: name.as_deref(),
        dst: dst.as_ref(),
    };
    let result = match input {
        Input::Stream(reader) => extract_stream(&job, reader, &mut report),
        Input::Seekable { reader, path } => {
            extract_seekable(&job, reader, path.as_deref(), &mut report)
        }
    };

    report.duration = started.elapsed();
    match &result {
        Ok(()) => logger.info(
            "extraction finished",
            &[
                ("type", &report.extracted_type),
                ("files", &report.files),
                ("dirs", &report.dirs),
                ("symlinks", &report.symlinks),
                ("bytes", &report.extraction_size),
            ],
        ),
        Err(err) => {
            report.record_error(err);
            logger.error("extraction failed", &[("error", err)]);
        }
    }
    flush(ctx, config, &report);
    result.map(|()| report)
}

fn flush(ctx: &ExtractionContext, config: &ExtractionConfig, report: &ExtractionReport) {
    if let Some(hook) = &config.telemetry_hook {
        hook(ctx, report);
    }
}

/// Runs a plain stream through the bounded reader and dispatches it.
fn extract_stream<'i>(
    job: &Job<'_>,
    reader: Box<dyn Read + 'i>,
    report: &mut ExtractionReport,
) -> Result<()> {
    let input = LimitedReader::new(reader, job.config.max_input_size, LimitKind::InputSize);
    let meter = input.meter();

    let result = dispatch(job, input, &meter, report).map_err(|err| {
        // Codecs and walkers may swallow the marker error of the bounded
        // reader; the meter still knows.
        if meter.tripped() && err.limit_kind() != Some(LimitKind::InputSize) {
            ExtractionError::LimitExceeded {
                kind: LimitKind::InputSize,
                limit: job.config.max_input_size.unwrap_or(u64::MAX),
            }
        } else {
            err
        }
    });
    report.input_size = meter.bytes();
    result
}

/// Reads random-access containers in place. Everything else is streamed
/// from the start.
fn extract_seekable<'i>(
    job: &Job<'_>,
    mut reader: Box<dyn ReadSeek + 'i>,
    path: Option<&Path>,
    report: &mut ExtractionReport,
) -> Result<()> {
    job.ctx.check()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.rewind()?;
    let mut header = Vec::with_capacity(job.registry.max_header());
    (&mut reader)
        .take(job.registry.max_header() as u64)
        .read_to_end(&mut header)?;
    reader.rewind()?;

    let selection = job
        .registry
        .select(job.config.extract_type.as_deref(), &header)?;
    let FormatKind::Container(
        format @ (ContainerFormat::Zip | ContainerFormat::SevenZ | ContainerFormat::Rar),
    ) = selection.kind
    else {
        return extract_stream(job, Box::new(reader), report);
    };

    log_selection(job, &selection);
    if let Some(limit) = job.config.max_input_size
        && len > limit
    {
        return Err(ExtractionError::LimitExceeded {
            kind: LimitKind::InputSize,
            limit,
        });
    }
    report.input_size = len;

    match format {
        ContainerFormat::Zip => walk(job, &mut ZipWalker::new(reader)?, report),
        ContainerFormat::SevenZ => walk(job, &mut SevenZWalker::new(reader)?, report),
        ContainerFormat::Rar => match path {
            Some(path) => walk(job, &mut RarWalker::open(path)?, report),
            None => walk_rar(job, &mut reader, report),
        },
        ContainerFormat::Tar => extract_stream(job, Box::new(reader), report),
    }
}

fn log_selection(job: &Job<'_>, selection: &Selection) {
    job.config.logger.info(
        "selected format",
        &[
            ("type", &selection.kind.label()),
            ("forced", &job.config.extract_type.is_some()),
        ],
    );
}

fn dispatch<'i>(
    job: &Job<'_>,
    input: LimitedReader<Box<dyn Read + 'i>>,
    meter: &ByteMeter,
    report: &mut ExtractionReport,
) -> Result<()> {
    job.ctx.check()?;
    let mut peeked = PeekReader::new(input, job.registry.max_header())?;
    let selection = job
        .registry
        .select(job.config.extract_type.as_deref(), peeked.header())?;
    log_selection(job, &selection);

    let format = match selection.kind {
        FormatKind::Compressed(codec) => {
            return stream::decompress(
                job,
                codec,
                selection.force_tar,
                Box::new(peeked),
                meter,
                report,
            );
        }
        FormatKind::Container(format) => format,
    };

    match format {
        ContainerFormat::Tar => {
            let mut archive = tar::Archive::new(peeked);
            let mut walker = TarWalker::new(&mut archive, format.label())?;
            walk(job, &mut walker, report)
        }
        ContainerFormat::Zip => {
            let spool = spool(job, &mut peeked)?;
            let mut walker = ZipWalker::new(spool)?;
            walk(job, &mut walker, report)
        }
        ContainerFormat::SevenZ => {
            let spool = spool(job, &mut peeked)?;
            let mut walker = SevenZWalker::new(spool)?;
            walk(job, &mut walker, report)
        }
        ContainerFormat::Rar => walk_rar(job, &mut peeked, report),
    }
}

/// `unrar` only opens paths, so rar input is always spooled to a file.
fn walk_rar<R: Read>(
    job: &Job<'_>,
    input: &mut R,
    report: &mut ExtractionReport,
) -> Result<()> {
    job.ctx.check()?;
    let spool = Spool::capture_file(input)?;
    let path = spool.path().ok_or_else(|| {
        ExtractionError::InvalidArchive("rar: input was not spooled to disk".into())
    })?;
    let mut walker = RarWalker::open(path)?;
    walk(job, &mut walker, report)
}

fn spool<R: Read>(job: &Job<'_>, input: &mut R) -> Result<Spool> {
    job.ctx.check()?;
    let spool = Spool::capture(input, job.config.cache_in_memory)?;
    job.config.logger.debug(
        "spooled input for random access",
        &[
            ("bytes", &spool.len()?),
            ("in_memory", &job.config.cache_in_memory),
        ],
    );
    Ok(spool)
}

fn walk(
    job: &Job<'_>,
    walker: &mut dyn crate::formats::Walker,
    report: &mut ExtractionReport,
) -> Result<()> {
    extract_entries(job.ctx, job.target, job.dst, job.config, walker, report)
}
