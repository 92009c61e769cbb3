//! Decompression pipeline for single-stream codecs.
//!
//! The decoded stream is peeked once more: tar content is handed to the tar
//! walker under the label `tar.<codec>`, anything else becomes one file.

use std::io;
use std::io::Read;

use crate::ExtractionError;
use crate::ExtractionReport;
use crate::LimitKind;
use crate::Result;
use crate::error::DecodeFailure;
use crate::error::LimitBreach;
use crate::extraction::Job;
use crate::extraction::engine::extract_entries;
use crate::extraction::naming::output_location;
use crate::formats::CompressionCodec;
use crate::formats::TarWalker;
use crate::io::ByteMeter;
use crate::io::PeekReader;
use crate::target::Sandbox;
use crate::types::DestDir;

/// Tags decoder failures so they are reported as `Decode` and not confused
/// with target write errors further down the copy loop.
///
/// An input ceiling hit is reported as such even when the codec replaced
/// the original error with its own.
struct DecodeReader<R> {
    inner: R,
    codec: &'static str,
    meter: ByteMeter,
    input_limit: Option<u64>,
}

fn carries_marker(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<LimitBreach>() || inner.is::<DecodeFailure>())
}

impl<R: Read> DecodeReader<R> {
    fn classify(&self, err: io::Error) -> io::Error {
        if carries_marker(&err) || err.kind() == io::ErrorKind::Interrupted {
            return err;
        }
        if self.meter.tripped() {
            return LimitBreach {
                kind: LimitKind::InputSize,
                limit: self.input_limit.unwrap_or(u64::MAX),
            }
            .into_io();
        }
        io::Error::other(DecodeFailure {
            codec: self.codec,
            source: err,
        })
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|err| self.classify(err))
    }
}

fn construction_error(codec: &'static str, err: io::Error) -> ExtractionError {
    match ExtractionError::from(err) {
        ExtractionError::Io(source) => ExtractionError::Decode { codec, source },
        other => other,
    }
}

/// Decodes `input` with `codec` and materializes the result under
/// `job.dst`.
///
/// `meter` observes the raw input so a ceiling hit inside the codec is still
/// reported as `LimitExceeded(InputSize)`.
///
/// # Errors
///
/// `Decode` for corrupt streams, limit errors, and everything the tar walk
/// or the target reports.
pub fn decompress(
    job: &Job<'_>,
    codec: CompressionCodec,
    force_tar: bool,
    input: Box<dyn Read + '_>,
    meter: &ByteMeter,
    report: &mut ExtractionReport,
) -> Result<()> {
    let label = codec.label();
    let logger = job.config.logger.as_ref();

    job.ctx.check()?;
    let decoder = codec
        .decoder(input)
        .map_err(|err| construction_error(label, err))?;
    let decoded = DecodeReader {
        inner: decoder,
        codec: label,
        meter: meter.clone(),
        input_limit: job.config.max_input_size,
    };

    job.ctx.check()?;
    let mut peeked = PeekReader::new(decoded, job.registry.max_header())?;
    let untar = force_tar
        || (!job.config.no_untar_after_decompression && job.registry.is_tar(peeked.header()));

    if untar {
        let label = format!("tar.{label}");
        logger.info("unpacking tar stream after decompression", &[("type", &label)]);
        let mut archive = tar::Archive::new(peeked);
        let mut walker = TarWalker::new(&mut archive, label)?;
        return extract_entries(job.ctx, job.target, job.dst, job.config, &mut walker, report);
    }

    write_single(job, codec, &mut peeked, report)
}

fn write_single(
    job: &Job<'_>,
    codec: CompressionCodec,
    content: &mut dyn Read,
    report: &mut ExtractionReport,
) -> Result<()> {
    let config = job.config;
    let logger = config.logger.as_ref();
    report.extracted_type = codec.label().to_string();

    let (dir, name) = output_location(
        job.target,
        job.dst,
        job.source_name,
        codec,
        config.create_destination,
        config.dir_mode,
    )?;
    let root = DestDir::new(dir);
    let sandbox = Sandbox::new(
        job.target,
        &root,
        config.traverse_symlinks,
        config.dir_mode,
        logger,
    );
    let path = sandbox.guard().resolve(&name)?;

    job.ctx.check()?;
    let written = sandbox.create_file(
        &path,
        content,
        config.file_mode,
        config.overwrite,
        config.max_extraction_size,
    )?;
    report.files += 1;
    report.extraction_size += written;
    logger.info(
        "decompressed single file",
        &[
            ("path", &sandbox.native(&path).display()),
            ("bytes", &written),
        ],
    );
    Ok(())
}
