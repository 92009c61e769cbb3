//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::convert_extraction_error;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use safext_core::ArchiveSource;
use safext_core::ExtractionConfig;
use safext_core::ExtractionContext;
use safext_core::ExtractionReport;
use std::env;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

/// Maps the command line onto an extraction config; unset options keep the
/// library defaults.
pub fn build_config(args: &ExtractArgs) -> ExtractionConfig {
    let mut config = ExtractionConfig::default()
        .with_overwrite(args.overwrite)
        .with_continue_on_error(args.continue_on_error)
        .with_continue_on_unsupported_files(args.continue_on_unsupported_files)
        .with_deny_symlinks(args.deny_symlinks)
        .with_traverse_symlinks(args.insecure_traverse_symlinks)
        .with_create_destination(args.create_destination)
        .with_no_untar_after_decompression(args.no_untar)
        .with_patterns(args.patterns.iter().cloned())
        .with_preserve_file_attributes(args.preserve_attributes)
        .with_preserve_owner(args.preserve_owner)
        .with_cache_in_memory(args.cache_in_memory);

    if let Some(limit) = args.max_files {
        config = config.with_max_files(limit.0);
    }
    if let Some(limit) = args.max_extraction_size {
        config = config.with_max_extraction_size(limit.0);
    }
    if let Some(limit) = args.max_input_size {
        config = config.with_max_input_size(limit.0);
    }
    if let Some(mode) = args.dir_mode {
        config = config.with_dir_mode(mode);
    }
    if let Some(mode) = args.file_mode {
        config = config.with_file_mode(mode);
    }
    if let Some(name) = &args.extract_type {
        config = config.with_extract_type(name.clone());
    }
    config
}

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    // The hook sees the report on failure too, which the error path needs.
    let captured: Arc<Mutex<Option<ExtractionReport>>> = Arc::default();
    let sink = Arc::clone(&captured);
    let config = build_config(args).with_telemetry_hook(Arc::new(
        move |_ctx: &ExtractionContext, report: &ExtractionReport| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(report.clone());
            }
        },
    ));

    let ctx = args
        .timeout
        .map_or_else(ExtractionContext::new, |secs| {
            ExtractionContext::with_timeout(Duration::from_secs(secs))
        });

    let result = if args.archive == Path::new("-") {
        safext_core::extract(&ctx, ArchiveSource::new(io::stdin().lock()), &output_dir, &config)
    } else {
        ArchiveSource::from_path(&args.archive)
            .and_then(|source| safext_core::extract(&ctx, source, &output_dir, &config))
    };

    match result {
        Ok(report) => formatter.format_extraction_result(&report),
        Err(err) => {
            let error = convert_extraction_error(err, &args.archive);
            let report = captured
                .lock()
                .ok()
                .and_then(|mut slot| slot.take())
                .unwrap_or_default();
            formatter.format_extraction_failure(&report, &error)?;
            Err(error)
        }
    }
}
