//! End-to-end extraction tests against a real temporary directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;

use safext_core::ArchiveSource;
use safext_core::ExtractionConfig;
use safext_core::ExtractionContext;
use safext_core::ExtractionError;
use safext_core::ExtractionReport;
use safext_core::LimitKind;
use safext_core::Result;
use safext_core::formats::CompressionCodec;
use safext_core::logger::NoopLogger;
use safext_core::test_utils::TarTestBuilder;
use safext_core::test_utils::ZipTestBuilder;
use safext_core::test_utils::compress;
use tempfile::TempDir;

fn config() -> ExtractionConfig {
    ExtractionConfig::default().with_logger(Arc::new(NoopLogger))
}

fn output_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn extract_into(
    data: &[u8],
    name: Option<&str>,
    dst: &Path,
    config: &ExtractionConfig,
) -> Result<ExtractionReport> {
    let mut source = ArchiveSource::new(data);
    if let Some(name) = name {
        source = source.named(name);
    }
    safext_core::extract(&ExtractionContext::new(), source, dst, config)
}

/// Every path below `root`, relative and sorted.
fn tree(root: &Path) -> Vec<String> {
    let mut paths: Vec<String> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    paths.sort();
    paths
}

#[cfg(unix)]
fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::symlink_metadata(path).unwrap().permissions().mode() & 0o7777
}

#[test]
fn test_zip_with_file_and_directory() {
    let temp = output_dir();
    let data = ZipTestBuilder::new()
        .add_file_with_mode("test", b"foobar content", 0o640)
        .add_directory("sub/")
        .build();

    let report = extract_into(&data, None, temp.path(), &config()).unwrap();

    assert_eq!(report.extracted_type, "zip");
    assert_eq!(report.files, 1);
    assert_eq!(report.dirs, 1);
    assert_eq!(report.extraction_size, 14);
    assert_eq!(report.input_size, data.len() as u64);
    assert_eq!(
        std::fs::read(temp.path().join("test")).unwrap(),
        b"foobar content"
    );
    assert_eq!(std::fs::read_dir(temp.path().join("sub")).unwrap().count(), 0);
    assert!(temp.path().join("sub").is_dir());
    #[cfg(unix)]
    assert_eq!(mode_of(&temp.path().join("test")), 0o640);
}

#[test]
fn test_tar_tree() {
    let temp = output_dir();
    let data = TarTestBuilder::new()
        .add_directory("project/")
        .add_file("project/README.md", b"# readme")
        .add_file("project/src/main.rs", b"fn main() {}")
        .add_symlink("project/docs", "README.md")
        .build();

    let report = extract_into(&data, Some("project.tar"), temp.path(), &config()).unwrap();

    assert_eq!(report.extracted_type, "tar");
    assert_eq!(report.files, 2);
    assert_eq!(report.dirs, 1);
    assert_eq!(report.symlinks, 1);
    assert_eq!(
        tree(temp.path()),
        [
            "project",
            "project/README.md",
            "project/docs",
            "project/src",
            "project/src/main.rs",
        ]
    );
    assert_eq!(
        std::fs::read(temp.path().join("project/src/main.rs")).unwrap(),
        b"fn main() {}"
    );
    assert_eq!(
        std::fs::read(temp.path().join("project/docs")).unwrap(),
        b"# readme"
    );
}

#[test]
fn test_tar_gz_is_unpacked() {
    let temp = output_dir();
    let tar = TarTestBuilder::new()
        .add_file("a.txt", b"alpha")
        .add_file("b/c.txt", b"gamma")
        .build();
    let data = compress(CompressionCodec::Gzip, &tar);

    let report = extract_into(&data, Some("bundle.tar.gz"), temp.path(), &config()).unwrap();

    assert_eq!(report.extracted_type, "tar.gz");
    assert_eq!(report.files, 2);
    assert_eq!(std::fs::read(temp.path().join("b/c.txt")).unwrap(), b"gamma");
}

#[test]
fn test_tar_gz_without_untar() {
    let temp = output_dir();
    let tar = TarTestBuilder::new().add_file("a.txt", b"alpha").build();
    let data = compress(CompressionCodec::Gzip, &tar);
    let config = config().with_no_untar_after_decompression(true);

    let report = extract_into(&data, Some("bundle.tar.gz"), temp.path(), &config).unwrap();

    assert_eq!(report.extracted_type, "gz");
    assert_eq!(report.files, 1);
    assert_eq!(std::fs::read(temp.path().join("bundle.tar")).unwrap(), tar);
}

#[test]
fn test_every_codec_names_its_output() {
    let payload = b"0123456789abcdef".repeat(64);
    for codec in CompressionCodec::ALL {
        let temp = output_dir();
        let data = compress(codec, &payload);
        let name = format!("payload.{}", codec.label());
        // Brotli has no magic number and needs an explicit type.
        let config = if codec == CompressionCodec::Brotli {
            config().with_extract_type("brotli")
        } else {
            config()
        };

        let report = extract_into(&data, Some(&name), temp.path(), &config).unwrap();

        assert_eq!(report.extracted_type, codec.label());
        assert_eq!(
            std::fs::read(temp.path().join("payload")).unwrap(),
            payload,
            "{codec}"
        );
    }
}

#[test]
fn test_unknown_suffix_and_anonymous_input() {
    let temp = output_dir();
    let data = compress(CompressionCodec::Xz, b"content");

    extract_into(&data, Some("blob"), temp.path(), &config()).unwrap();
    extract_into(&data, None, temp.path(), &config()).unwrap();

    assert!(temp.path().join("blob.decompressed").is_file());
    assert!(temp.path().join("goextract-decompressed-content").is_file());
}

#[test]
fn test_unknown_format() {
    let temp = output_dir();
    let result = extract_into(b"just some text", None, temp.path(), &config());
    assert!(matches!(result, Err(ExtractionError::UnsupportedFormat)));
}

#[test]
fn test_extract_type_override() {
    let temp = output_dir();
    let data = compress(CompressionCodec::Brotli, b"no magic here");

    let result = extract_into(&data, Some("x.br"), temp.path(), &config());
    assert!(matches!(result, Err(ExtractionError::UnsupportedFormat)));

    let report = extract_into(
        &data,
        Some("x.br"),
        temp.path(),
        &config().with_extract_type("br"),
    )
    .unwrap();
    assert_eq!(report.extracted_type, "br");
    assert_eq!(std::fs::read(temp.path().join("x")).unwrap(), b"no magic here");

    let result = extract_into(&data, None, temp.path(), &config().with_extract_type("arj"));
    assert!(matches!(result, Err(ExtractionError::UnknownType { .. })));
}

#[test]
fn test_missing_destination() {
    let temp = output_dir();
    let dst = temp.path().join("a/b");
    let data = TarTestBuilder::new().add_file("f", b"1").build();

    let result = extract_into(&data, None, &dst, &config());
    assert!(matches!(result, Err(ExtractionError::DestinationMissing { .. })));

    extract_into(&data, None, &dst, &config().with_create_destination(true)).unwrap();
    assert!(dst.join("f").is_file());
}

#[test]
fn test_existing_files_and_overwrite() {
    let temp = output_dir();
    std::fs::write(temp.path().join("f"), b"old").unwrap();
    let data = TarTestBuilder::new().add_file("f", b"new").build();

    let result = extract_into(&data, None, temp.path(), &config());
    assert!(matches!(result, Err(ExtractionError::AlreadyExists { .. })));
    assert_eq!(std::fs::read(temp.path().join("f")).unwrap(), b"old");

    extract_into(&data, None, temp.path(), &config().with_overwrite(true)).unwrap();
    assert_eq!(std::fs::read(temp.path().join("f")).unwrap(), b"new");
}

#[test]
fn test_patterns_select_entries() {
    let temp = output_dir();
    let data = TarTestBuilder::new()
        .add_file("keep.txt", b"1")
        .add_file("drop.bin", b"2")
        .add_file("docs/also.txt", b"3")
        .build();
    let config = config().with_patterns(["*.txt", "docs/*"]);

    let report = extract_into(&data, None, temp.path(), &config).unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.pattern_mismatches, 1);
    assert_eq!(tree(temp.path()), ["docs", "docs/also.txt", "keep.txt"]);
}

#[test]
fn test_invalid_pattern() {
    let temp = output_dir();
    let data = TarTestBuilder::new().add_file("f", b"1").build();
    let result = extract_into(&data, None, temp.path(), &config().with_patterns(["a[b"]));
    assert!(matches!(result, Err(ExtractionError::InvalidPattern { .. })));
}

#[cfg(unix)]
#[test]
fn test_modes_without_preserve() {
    let temp = output_dir();
    let data = TarTestBuilder::new()
        .add_file_with_mode("script.sh", b"#!/bin/sh", 0o4755)
        .add_directory_with_mode("private/", 0o700)
        .build();

    extract_into(&data, None, temp.path(), &config()).unwrap();

    assert_eq!(mode_of(&temp.path().join("script.sh")), 0o755);
    assert!(temp.path().join("private").is_dir());
}

#[cfg(unix)]
#[test]
fn test_preserve_file_attributes() {
    let temp = output_dir();
    let data = TarTestBuilder::new()
        .add_directory_with_mode("dir/", 0o750)
        .add_file_with_mode("dir/file", b"x", 0o600)
        .build();
    let config = config().with_preserve_file_attributes(true);

    extract_into(&data, None, temp.path(), &config).unwrap();

    let expected = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    for name in ["dir", "dir/file"] {
        let modified = std::fs::metadata(temp.path().join(name))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(modified, expected, "{name}");
    }
    assert_eq!(mode_of(&temp.path().join("dir/file")), 0o600);
    assert_eq!(mode_of(&temp.path().join("dir")), 0o750);
}

#[test]
fn test_cancelled_context() {
    let temp = output_dir();
    let data = TarTestBuilder::new().add_file("f", b"1").build();
    let ctx = ExtractionContext::new();
    ctx.cancel_handle().cancel();

    let result = safext_core::extract(&ctx, ArchiveSource::new(&data[..]), temp.path(), &config());

    assert!(matches!(result, Err(ExtractionError::Cancelled { .. })));
    assert!(!temp.path().join("f").exists());
}

#[test]
fn test_expired_deadline() {
    let temp = output_dir();
    let data = TarTestBuilder::new().add_file("f", b"1").build();
    let ctx = ExtractionContext::with_timeout(Duration::ZERO);

    let result = safext_core::extract(&ctx, ArchiveSource::new(&data[..]), temp.path(), &config());
    assert!(matches!(result, Err(ExtractionError::Cancelled { .. })));
}

#[test]
fn test_telemetry_hook_sees_failure() {
    let temp = output_dir();
    let data = TarTestBuilder::new().add_raw_file("../escape", b"x").build();
    let seen: Arc<Mutex<Vec<ExtractionReport>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let config = config().with_telemetry_hook(Arc::new(move |_ctx: &ExtractionContext, report: &ExtractionReport| {
        sink.lock().unwrap().push(report.clone());
    }));

    let result = extract_into(&data, None, temp.path(), &config);

    assert!(result.is_err());
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].extraction_errors, 1);
    assert!(seen[0].last_extraction_error.is_some());
}

#[test]
fn test_extract_file_from_disk() {
    let temp = output_dir();
    let archive = temp.path().join("notes.txt.zst");
    std::fs::write(&archive, compress(CompressionCodec::Zstd, b"notes")).unwrap();
    let out = temp.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let report = safext_core::extract_file(&archive, &out, &config()).unwrap();

    assert_eq!(report.extracted_type, "zst");
    assert_eq!(std::fs::read(out.join("notes.txt")).unwrap(), b"notes");
}

#[test]
fn test_input_limit() {
    let temp = output_dir();
    let data = TarTestBuilder::new().add_file("big", &[7u8; 8192]).build();
    let result = extract_into(&data, None, temp.path(), &config().with_max_input_size(Some(1024)));
    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::InputSize,
            limit: 1024
        })
    ));
}
