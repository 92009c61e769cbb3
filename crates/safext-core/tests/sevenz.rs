//! 7z extraction tests over archives generated with `sevenz-rust2`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Cursor;
use std::sync::Arc;

use safext_core::ArchiveSource;
use safext_core::ExtractionConfig;
use safext_core::ExtractionContext;
use safext_core::ExtractionError;
use safext_core::LimitKind;
use safext_core::logger::NoopLogger;
use safext_core::target::MemoryTarget;
use sevenz_rust2::ArchiveEntry;
use sevenz_rust2::ArchiveWriter;
use sevenz_rust2::Password;
use sevenz_rust2::SourceReader;
use tempfile::TempDir;

fn build_7z(files: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
    let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
    for dir in dirs {
        writer
            .push_archive_entry::<&[u8]>(ArchiveEntry::new_directory(dir), None)
            .unwrap();
    }
    for (name, data) in files {
        writer
            .push_archive_entry(ArchiveEntry::new_file(name), Some(*data))
            .unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn build_solid_7z(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
    let entries = files
        .iter()
        .map(|(name, _)| ArchiveEntry::new_file(name))
        .collect();
    let readers = files
        .iter()
        .map(|(_, data)| SourceReader::from(&data[..]))
        .collect();
    writer.push_archive_entries(entries, readers).unwrap();
    let data = writer.finish().unwrap().into_inner();

    let archive = sevenz_rust2::Archive::read(&mut Cursor::new(&data[..]), &Password::empty()).unwrap();
    assert!(archive.is_solid);
    data
}

fn numbered_files(count: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|i| (format!("dir{}/file{i:03}.txt", i % 2), format!("content {i}").repeat(i + 1).into_bytes()))
        .collect()
}

fn config() -> ExtractionConfig {
    ExtractionConfig::default().with_logger(Arc::new(NoopLogger))
}

#[test]
fn test_sevenz_to_disk() {
    let temp = TempDir::new().unwrap();
    let data = build_7z(
        &[("docs/readme.txt", b"read me"), ("top.bin", &[9u8; 300])],
        &["docs"],
    );

    let report = safext_core::extract(
        &ExtractionContext::new(),
        ArchiveSource::new(&data[..]),
        temp.path(),
        &config(),
    )
    .unwrap();

    assert_eq!(report.extracted_type, "7z");
    assert_eq!(report.files, 2);
    assert_eq!(report.dirs, 1);
    assert_eq!(report.extraction_size, 307);
    assert_eq!(
        std::fs::read(temp.path().join("docs/readme.txt")).unwrap(),
        b"read me"
    );
}

#[test]
fn test_sevenz_in_memory_spool() {
    let fs = MemoryTarget::new();
    let data = build_7z(&[("a.txt", b"alpha")], &[]);

    let report = safext_core::extract_to(
        &ExtractionContext::new(),
        &fs,
        ArchiveSource::new(&data[..]),
        "/out",
        &config().with_create_destination(true).with_cache_in_memory(true),
    )
    .unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(fs.read_file("/out/a.txt").unwrap(), b"alpha");
}

#[test]
fn test_sevenz_traversal() {
    let temp = TempDir::new().unwrap();
    let data = build_7z(&[("../evil.txt", b"evil")], &[]);

    let result = safext_core::extract(
        &ExtractionContext::new(),
        ArchiveSource::new(&data[..]),
        temp.path(),
        &config(),
    );

    assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    assert!(!temp.path().parent().unwrap().join("evil.txt").exists());
}

#[test]
fn test_sevenz_size_limit() {
    let fs = MemoryTarget::new();
    let data = build_7z(&[("zeros", &[0u8; 10_000])], &[]);

    let result = safext_core::extract_to(
        &ExtractionContext::new(),
        &fs,
        ArchiveSource::new(&data[..]),
        "/out",
        &config()
            .with_create_destination(true)
            .with_max_extraction_size(Some(1000)),
    );

    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::ExtractionSize,
            limit: 1000
        })
    ));
    assert!(fs.read_file("/out/zeros").is_err());
}

#[test]
fn test_solid_sevenz_extracts_every_entry() {
    let fs = MemoryTarget::new();
    let files = numbered_files(40);
    let data = build_solid_7z(&files);

    let report = safext_core::extract_to(
        &ExtractionContext::new(),
        &fs,
        ArchiveSource::new(&data[..]),
        "/out",
        &config().with_create_destination(true),
    )
    .unwrap();

    assert_eq!(report.files, 40);
    let total: u64 = files.iter().map(|(_, data)| data.len() as u64).sum();
    assert_eq!(report.extraction_size, total);
    for (name, content) in &files {
        assert_eq!(&fs.read_file(format!("/out/{name}")).unwrap(), content);
    }
}

#[test]
fn test_solid_sevenz_skipped_entries_do_not_shift_content() {
    let fs = MemoryTarget::new();
    let mut files = numbered_files(10);
    files.insert(3, ("../evil.txt".to_owned(), b"evil".to_vec()));
    let data = build_solid_7z(&files);

    let report = safext_core::extract_to(
        &ExtractionContext::new(),
        &fs,
        ArchiveSource::new(&data[..]),
        "/out",
        &config()
            .with_create_destination(true)
            .with_continue_on_error(true)
            .with_patterns(vec!["dir1/*".to_owned(), "../*".to_owned()]),
    )
    .unwrap();

    assert_eq!(report.files, 5);
    assert_eq!(report.pattern_mismatches, 5);
    assert_eq!(report.extraction_errors, 1);
    for (name, content) in files.iter().filter(|(name, _)| name.starts_with("dir1/")) {
        assert_eq!(&fs.read_file(format!("/out/{name}")).unwrap(), content);
    }
    assert!(fs.read_file("/out/dir0/file000.txt").is_err());
}

#[test]
fn test_solid_sevenz_size_limit_counts_streamed_bytes() {
    let fs = MemoryTarget::new();
    let files = numbered_files(20);
    let data = build_solid_7z(&files);

    let result = safext_core::extract_to(
        &ExtractionContext::new(),
        &fs,
        ArchiveSource::new(&data[..]),
        "/out",
        &config()
            .with_create_destination(true)
            .with_max_extraction_size(Some(500)),
    );

    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::ExtractionSize,
            limit: 500
        })
    ));
}
