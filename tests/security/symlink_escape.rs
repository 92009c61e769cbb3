//! Symlink escape attack tests.

#![cfg(unix)]

use safext_core::ExtractionError;
use safext_core::test_utils::TarTestBuilder;
use safext_core::test_utils::ZipTestBuilder;

use crate::config;
use crate::extract_bytes;

#[test]
fn test_symlink_absolute_target() {
    let data = TarTestBuilder::new()
        .add_symlink("malicious_link", "/etc/passwd")
        .build();
    let (temp, result) = extract_bytes(&data, &config());

    assert!(matches!(
        result,
        Err(ExtractionError::SymlinkAbsoluteTarget { .. })
    ));
    assert!(
        std::fs::symlink_metadata(temp.path().join("out/malicious_link")).is_err()
    );
}

#[test]
fn test_symlink_parent_traversal() {
    let data = TarTestBuilder::new()
        .add_symlink("safe/link", "../../etc/passwd")
        .build();
    let (_temp, result) = extract_bytes(&data, &config());

    assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
}

#[test]
fn test_symlink_inside_root_is_created() {
    let data = TarTestBuilder::new()
        .add_file("data/file.txt", b"content")
        .add_symlink("data/link", "file.txt")
        .add_symlink("top", "data/file.txt")
        .build();
    let (temp, result) = extract_bytes(&data, &config());

    let report = result.unwrap();
    assert_eq!(report.symlinks, 2);
    let out = temp.path().join("out");
    assert_eq!(std::fs::read(out.join("top")).unwrap(), b"content");
    assert_eq!(
        std::fs::read_link(out.join("data/link")).unwrap(),
        std::path::Path::new("file.txt")
    );
}

#[test]
fn test_write_through_symlink_is_rejected() {
    // CVE-2021-21300 style: a symlink followed by a file written through it.
    let data = TarTestBuilder::new()
        .add_symlink("dir", ".")
        .add_file("dir/payload", b"x")
        .build();
    let (_temp, result) = extract_bytes(&data, &config());

    assert!(matches!(result, Err(ExtractionError::SymlinkInPath { .. })));
}

#[test]
fn test_chained_symlinks_zip_slip() {
    let data = ZipTestBuilder::new()
        .add_directory("sub/")
        .add_symlink("sub/to-parent", "../")
        .add_symlink("sub/to-parent/one-above", "../")
        .build();
    let (temp, result) = extract_bytes(&data, &config());

    assert!(matches!(result, Err(ExtractionError::SymlinkInPath { .. })));
    assert!(std::fs::symlink_metadata(temp.path().join("one-above")).is_err());
}

#[test]
fn test_preexisting_symlink_in_destination() {
    let data = TarTestBuilder::new().add_file("escape/file", b"x").build();
    let temp = tempfile::TempDir::new().unwrap();
    let out = temp.path().join("out");
    let outside = temp.path().join("outside");
    std::fs::create_dir(&out).unwrap();
    std::fs::create_dir(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, out.join("escape")).unwrap();

    let result = safext_core::extract(
        &safext_core::ExtractionContext::new(),
        safext_core::ArchiveSource::new(&data[..]),
        &out,
        &config(),
    );
    assert!(matches!(result, Err(ExtractionError::SymlinkInPath { .. })));
    assert!(!outside.join("file").exists());

    // Following it is possible, but only on explicit request.
    let result = safext_core::extract(
        &safext_core::ExtractionContext::new(),
        safext_core::ArchiveSource::new(&data[..]),
        &out,
        &config().with_traverse_symlinks(true),
    );
    result.unwrap();
    assert!(outside.join("file").exists());
}

#[test]
fn test_deny_symlinks() {
    let data = TarTestBuilder::new()
        .add_file("a", b"1")
        .add_symlink("l", "a")
        .build();
    let (_temp, result) = extract_bytes(&data, &config().with_deny_symlinks(true));
    assert!(matches!(result, Err(ExtractionError::SymlinkDenied { .. })));

    let (temp, result) = extract_bytes(
        &data,
        &config()
            .with_deny_symlinks(true)
            .with_continue_on_unsupported_files(true),
    );
    let report = result.unwrap();
    assert_eq!(report.unsupported_files, 1);
    assert!(std::fs::symlink_metadata(temp.path().join("out/l")).is_err());
}
