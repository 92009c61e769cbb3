//! Path traversal attack tests.
//!
//! Covers the classic zip-slip and tar `../` scenarios as well as absolute
//! member names.

use safext_core::ExtractionError;
use safext_core::error::NameViolation;
use safext_core::test_utils::TarTestBuilder;
use safext_core::test_utils::ZipTestBuilder;

use crate::config;
use crate::extract_bytes;

#[test]
fn test_tar_parent_traversal_is_rejected() {
    let data = TarTestBuilder::new().add_raw_file("../test", b"evil").build();
    let (temp, result) = extract_bytes(&data, &config());

    assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    assert!(!temp.path().join("test").exists());
}

#[test]
fn test_tar_parent_traversal_continue_on_error() {
    let data = TarTestBuilder::new().add_raw_file("../test", b"evil").build();
    let (temp, result) = extract_bytes(&data, &config().with_continue_on_error(true));

    let report = result.unwrap();
    assert_eq!(report.files, 0);
    assert_eq!(report.extraction_errors, 1);
    assert!(!temp.path().join("test").exists());
}

#[test]
fn test_cve_2018_1002200_zip_slip() {
    // Zip Slip: archive members climbing out of the extraction directory.
    let names = [
        "../evil.txt",
        "../../evil.txt",
        "good/../../evil.txt",
        "a/b/../../../evil.txt",
    ];
    for name in names {
        let data = ZipTestBuilder::new().add_file(name, b"evil").build();
        let (temp, result) = extract_bytes(&data, &config());
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "{name} should be rejected"
        );
        assert!(!temp.path().join("evil.txt").exists());
    }
}

#[test]
fn test_inner_parent_references_stay_inside() {
    let data = TarTestBuilder::new()
        .add_raw_file("a/b/../c.txt", b"ok")
        .build();
    let (temp, result) = extract_bytes(&data, &config());

    result.unwrap();
    let content = std::fs::read(temp.path().join("out/a/c.txt")).unwrap();
    assert_eq!(content, b"ok");
}

#[test]
fn test_absolute_member_lands_under_root() {
    let data = TarTestBuilder::new()
        .add_raw_file("/etc/safext-test", b"rooted")
        .build();
    let (temp, result) = extract_bytes(&data, &config());

    result.unwrap();
    let content = std::fs::read(temp.path().join("out/etc/safext-test")).unwrap();
    assert_eq!(content, b"rooted");
}

#[test]
fn test_other_entries_survive_with_continue_on_error() {
    let data = TarTestBuilder::new()
        .add_file("before.txt", b"1")
        .add_raw_file("../../escape", b"x")
        .add_file("after.txt", b"2")
        .build();
    let (temp, result) = extract_bytes(&data, &config().with_continue_on_error(true));

    let report = result.unwrap();
    assert_eq!(report.files, 2);
    assert_eq!(report.extraction_errors, 1);
    assert!(temp.path().join("out/before.txt").exists());
    assert!(temp.path().join("out/after.txt").exists());
}

#[test]
fn test_non_utf8_tar_name_is_refused() {
    let data = TarTestBuilder::new()
        .add_raw_bytes_file(b"caf\xe9.txt", b"x")
        .build();
    let (_temp, result) = extract_bytes(&data, &config());

    match result {
        Err(ExtractionError::IllegalName { reason, .. }) => {
            assert_eq!(reason, NameViolation::NotUtf8);
        }
        other => panic!("expected illegal name, got {other:?}"),
    }
}

#[test]
fn test_non_utf8_tar_names_skipped_with_continue_on_error() {
    let data = TarTestBuilder::new()
        .add_raw_bytes_file(b"caf\xe9.txt", b"x")
        .add_raw_bytes_symlink("link", b"tar\xffget")
        .add_file("after.txt", b"2")
        .build();
    let (temp, result) = extract_bytes(&data, &config().with_continue_on_error(true));

    let report = result.unwrap();
    assert_eq!(report.files, 1);
    assert_eq!(report.symlinks, 0);
    assert_eq!(report.extraction_errors, 2);
    assert!(
        report
            .last_extraction_error
            .as_deref()
            .unwrap()
            .contains("not valid UTF-8")
    );
    assert_eq!(std::fs::read_dir(temp.path().join("out")).unwrap().count(), 1);
}
