//! Hard link and special file tests.
//!
//! Hard links are never materialized, so `/etc/shadow`-style link targets
//! cannot be reached at all.

use safext_core::ExtractionError;
use safext_core::test_utils::TarTestBuilder;

use crate::config;
use crate::extract_bytes;

#[test]
fn test_hardlink_absolute_target() {
    let data = TarTestBuilder::new()
        .add_hardlink("malicious_hardlink", "/etc/passwd")
        .build();
    let (temp, result) = extract_bytes(&data, &config());

    assert!(matches!(
        result,
        Err(ExtractionError::UnsupportedEntry { ref kind, .. }) if kind == "hard link"
    ));
    assert!(!temp.path().join("out/malicious_hardlink").exists());
}

#[test]
fn test_hardlink_skipped_as_unsupported() {
    let data = TarTestBuilder::new()
        .add_file("file.txt", b"content")
        .add_hardlink("link", "file.txt")
        .add_fifo("pipe")
        .build();
    let (temp, result) = extract_bytes(&data, &config().with_continue_on_unsupported_files(true));

    let report = result.unwrap();
    assert_eq!(report.files, 1);
    assert_eq!(report.unsupported_files, 2);
    assert_eq!(report.last_unsupported_file.as_deref(), Some("pipe"));
    assert!(!report.has_errors());
    assert!(!temp.path().join("out/link").exists());
}

#[test]
fn test_unsupported_with_continue_on_error_counts_errors() {
    let data = TarTestBuilder::new()
        .add_hardlink("link", "../../etc/shadow")
        .build();
    let (_temp, result) = extract_bytes(&data, &config().with_continue_on_error(true));

    let report = result.unwrap();
    assert_eq!(report.unsupported_files, 0);
    assert_eq!(report.extraction_errors, 1);
}
