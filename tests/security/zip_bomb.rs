//! Decompression bomb and resource limit tests.

use safext_core::ExtractionError;
use safext_core::LimitKind;
use safext_core::formats::CompressionCodec;
use safext_core::test_utils::TarTestBuilder;
use safext_core::test_utils::ZipTestBuilder;
use safext_core::test_utils::compress;

use crate::config;
use crate::extract_bytes;

#[test]
fn test_single_stream_bomb() {
    // 64 MiB of zeros compresses to a few kilobytes.
    let data = compress(CompressionCodec::Gzip, &vec![0u8; 64 << 20]);
    assert!(data.len() < 1 << 20);

    let limit = 1 << 20;
    let (temp, result) = extract_bytes(
        &data,
        &config().with_max_extraction_size(Some(limit)),
    );
    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::ExtractionSize,
            ..
        })
    ));
    assert_eq!(std::fs::read_dir(temp.path().join("out")).unwrap().count(), 0);
}

#[test]
fn test_quota_spread_over_many_files() {
    let mut builder = ZipTestBuilder::new();
    for i in 0..10 {
        builder = builder.add_deflated_file(&format!("part{i}"), &[b'a'; 1000]);
    }
    let data = builder.build();

    let (temp, result) = extract_bytes(&data, &config().with_max_extraction_size(Some(4500)));
    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::ExtractionSize,
            limit: 4500
        })
    ));
    assert_eq!(std::fs::read_dir(temp.path().join("out")).unwrap().count(), 4);
}

#[test]
fn test_max_files() {
    let mut builder = ZipTestBuilder::new();
    for i in 0..5 {
        builder = builder.add_file(&format!("f{i}"), b"x");
    }
    let data = builder.build();

    let (temp, result) = extract_bytes(&data, &config().with_max_files(Some(1)));
    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::Files,
            limit: 1
        })
    ));
    assert_eq!(std::fs::read_dir(temp.path().join("out")).unwrap().count(), 1);

    let (_temp, result) = extract_bytes(
        &data,
        &config().with_max_files(Some(3)).with_continue_on_error(true),
    );
    let report = result.unwrap();
    assert_eq!(report.files, 3);
    assert_eq!(report.extraction_errors, 2);
}

#[test]
fn test_limit_equal_to_count_is_allowed() {
    let data = TarTestBuilder::new()
        .add_file("a", b"1")
        .add_file("b", b"2")
        .build();
    let (_temp, result) = extract_bytes(&data, &config().with_max_files(Some(2)));
    assert_eq!(result.unwrap().files, 2);
}

#[test]
fn test_input_limit_stops_before_full_decompression() {
    let payload: Vec<u8> = (0..1_000_000u32).flat_map(u32::to_le_bytes).collect();
    let data = compress(CompressionCodec::Zstd, &payload);
    let (_temp, result) = extract_bytes(&data, &config().with_max_input_size(Some(4096)));
    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::InputSize,
            limit: 4096
        })
    ));
}

#[test]
fn test_input_limit_is_fatal_even_with_continue_on_error() {
    let data = TarTestBuilder::new()
        .add_file("a", &[1u8; 4096])
        .add_file("b", &[2u8; 4096])
        .build();
    let (_temp, result) = extract_bytes(
        &data,
        &config()
            .with_max_input_size(Some(2048))
            .with_continue_on_error(true),
    );
    assert!(matches!(
        result,
        Err(ExtractionError::LimitExceeded {
            kind: LimitKind::InputSize,
            ..
        })
    ));
}
