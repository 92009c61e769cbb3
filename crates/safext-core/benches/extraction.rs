//! Extraction throughput benchmarks.
//!
//! Archives are built once per parameter and extracted into a fresh
//! [`MemoryTarget`] per iteration, so the numbers cover decoding, the path
//! guard and bookkeeping without disk noise. One group runs on disk for
//! comparison.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use safext_core::ArchiveSource;
use safext_core::ExtractionConfig;
use safext_core::ExtractionContext;
use safext_core::formats::CompressionCodec;
use safext_core::logger::NoopLogger;
use safext_core::target::MemoryTarget;
use safext_core::test_utils::TarTestBuilder;
use safext_core::test_utils::ZipTestBuilder;
use safext_core::test_utils::compress;
use tempfile::TempDir;

fn config() -> ExtractionConfig {
    ExtractionConfig::default()
        .with_create_destination(true)
        .with_logger(Arc::new(NoopLogger))
}

fn many_small_files_tar(file_count: usize) -> Vec<u8> {
    let mut builder = TarTestBuilder::new();
    for i in 0..file_count {
        builder = builder.add_file(&format!("dir{}/file{i:04}.txt", i % 16), format!("content{i}").as_bytes());
    }
    builder.build()
}

fn nested_zip(depth: usize) -> Vec<u8> {
    let mut builder = ZipTestBuilder::new();
    let mut prefix = String::new();
    for level in 0..depth {
        prefix.push_str(&format!("level{level}/"));
        builder = builder
            .add_directory(&prefix)
            .add_file(&format!("{prefix}file.txt"), b"content");
    }
    builder.build()
}

fn extract_in_memory(data: &[u8], config: &ExtractionConfig) {
    let fs = MemoryTarget::new();
    let report = safext_core::extract_to(
        &ExtractionContext::new(),
        &fs,
        ArchiveSource::new(data),
        "/out",
        config,
    )
    .unwrap();
    black_box(report);
}

fn benchmark_many_small_files(c: &mut Criterion) {
    let mut group = c.benchmark_group("tar_small_files");
    let config = config();

    for file_count in [10, 100, 1000] {
        let data = many_small_files_tar(file_count);
        group.throughput(Throughput::Elements(file_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(file_count),
            &data,
            |b, data| b.iter(|| extract_in_memory(data, &config)),
        );
    }

    group.finish();
}

fn benchmark_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_stream");
    let config = config();
    let payload: Vec<u8> = (0..1_048_576u32).map(|i| (i % 251) as u8).collect();
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for codec in CompressionCodec::ALL {
        let data = compress(codec, &payload);
        let config = if codec == CompressionCodec::Brotli {
            config.clone().with_extract_type("br")
        } else {
            config.clone()
        };
        group.bench_with_input(BenchmarkId::from_parameter(codec.label()), &data, |b, data| {
            b.iter(|| extract_in_memory(data, &config));
        });
    }

    group.finish();
}

fn benchmark_nested_directories(c: &mut Criterion) {
    let mut group = c.benchmark_group("zip_nested");
    let config = config();

    for depth in [5, 20, 50] {
        let data = nested_zip(depth);
        group.throughput(Throughput::Elements(depth as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &data, |b, data| {
            b.iter(|| extract_in_memory(data, &config));
        });
    }

    group.finish();
}

fn benchmark_disk(c: &mut Criterion) {
    let mut group = c.benchmark_group("tar_gz_disk");
    let config = config().with_overwrite(true);
    let data = compress(CompressionCodec::Gzip, &many_small_files_tar(200));
    let temp = TempDir::new().unwrap();

    group.throughput(Throughput::Elements(200));
    group.bench_function("200_files", |b| {
        b.iter(|| {
            let report = safext_core::extract(
                &ExtractionContext::new(),
                ArchiveSource::new(&data[..]),
                temp.path(),
                &config,
            )
            .unwrap();
            black_box(report);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_many_small_files,
    benchmark_codecs,
    benchmark_nested_directories,
    benchmark_disk
);
criterion_main!(benches);
