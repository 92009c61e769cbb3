//! Test utilities for building archives in memory.
//!
//! Shared by unit tests, integration tests and benches. Not part of the
//! stable API.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    missing_docs
)]

use std::io::Cursor;
use std::io::Write;

use crate::formats::CompressionCodec;

/// Compresses `data` with `codec`, in the framing its decoder expects.
///
/// # Examples
///
/// ```
/// use safext_core::formats::CompressionCodec;
/// use safext_core::test_utils::compress;
///
/// let gz = compress(CompressionCodec::Gzip, b"hello");
/// assert_eq!(&gz[..2], b"\x1f\x8b");
/// ```
#[must_use]
pub fn compress(codec: CompressionCodec, data: &[u8]) -> Vec<u8> {
    match codec {
        CompressionCodec::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::Xz => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::Zstd => zstd::encode_all(data, 3).unwrap(),
        CompressionCodec::Lz4 => {
            let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        CompressionCodec::Snappy => {
            let mut out = Vec::new();
            {
                let mut encoder = snap::write::FrameEncoder::new(&mut out);
                encoder.write_all(data).unwrap();
                encoder.flush().unwrap();
            }
            out
        }
        CompressionCodec::Brotli => {
            let mut encoder = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
            encoder.write_all(data).unwrap();
            encoder.into_inner()
        }
        CompressionCodec::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
    }
}

/// Builder for tar test archives, including entries `tar::Builder` would
/// refuse to write.
///
/// # Examples
///
/// ```
/// use safext_core::test_utils::TarTestBuilder;
///
/// let tar_data = TarTestBuilder::new()
///     .add_file("file.txt", b"content")
///     .add_directory("dir/")
///     .add_symlink("link", "file.txt")
///     .add_raw_file("../outside", b"x")
///     .build();
/// assert_eq!(tar_data.len() % 512, 0);
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

fn header(kind: tar::EntryType, size: u64, mode: u32) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(size);
    header.set_mode(mode);
    header.set_mtime(1_700_000_000);
    header
}

fn write_raw_field(field: &mut [u8], value: &[u8]) {
    assert!(value.len() < field.len(), "raw names must fit the v7 field");
    field.fill(0);
    field[..value.len()].copy_from_slice(value);
}

impl TarTestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    fn append(mut self, mut header: tar::Header, path: &str, data: &[u8]) -> Self {
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    fn append_raw(mut self, mut header: tar::Header, name: &[u8], data: &[u8]) -> Self {
        write_raw_field(&mut header.as_old_mut().name, name);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Adds a regular file with mode 0o644.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_file_with_mode(path, data, 0o644)
    }

    /// Adds a regular file with a custom mode.
    #[must_use]
    pub fn add_file_with_mode(self, path: &str, data: &[u8], mode: u32) -> Self {
        let header = header(tar::EntryType::Regular, data.len() as u64, mode);
        self.append(header, path, data)
    }

    /// Adds a regular file owned by `uid`/`gid`.
    #[must_use]
    pub fn add_owned_file(self, path: &str, data: &[u8], uid: u64, gid: u64) -> Self {
        let mut header = header(tar::EntryType::Regular, data.len() as u64, 0o644);
        header.set_uid(uid);
        header.set_gid(gid);
        self.append(header, path, data)
    }

    /// Adds a regular file with the name written verbatim, so names such as
    /// `../x` or `/abs` survive.
    #[must_use]
    pub fn add_raw_file(self, name: &str, data: &[u8]) -> Self {
        let header = header(tar::EntryType::Regular, data.len() as u64, 0o644);
        self.append_raw(header, name.as_bytes(), data)
    }

    /// Adds a directory.
    #[must_use]
    pub fn add_directory(self, path: &str) -> Self {
        self.add_directory_with_mode(path, 0o755)
    }

    /// Adds a directory with a custom mode.
    #[must_use]
    pub fn add_directory_with_mode(self, path: &str, mode: u32) -> Self {
        let header = header(tar::EntryType::Directory, 0, mode);
        self.append(header, path, &[])
    }

    /// Adds a symlink; the target is written verbatim.
    #[must_use]
    pub fn add_symlink(self, path: &str, target: &str) -> Self {
        let mut header = header(tar::EntryType::Symlink, 0, 0o777);
        header.set_link_name_literal(target).unwrap();
        self.append(header, path, &[])
    }

    /// Adds a symlink with both name and target written verbatim.
    #[must_use]
    pub fn add_raw_symlink(self, name: &str, target: &str) -> Self {
        let mut header = header(tar::EntryType::Symlink, 0, 0o777);
        header.set_link_name_literal(target).unwrap();
        self.append_raw(header, name.as_bytes(), &[])
    }

    /// Adds a regular file whose name bytes are written as given, which
    /// need not be UTF-8.
    #[must_use]
    pub fn add_raw_bytes_file(self, name: &[u8], data: &[u8]) -> Self {
        let header = header(tar::EntryType::Regular, data.len() as u64, 0o644);
        self.append_raw(header, name, data)
    }

    /// Adds a symlink whose target bytes are written as given.
    #[must_use]
    pub fn add_raw_bytes_symlink(self, name: &str, target: &[u8]) -> Self {
        let mut header = header(tar::EntryType::Symlink, 0, 0o777);
        write_raw_field(&mut header.as_old_mut().linkname, target);
        self.append_raw(header, name.as_bytes(), &[])
    }

    /// Adds a hard link.
    #[must_use]
    pub fn add_hardlink(self, path: &str, target: &str) -> Self {
        let mut header = header(tar::EntryType::Link, 0, 0o644);
        header.set_link_name_literal(target).unwrap();
        self.append(header, path, &[])
    }

    /// Adds a FIFO.
    #[must_use]
    pub fn add_fifo(self, path: &str) -> Self {
        let header = header(tar::EntryType::Fifo, 0, 0o644);
        self.append(header, path, &[])
    }

    /// Finishes the archive.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for zip test archives.
///
/// # Examples
///
/// ```
/// use safext_core::test_utils::ZipTestBuilder;
///
/// let zip_data = ZipTestBuilder::new()
///     .add_file("file.txt", b"content")
///     .add_directory("dir/")
///     .build();
/// assert_eq!(&zip_data[..2], b"PK");
/// ```
pub struct ZipTestBuilder {
    zip: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds a stored file with mode 0o644.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_file_with_mode(path, data, 0o644)
    }

    /// Adds a stored file with a custom mode.
    #[must_use]
    pub fn add_file_with_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(mode);
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a deflated file.
    #[must_use]
    pub fn add_deflated_file(mut self, path: &str, data: &[u8]) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default().unix_permissions(0o755);
        self.zip.add_directory(path, options).unwrap();
        self
    }

    /// Adds a symlink: Unix mode `S_IFLNK`, target stored as content.
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        use zip::write::SimpleFileOptions;

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o120_777);
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(target.as_bytes()).unwrap();
        self
    }

    /// Finishes the archive.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
