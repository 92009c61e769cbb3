//! Single-stream compression codecs.
//!
//! Every codec exposes the same decoder contract: a byte stream in, a byte
//! stream out, failures reported through `io::Error`.
//!
//! | Codec  | Label | Crate      |
//! |--------|-------|------------|
//! | Gzip   | `gz`  | flate2     |
//! | Bzip2  | `bz2` | bzip2      |
//! | Xz     | `xz`  | xz2        |
//! | Zstd   | `zst` | zstd       |
//! | Lz4    | `lz4` | lz4_flex   |
//! | Snappy | `sz`  | snap       |
//! | Brotli | `br`  | brotli     |
//! | Zlib   | `zz`  | flate2     |

use std::io;
use std::io::Read;

/// Brotli window buffer handed to the decompressor.
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Compression codec of a single-stream input.
///
/// # Examples
///
/// ```
/// use safext_core::formats::compression::CompressionCodec;
///
/// assert_eq!(CompressionCodec::Gzip.label(), "gz");
/// assert_eq!(CompressionCodec::from_name("zstd"), Some(CompressionCodec::Zstd));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionCodec {
    /// Gzip (deflate with gzip framing), multi-member aware.
    Gzip,
    /// Bzip2, multi-stream aware.
    Bzip2,
    /// Xz (LZMA2), multi-stream aware.
    Xz,
    /// Zstandard.
    Zstd,
    /// LZ4 frame format.
    Lz4,
    /// Snappy framing format.
    Snappy,
    /// Brotli. Has no magic bytes; only reachable through a type override.
    Brotli,
    /// Raw zlib stream.
    Zlib,
}

impl CompressionCodec {
    /// All codecs, in detection order.
    pub const ALL: [Self; 8] = [
        Self::Gzip,
        Self::Bzip2,
        Self::Xz,
        Self::Zstd,
        Self::Lz4,
        Self::Snappy,
        Self::Brotli,
        Self::Zlib,
    ];

    /// Short label used in telemetry and in `tar.<label>`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
            Self::Zstd => "zst",
            Self::Lz4 => "lz4",
            Self::Snappy => "sz",
            Self::Brotli => "br",
            Self::Zlib => "zz",
        }
    }

    /// Names accepted for this codec in a type override, besides the label.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Gzip => &["gzip"],
            Self::Bzip2 => &["bzip2"],
            Self::Xz | Self::Lz4 => &[],
            Self::Zstd => &["zstd"],
            Self::Snappy => &["snappy"],
            Self::Brotli => &["brotli"],
            Self::Zlib => &["zlib"],
        }
    }

    /// File name suffixes stripped when naming decompressed output, with
    /// the text that replaces them. Matched case-insensitively, longest
    /// first.
    #[must_use]
    pub const fn suffixes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Gzip => &[(".gzip", ""), (".tgz", ".tar"), (".gz", "")],
            Self::Bzip2 => &[
                (".bzip2", ""),
                (".tbz2", ".tar"),
                (".tbz", ".tar"),
                (".bz2", ""),
                (".bz", ""),
            ],
            Self::Xz => &[(".txz", ".tar"), (".xz", "")],
            Self::Zstd => &[(".tzst", ".tar"), (".zstd", ""), (".zst", "")],
            Self::Lz4 => &[(".tlz4", ".tar"), (".lz4", "")],
            Self::Snappy => &[(".snappy", ""), (".sz", "")],
            Self::Brotli => &[(".br", "")],
            Self::Zlib => &[(".zlib", ""), (".zz", "")],
        }
    }

    /// Looks a codec up by label or alias, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|codec| {
            codec.label().eq_ignore_ascii_case(name)
                || codec.aliases().iter().any(|a| a.eq_ignore_ascii_case(name))
        })
    }

    /// Wraps `input` in this codec's decoder.
    ///
    /// Most decoders defer all validation to the first read; construction
    /// only fails for codecs that parse a header eagerly.
    pub fn decoder<'a>(self, input: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(input)),
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(input)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(input)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(input)?),
            Self::Lz4 => Box::new(lz4_flex::frame::FrameDecoder::new(input)),
            Self::Snappy => Box::new(snap::read::FrameDecoder::new(input)),
            Self::Brotli => Box::new(brotli::Decompressor::new(input, BROTLI_BUFFER_SIZE)),
            Self::Zlib => Box::new(flate2::read::ZlibDecoder::new(input)),
        })
    }
}

impl std::fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
