//! Magic-byte format registry and dispatcher.
//!
//! The registry is an ordinary value: the caller builds it once (usually via
//! [`FormatRegistry::default`]) and hands it to the extraction call. Nothing
//! here is global.

use crate::ExtractionError;
use crate::Result;
use crate::formats::compression::CompressionCodec;

/// Container formats walked entry by entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// POSIX / GNU tar.
    Tar,
    /// PKZIP.
    Zip,
    /// 7-Zip.
    SevenZ,
    /// RAR 4 and 5.
    Rar,
}

impl ContainerFormat {
    /// Canonical name, also used as the telemetry label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::SevenZ => "7z",
            Self::Rar => "rar",
        }
    }
}

/// What to do with an input once it has been identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Hand the stream to a walker.
    Container(ContainerFormat),
    /// Run the stream through a decoder.
    Compressed(CompressionCodec),
}

impl FormatKind {
    /// Canonical name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Container(format) => format.label(),
            Self::Compressed(codec) => codec.label(),
        }
    }
}

/// Magic bytes expected at a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Byte offset of the pattern from the start of the stream.
    pub offset: usize,
    /// Expected bytes.
    pub magic: &'static [u8],
}

impl Signature {
    /// Creates a signature.
    #[must_use]
    pub const fn new(offset: usize, magic: &'static [u8]) -> Self {
        Self { offset, magic }
    }

    /// Bytes of header needed to test this signature.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.magic.len()
    }

    /// Whether `header` carries this signature.
    #[must_use]
    pub fn matches(&self, header: &[u8]) -> bool {
        header
            .get(self.offset..self.end())
            .is_some_and(|window| window == self.magic)
    }
}

/// One registered format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEntry {
    /// Handling strategy.
    pub kind: FormatKind,
    /// Signatures; empty means the format is never sniffed.
    pub signatures: Vec<Signature>,
}

/// Tar magic at offset 257: historical, POSIX `ustar\0` and GNU `ustar  \0`.
pub const TAR_SIGNATURES: [Signature; 3] = [
    Signature::new(257, b"ustar\x00tar\x00"),
    Signature::new(257, b"ustar\x00"),
    Signature::new(257, b"ustar  \x00"),
];

/// Outcome of resolving a type override or a sniffed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Selected format.
    pub kind: FormatKind,
    /// Unpack decompressed content as tar without sniffing it first.
    pub force_tar: bool,
}

const TAR_SHORTHANDS: [(&str, CompressionCodec); 7] = [
    ("tgz", CompressionCodec::Gzip),
    ("tbz", CompressionCodec::Bzip2),
    ("tbz2", CompressionCodec::Bzip2),
    ("txz", CompressionCodec::Xz),
    ("tzst", CompressionCodec::Zstd),
    ("tlz4", CompressionCodec::Lz4),
    ("tsz", CompressionCodec::Snappy),
];

/// Table of formats with the header length needed to sniff any of them.
///
/// # Examples
///
/// ```
/// use safext_core::formats::registry::{ContainerFormat, FormatKind, FormatRegistry};
///
/// let registry = FormatRegistry::default();
/// assert_eq!(registry.max_header(), 265);
/// assert_eq!(
///     registry.sniff(b"PK\x03\x04"),
///     Some(FormatKind::Container(ContainerFormat::Zip))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRegistry {
    entries: Vec<FormatEntry>,
    max_header: usize,
}

impl Default for FormatRegistry {
    /// Registry with every supported format. Containers are tested before
    /// codecs, and brotli is registered without signatures.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            FormatKind::Container(ContainerFormat::Tar),
            TAR_SIGNATURES.to_vec(),
        );
        registry.register(
            FormatKind::Container(ContainerFormat::Zip),
            vec![
                Signature::new(0, b"PK\x03\x04"),
                Signature::new(0, b"PK\x05\x06"),
                Signature::new(0, b"PK\x07\x08"),
            ],
        );
        registry.register(
            FormatKind::Container(ContainerFormat::SevenZ),
            vec![Signature::new(0, b"7z\xbc\xaf\x27\x1c")],
        );
        registry.register(
            FormatKind::Container(ContainerFormat::Rar),
            vec![
                Signature::new(0, b"Rar!\x1a\x07\x00"),
                Signature::new(0, b"Rar!\x1a\x07\x01\x00"),
            ],
        );
        for codec in CompressionCodec::ALL {
            registry.register(FormatKind::Compressed(codec), codec_signatures(codec));
        }
        registry
    }
}

fn codec_signatures(codec: CompressionCodec) -> Vec<Signature> {
    match codec {
        CompressionCodec::Gzip => vec![Signature::new(0, b"\x1f\x8b")],
        CompressionCodec::Bzip2 => vec![Signature::new(0, b"BZh")],
        CompressionCodec::Xz => vec![Signature::new(0, b"\xfd7zXZ\x00")],
        CompressionCodec::Zstd => vec![Signature::new(0, b"\x28\xb5\x2f\xfd")],
        CompressionCodec::Lz4 => vec![Signature::new(0, b"\x04\x22\x4d\x18")],
        CompressionCodec::Snappy => vec![Signature::new(0, b"\xff\x06\x00\x00sNaPpY")],
        CompressionCodec::Brotli => Vec::new(),
        CompressionCodec::Zlib => vec![
            Signature::new(0, b"\x78\x01"),
            Signature::new(0, b"\x78\x5e"),
            Signature::new(0, b"\x78\x9c"),
            Signature::new(0, b"\x78\xda"),
        ],
    }
}

impl FormatRegistry {
    /// Registry with no formats.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
            max_header: 0,
        }
    }

    /// Appends a format. Earlier registrations win when sniffing.
    pub fn register(&mut self, kind: FormatKind, signatures: Vec<Signature>) {
        let needed = signatures.iter().map(Signature::end).max().unwrap_or(0);
        self.max_header = self.max_header.max(needed);
        self.entries.push(FormatEntry { kind, signatures });
    }

    /// Longest header any registered signature needs.
    #[must_use]
    pub const fn max_header(&self) -> usize {
        self.max_header
    }

    /// Registered formats in sniffing order.
    #[must_use]
    pub fn entries(&self) -> &[FormatEntry] {
        &self.entries
    }

    /// Identifies `header`, if any signature matches.
    #[must_use]
    pub fn sniff(&self, header: &[u8]) -> Option<FormatKind> {
        self.entries
            .iter()
            .find(|entry| entry.signatures.iter().any(|sig| sig.matches(header)))
            .map(|entry| entry.kind)
    }

    /// Whether `header` starts a tar archive.
    #[must_use]
    pub fn is_tar(&self, header: &[u8]) -> bool {
        self.sniff(header) == Some(FormatKind::Container(ContainerFormat::Tar))
    }

    /// Picks the format for an input: the override when given, the sniffed
    /// header otherwise.
    pub fn select(&self, override_name: Option<&str>, header: &[u8]) -> Result<Selection> {
        match override_name {
            Some(name) => self.resolve(name),
            None => self
                .sniff(header)
                .map(|kind| Selection {
                    kind,
                    force_tar: false,
                })
                .ok_or(ExtractionError::UnsupportedFormat),
        }
    }

    /// Resolves a type override such as `zip`, `gzip`, `tar.xz` or `tgz`.
    pub fn resolve(&self, name: &str) -> Result<Selection> {
        let unknown = || ExtractionError::UnknownType {
            name: name.to_string(),
        };
        let normalized = name.trim().trim_start_matches('.').to_ascii_lowercase();

        let (codec_name, force_tar) = match normalized.strip_prefix("tar.") {
            Some(codec) => (codec, true),
            None => (normalized.as_str(), false),
        };

        let kind = if force_tar {
            CompressionCodec::from_name(codec_name).map(FormatKind::Compressed)
        } else if let Some((_, codec)) = TAR_SHORTHANDS.iter().find(|(n, _)| *n == codec_name) {
            return self.registered(FormatKind::Compressed(*codec), true).ok_or_else(unknown);
        } else {
            self.entries
                .iter()
                .map(|entry| entry.kind)
                .find(|kind| kind.label() == codec_name)
                .or_else(|| CompressionCodec::from_name(codec_name).map(FormatKind::Compressed))
        };

        kind.and_then(|kind| self.registered(kind, force_tar))
            .ok_or_else(unknown)
    }

    fn registered(&self, kind: FormatKind, force_tar: bool) -> Option<Selection> {
        self.entries
            .iter()
            .any(|entry| entry.kind == kind)
            .then_some(Selection { kind, force_tar })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::compress;

    fn container(format: ContainerFormat) -> Option<FormatKind> {
        Some(FormatKind::Container(format))
    }

    #[test]
    fn test_max_header_covers_tar_magic() {
        assert_eq!(FormatRegistry::default().max_header(), 257 + 8);
        assert_eq!(FormatRegistry::empty().max_header(), 0);
    }

    #[test]
    fn test_sniff_tar_variants() {
        let registry = FormatRegistry::default();
        let tar = TarTestBuilder::new().add_file("a.txt", b"hi").build();
        assert_eq!(registry.sniff(&tar), container(ContainerFormat::Tar));

        let mut posix = vec![0u8; 512];
        posix[257..263].copy_from_slice(b"ustar\x00");
        assert!(registry.is_tar(&posix));
    }

    #[test]
    fn test_sniff_containers() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.sniff(b"7z\xbc\xaf\x27\x1c\x00\x04"),
            container(ContainerFormat::SevenZ)
        );
        assert_eq!(
            registry.sniff(b"Rar!\x1a\x07\x01\x00more"),
            container(ContainerFormat::Rar)
        );
        assert_eq!(
            registry.sniff(b"PK\x05\x06"),
            container(ContainerFormat::Zip)
        );
    }

    #[test]
    fn test_sniff_every_sniffable_codec() {
        let registry = FormatRegistry::default();
        for codec in CompressionCodec::ALL {
            if codec == CompressionCodec::Brotli {
                continue;
            }
            let data = compress(codec, b"hello hello hello");
            assert_eq!(
                registry.sniff(&data),
                Some(FormatKind::Compressed(codec)),
                "codec {codec}"
            );
        }
    }

    #[test]
    fn test_brotli_never_sniffed() {
        let registry = FormatRegistry::default();
        let data = compress(CompressionCodec::Brotli, b"hello");
        assert_ne!(
            registry.sniff(&data),
            Some(FormatKind::Compressed(CompressionCodec::Brotli))
        );
    }

    #[test]
    fn test_unknown_header() {
        let registry = FormatRegistry::default();
        assert!(registry.sniff(b"plain text").is_none());
        assert!(matches!(
            registry.select(None, b"plain text"),
            Err(ExtractionError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_override_bypasses_sniffing() {
        let registry = FormatRegistry::default();
        let selection = registry.select(Some("br"), b"PK\x03\x04").unwrap();
        assert_eq!(
            selection.kind,
            FormatKind::Compressed(CompressionCodec::Brotli)
        );
        assert!(!selection.force_tar);
    }

    #[test]
    fn test_override_forms() {
        let registry = FormatRegistry::default();
        let tar_xz = registry.resolve("tar.xz").unwrap();
        assert_eq!(tar_xz.kind, FormatKind::Compressed(CompressionCodec::Xz));
        assert!(tar_xz.force_tar);

        let tgz = registry.resolve(".TGZ").unwrap();
        assert_eq!(tgz.kind, FormatKind::Compressed(CompressionCodec::Gzip));
        assert!(tgz.force_tar);

        assert_eq!(
            registry.resolve("7z").unwrap().kind,
            FormatKind::Container(ContainerFormat::SevenZ)
        );
        assert_eq!(
            registry.resolve("gzip").unwrap().kind,
            FormatKind::Compressed(CompressionCodec::Gzip)
        );
        assert!(matches!(
            registry.resolve("arj"),
            Err(ExtractionError::UnknownType { .. })
        ));
        assert!(registry.resolve("tar.zip").is_err());
    }

    #[test]
    fn test_custom_registry_only_knows_registered() {
        let mut registry = FormatRegistry::empty();
        registry.register(
            FormatKind::Container(ContainerFormat::Zip),
            vec![Signature::new(0, b"PK\x03\x04")],
        );
        assert_eq!(registry.max_header(), 4);
        assert!(registry.resolve("gz").is_err());
        assert!(registry.resolve("zip").is_ok());
    }
}
