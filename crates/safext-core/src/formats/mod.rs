//! Archive and compression format support.
//!
//! Containers are exposed through the [`Walker`] trait; single-stream codecs
//! through [`CompressionCodec::decoder`]. The [`FormatRegistry`] decides which
//! of the two an input is.

pub mod compression;
pub mod rar;
pub mod registry;
pub mod sevenz;
pub mod tar;
pub mod time;
pub mod traits;
pub mod zip;

pub use compression::CompressionCodec;
pub use rar::RarWalker;
pub use registry::ContainerFormat;
pub use registry::FormatKind;
pub use registry::FormatRegistry;
pub use registry::Selection;
pub use registry::Signature;
pub use sevenz::SevenZWalker;
pub use tar::TarWalker;
pub use traits::ArchiveEntry;
pub use traits::EntryContent;
pub use traits::EntryVisitor;
pub use traits::Walker;
pub use zip::ZipWalker;
