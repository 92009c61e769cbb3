//! Naming of single decompressed files.

use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;
use crate::formats::CompressionCodec;
use crate::security::check_output_name;
use crate::target::Target;

/// Name used when nothing usable can be derived from the input.
pub const FALLBACK_NAME: &str = "goextract-decompressed-content";

/// Appended when the input name carries no known suffix.
pub const DECOMPRESSED_SUFFIX: &str = ".decompressed";

/// Derives the output file name from the input name.
///
/// The base name loses its compression suffix (`.gz`, `.TGZ` becomes
/// `.tar`, ...); without one, `.decompressed` is appended. Names that fail
/// [`check_output_name`] are replaced by [`FALLBACK_NAME`].
///
/// # Examples
///
/// ```
/// use safext_core::extraction::naming::derive_name;
/// use safext_core::formats::CompressionCodec;
///
/// assert_eq!(derive_name(Some("dir/notes.txt.GZ"), CompressionCodec::Gzip), "notes.txt");
/// assert_eq!(derive_name(Some("backup.tgz"), CompressionCodec::Gzip), "backup.tar");
/// assert_eq!(derive_name(Some("blob"), CompressionCodec::Xz), "blob.decompressed");
/// assert_eq!(derive_name(None, CompressionCodec::Zstd), "goextract-decompressed-content");
/// ```
#[must_use]
pub fn derive_name(source_name: Option<&str>, codec: CompressionCodec) -> String {
    let Some(name) = source_name else {
        return FALLBACK_NAME.to_string();
    };
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if base.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    let candidate = strip_suffix(base, codec)
        .unwrap_or_else(|| format!("{base}{DECOMPRESSED_SUFFIX}"));
    if check_output_name(&candidate).is_ok() {
        candidate
    } else {
        FALLBACK_NAME.to_string()
    }
}

fn strip_suffix(base: &str, codec: CompressionCodec) -> Option<String> {
    codec.suffixes().iter().find_map(|(suffix, replacement)| {
        let split = base.len().checked_sub(suffix.len())?;
        if split == 0 || !base.is_char_boundary(split) {
            return None;
        }
        let (stem, tail) = base.split_at(split);
        tail.eq_ignore_ascii_case(suffix)
            .then(|| format!("{stem}{replacement}"))
    })
}

/// Where a decompressed file goes: its directory and its file name.
///
/// When `dst` is an existing directory the name is derived from the input.
/// Otherwise `dst` is the output file itself and its parent must exist, or
/// is created when `create_destination` is set.
///
/// # Errors
///
/// `DestinationMissing` for a missing parent, `IllegalName` when `dst` has
/// no file name component, target I/O errors.
pub fn output_location(
    target: &dyn Target,
    dst: &Path,
    source_name: Option<&str>,
    codec: CompressionCodec,
    create_destination: bool,
    dir_mode: u32,
) -> Result<(PathBuf, String)> {
    let dst = if dst.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dst
    };
    if target.stat(dst)?.is_some_and(|meta| meta.is_dir()) {
        return Ok((dst.to_path_buf(), derive_name(source_name, codec)));
    }

    let name = dst
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ExtractionError::IllegalName {
            name: dst.display().to_string(),
            reason: crate::error::NameViolation::DotName,
        })?;
    let parent = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    super::engine::ensure_directory(target, parent, create_destination, dir_mode)?;
    Ok((parent.to_path_buf(), name.to_string()))
}
