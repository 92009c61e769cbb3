//! Archive entry kinds.

use std::fmt;

/// Kind of an archive entry, unified across formats.
///
/// # Examples
///
/// ```
/// use safext_core::types::EntryKind;
///
/// let fifo = EntryKind::Unsupported {
///     reason: "FIFO".to_string(),
/// };
/// assert!(!fifo.is_supported());
/// assert!(EntryKind::Symlink.is_supported());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,

    /// Directory.
    Directory,

    /// Symbolic link. The target travels separately in the entry, or is the
    /// entry content for formats that store it that way.
    Symlink,

    /// Anything that cannot be materialized: devices, FIFOs, hard links,
    /// symlink-looking entries whose target is unavailable.
    Unsupported {
        /// Human readable kind.
        reason: String,
    },
}

impl EntryKind {
    /// Shorthand for [`EntryKind::Unsupported`].
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` if this is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` if this is a symlink.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }

    /// Returns `false` for [`EntryKind::Unsupported`].
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
            Self::Symlink => f.write_str("symlink"),
            Self::Unsupported { reason } => f.write_str(reason),
        }
    }
}

/// Maps Unix `st_mode` file-type bits to an entry kind.
///
/// Used by formats that store a Unix mode alongside their own flags (zip
/// external attributes, 7z and rar attribute high words).
#[must_use]
pub fn kind_from_unix_mode(mode: u32) -> Option<EntryKind> {
    const S_IFMT: u32 = 0o170_000;
    match mode & S_IFMT {
        0 => None,
        0o100_000 => Some(EntryKind::File),
        0o040_000 => Some(EntryKind::Directory),
        0o120_000 => Some(EntryKind::Symlink),
        0o010_000 => Some(EntryKind::unsupported("FIFO")),
        0o020_000 => Some(EntryKind::unsupported("character device")),
        0o060_000 => Some(EntryKind::unsupported("block device")),
        0o140_000 => Some(EntryKind::unsupported("socket")),
        _ => Some(EntryKind::unsupported("unknown file type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(EntryKind::File.is_file());
        assert!(EntryKind::Directory.is_directory());
        assert!(EntryKind::Symlink.is_symlink());
        assert!(!EntryKind::unsupported("hard link").is_supported());
    }

    #[test]
    fn test_display() {
        assert_eq!(EntryKind::unsupported("FIFO").to_string(), "FIFO");
        assert_eq!(EntryKind::Directory.to_string(), "directory");
    }

    #[test]
    fn test_kind_from_unix_mode() {
        assert_eq!(kind_from_unix_mode(0o100_644), Some(EntryKind::File));
        assert_eq!(kind_from_unix_mode(0o040_755), Some(EntryKind::Directory));
        assert_eq!(kind_from_unix_mode(0o120_777), Some(EntryKind::Symlink));
        assert_eq!(
            kind_from_unix_mode(0o020_666),
            Some(EntryKind::unsupported("character device"))
        );
        assert_eq!(kind_from_unix_mode(0o644), None);
    }
}
