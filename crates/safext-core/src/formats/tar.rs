//! Tar walker.

use std::io;
use std::io::Read;

use crate::ExtractionError;
use crate::Result;
use crate::error::NameViolation;
use crate::formats::time::from_unix_seconds;
use crate::formats::traits::ArchiveEntry;
use crate::formats::traits::Walker;
use crate::formats::traits::normalize_name;
use crate::types::EntryKind;

/// Walks a [`tar::Archive`] borrowed for the walker's lifetime.
///
/// GNU long names and PAX headers are folded into the entries by the `tar`
/// crate; global PAX headers are skipped.
///
/// # Examples
///
/// ```
/// use safext_core::formats::{TarWalker, Walker};
/// use safext_core::test_utils::TarTestBuilder;
///
/// let data = TarTestBuilder::new().add_file("a.txt", b"hi").build();
/// let mut archive = tar::Archive::new(&data[..]);
/// let mut walker = TarWalker::new(&mut archive, "tar")?;
/// let entry = walker.next_entry()?.expect("one entry");
/// assert_eq!(entry.name, "a.txt");
/// # Ok::<(), safext_core::ExtractionError>(())
/// ```
pub struct TarWalker<'a, R: 'a + Read> {
    label: String,
    entries: tar::Entries<'a, R>,
    current: Option<tar::Entry<'a, R>>,
}

impl<'a, R: 'a + Read> TarWalker<'a, R> {
    /// Starts walking `archive`, reporting `label` as its type.
    pub fn new(archive: &'a mut tar::Archive<R>, label: impl Into<String>) -> Result<Self> {
        let entries = archive.entries().map_err(tar_error)?;
        Ok(Self {
            label: label.into(),
            entries,
            current: None,
        })
    }
}

/// Keeps limit and decoder markers, reports everything else as corruption.
fn tar_error(err: io::Error) -> ExtractionError {
    match ExtractionError::from(err) {
        ExtractionError::Io(e) => ExtractionError::InvalidArchive(format!("tar: {e}")),
        other => other,
    }
}

fn kind_of(entry_type: tar::EntryType) -> Option<EntryKind> {
    use tar::EntryType as T;

    Some(match entry_type {
        T::Regular | T::Continuous | T::GNUSparse => EntryKind::File,
        T::Directory => EntryKind::Directory,
        T::Symlink => EntryKind::Symlink,
        T::Link => EntryKind::unsupported("hard link"),
        T::Char => EntryKind::unsupported("character device"),
        T::Block => EntryKind::unsupported("block device"),
        T::Fifo => EntryKind::unsupported("FIFO"),
        T::XGlobalHeader => return None,
        other => EntryKind::unsupported(format!("tar entry type {:#x}", other.as_byte())),
    })
}

/// Decodes a header string, keeping a lossy copy for logging when the bytes
/// are not UTF-8.
fn decode(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_owned(), true),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), false),
    }
}

fn describe<R: Read>(entry: &tar::Entry<'_, R>, kind: EntryKind) -> ArchiveEntry {
    let header = entry.header();
    let (name, name_ok) = decode(&entry.path_bytes());
    let mut described = ArchiveEntry::new(normalize_name(&name), kind);
    if !name_ok {
        described.name_violation = Some(NameViolation::NotUtf8);
    }
    described.size = entry.size();
    described.mode = header.mode().ok().map(|mode| mode & 0o7777);
    described.modified = header
        .mtime()
        .ok()
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(from_unix_seconds);
    described.accessed = header
        .as_gnu()
        .and_then(|gnu| gnu.atime().ok())
        .filter(|secs| *secs > 0)
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(from_unix_seconds);
    described.uid = header.uid().ok();
    described.gid = header.gid().ok();
    if described.kind.is_symlink()
        && let Some(bytes) = entry.link_name_bytes()
    {
        let (target, target_ok) = decode(&bytes);
        if !target_ok {
            described.name_violation = Some(NameViolation::NotUtf8);
        }
        described.link_target = Some(target);
    }
    described
}

impl<'a, R: 'a + Read> Walker for TarWalker<'a, R> {
    fn archive_type(&self) -> &str {
        &self.label
    }

    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        self.current = None;
        loop {
            let Some(next) = self.entries.next() else {
                return Ok(None);
            };
            let entry = next.map_err(tar_error)?;
            let Some(kind) = kind_of(entry.header().entry_type()) else {
                continue;
            };
            let described = describe(&entry, kind);
            self.current = Some(entry);
            return Ok(Some(described));
        }
    }

    fn open_current(&mut self) -> Result<Box<dyn Read + '_>> {
        match self.current.as_mut() {
            Some(entry) => Ok(Box::new(entry)),
            None => Err(ExtractionError::InvalidArchive(
                "tar: no current entry".into(),
            )),
        }
    }
}
