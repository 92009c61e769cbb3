//! Rar walker on top of the `unrar` bindings.
//!
//! `unrar` opens archives by path, so the input is always spooled to a
//! temporary file first. The library cursor is a typestate; the walker keeps
//! whichever state it is in and advances it on demand.

use std::io::Cursor;
use std::io::Read;
use std::mem;
use std::path::Path;

use unrar::CursorBeforeFile;
use unrar::CursorBeforeHeader;
use unrar::OpenArchive;
use unrar::Process;

use crate::ExtractionError;
use crate::Result;
use crate::formats::time::from_dos;
use crate::formats::traits::ArchiveEntry;
use crate::formats::traits::Walker;
use crate::formats::traits::normalize_name;
use crate::types::EntryKind;
use crate::types::kind_from_unix_mode;

const UNIX_TYPE_MASK: u32 = 0o170_000;

enum RarCursor {
    Header(OpenArchive<Process, CursorBeforeHeader>),
    File(OpenArchive<Process, CursorBeforeFile>),
    Done,
}

/// Walker over a rar archive on disk.
pub struct RarWalker {
    cursor: RarCursor,
}

impl RarWalker {
    /// Opens the archive at `path`.
    ///
    /// # Errors
    ///
    /// `InvalidArchive` when `unrar` refuses the file.
    pub fn open(path: &Path) -> Result<Self> {
        let archive = unrar::Archive::new(path)
            .open_for_processing()
            .map_err(rar_error)?;
        Ok(Self {
            cursor: RarCursor::Header(archive),
        })
    }
}

fn rar_error(err: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::InvalidArchive(format!("rar: {err}"))
}

fn describe(header: &unrar::FileHeader) -> ArchiveEntry {
    let name = normalize_name(&header.filename.to_string_lossy());
    // Archives made on Unix carry st_mode; Windows ones carry DOS attributes.
    let unix_mode = (header.file_attr & UNIX_TYPE_MASK != 0 && header.file_attr <= 0xffff)
        .then_some(header.file_attr);

    let kind = if header.is_directory() {
        EntryKind::Directory
    } else {
        match unix_mode.and_then(kind_from_unix_mode) {
            Some(EntryKind::Symlink) => EntryKind::unsupported("symlink"),
            Some(EntryKind::Directory) | None => EntryKind::File,
            Some(kind) => kind,
        }
    };

    let mut entry = ArchiveEntry::new(name, kind);
    entry.size = header.unpacked_size;
    entry.mode = unix_mode.map(|mode| mode & 0o7777);
    entry.modified = from_dos(header.file_time);
    entry
}

impl Walker for RarWalker {
    fn archive_type(&self) -> &str {
        "rar"
    }

    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        let before_header = match mem::replace(&mut self.cursor, RarCursor::Done) {
            RarCursor::Header(archive) => archive,
            RarCursor::File(archive) => archive.skip().map_err(rar_error)?,
            RarCursor::Done => return Ok(None),
        };
        match before_header.read_header().map_err(rar_error)? {
            None => Ok(None),
            Some(file) => {
                let entry = describe(file.entry());
                self.cursor = RarCursor::File(file);
                Ok(Some(entry))
            }
        }
    }

    fn open_current(&mut self) -> Result<Box<dyn Read + '_>> {
        let file = match mem::replace(&mut self.cursor, RarCursor::Done) {
            RarCursor::File(file) => file,
            other => {
                self.cursor = other;
                return Err(ExtractionError::InvalidArchive(
                    "rar: no current entry".into(),
                ));
            }
        };
        let (data, next) = file.read().map_err(rar_error)?;
        self.cursor = RarCursor::Header(next);
        Ok(Box::new(Cursor::new(data)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_garbage_is_invalid_archive() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Rar!\x1a\x07\x00garbage").unwrap();
        file.flush().unwrap();
        let result = RarWalker::open(file.path());
        let walked = result.and_then(|mut walker| walker.next_entry());
        assert!(matches!(walked, Err(ExtractionError::InvalidArchive(_))));
    }

    #[test]
    fn test_missing_file_is_invalid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let result = RarWalker::open(&dir.path().join("absent.rar"));
        let walked = result.and_then(|mut walker| walker.next_entry());
        assert!(walked.is_err());
    }
}
