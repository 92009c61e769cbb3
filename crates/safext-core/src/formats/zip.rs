//! Zip walker.

use std::io::Read;
use std::io::Seek;

use zip::ZipArchive;

use crate::ExtractionError;
use crate::Result;
use crate::formats::time::from_civil;
use crate::formats::traits::ArchiveEntry;
use crate::formats::traits::Walker;
use crate::formats::traits::normalize_name;
use crate::types::EntryKind;
use crate::types::kind_from_unix_mode;

/// Walker over a seekable zip archive.
///
/// Symlink targets are stored as entry content in zip, so
/// [`ArchiveEntry::link_target`] is left empty and the driver reads the
/// target through [`open_current`](Walker::open_current).
pub struct ZipWalker<R: Read + Seek> {
    archive: ZipArchive<R>,
    next: usize,
    current: Option<usize>,
}

impl<R: Read + Seek> ZipWalker<R> {
    /// Reads the central directory of `reader`.
    ///
    /// # Errors
    ///
    /// `InvalidArchive` when the central directory cannot be parsed.
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
            next: 0,
            current: None,
        })
    }
}

impl<R: Read + Seek> Walker for ZipWalker<R> {
    fn archive_type(&self) -> &str {
        "zip"
    }

    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        if self.next >= self.archive.len() {
            self.current = None;
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;
        self.current = Some(index);

        let file = self.archive.by_index_raw(index)?;
        let unix_mode = file.unix_mode();
        let kind = if file.encrypted() {
            EntryKind::unsupported("encrypted entry")
        } else if file.is_dir() {
            EntryKind::Directory
        } else {
            unix_mode
                .and_then(kind_from_unix_mode)
                .unwrap_or(EntryKind::File)
        };

        let mut entry = ArchiveEntry::new(normalize_name(file.name()), kind);
        entry.size = file.size();
        entry.mode = unix_mode.map(|mode| mode & 0o7777);
        entry.modified = file.last_modified().and_then(|stamp| {
            from_civil(
                i32::from(stamp.year()),
                u32::from(stamp.month()),
                u32::from(stamp.day()),
                u32::from(stamp.hour()),
                u32::from(stamp.minute()),
                u32::from(stamp.second()),
            )
        });
        Ok(Some(entry))
    }

    fn open_current(&mut self) -> Result<Box<dyn Read + '_>> {
        let index = self
            .current
            .ok_or_else(|| ExtractionError::InvalidArchive("zip: no current entry".into()))?;
        Ok(Box::new(self.archive.by_index(index)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_utils::ZipTestBuilder;
    use std::io::Cursor;

    #[test]
    fn test_entries_and_modes() {
        let data = ZipTestBuilder::new()
            .add_file_with_mode("test", b"hello", 0o640)
            .add_directory("sub/")
            .add_symlink("link", "test")
            .build();
        let mut walker = ZipWalker::new(Cursor::new(data)).unwrap();
        assert_eq!(walker.archive_type(), "zip");

        let file = walker.next_entry().unwrap().unwrap();
        assert_eq!(file.name, "test");
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.mode, Some(0o640));
        assert_eq!(file.size, 5);

        let dir = walker.next_entry().unwrap().unwrap();
        assert_eq!(dir.kind, EntryKind::Directory);

        let link = walker.next_entry().unwrap().unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
        assert!(link.link_target.is_none());
        let mut target = String::new();
        walker
            .open_current()
            .unwrap()
            .read_to_string(&mut target)
            .unwrap();
        assert_eq!(target, "test");

        assert!(walker.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_backslash_names_are_normalized() {
        let data = ZipTestBuilder::new()
            .add_file("dir\\file.txt", b"x")
            .build();
        let mut walker = ZipWalker::new(Cursor::new(data)).unwrap();
        let entry = walker.next_entry().unwrap().unwrap();
        assert_eq!(entry.name, "dir/file.txt");
    }

    #[test]
    fn test_modified_time_is_carried() {
        let data = ZipTestBuilder::new().add_file("a", b"x").build();
        let mut walker = ZipWalker::new(Cursor::new(data)).unwrap();
        let entry = walker.next_entry().unwrap().unwrap();
        assert!(entry.modified.is_some());
    }

    #[test]
    fn test_not_a_zip() {
        let result = ZipWalker::new(Cursor::new(b"PK\x03\x04 not really".to_vec()));
        assert!(matches!(result, Err(ExtractionError::InvalidArchive(_))));
    }
}
