//! 7z walker.
//!
//! The archive index is parsed up front. Extraction goes through
//! [`Walker::for_each_entry`], which decodes every block once and hands each
//! entry's stream to the visitor in archive order; entries without data
//! (directories, empty files) follow the blocks. Solid blocks share one
//! decoder, so content the visitor leaves unread is drained before the next
//! entry. [`Walker::open_current`] decodes a single entry on demand and, for
//! solid archives, re-decodes its block from the start.
//!
//! Symlinks cannot be read back through `sevenz-rust2`: entries flagged as a
//! Unix symlink or a Windows reparse point surface as unsupported.

use std::io;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;

use sevenz_rust2::Archive;
use sevenz_rust2::ArchiveReader;
use sevenz_rust2::Password;

use crate::ExtractionError;
use crate::Result;
use crate::formats::traits::ArchiveEntry;
use crate::formats::traits::EntryVisitor;
use crate::formats::traits::StreamedContent;
use crate::formats::traits::Walker;
use crate::formats::traits::normalize_name;
use crate::types::EntryKind;
use crate::types::kind_from_unix_mode;

const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0000_0400;
const FILE_ATTRIBUTE_UNIX_EXTENSION: u32 = 0x0000_8000;

/// Walker over a seekable 7z archive.
pub struct SevenZWalker<R: Read + Seek> {
    reader: ArchiveReader<R>,
    entries: std::vec::IntoIter<(String, ArchiveEntry)>,
    current: Option<(String, ArchiveEntry)>,
}

impl<R: Read + Seek> SevenZWalker<R> {
    /// Parses the archive index of `source`.
    ///
    /// # Errors
    ///
    /// `InvalidArchive` for corrupt or encrypted archives.
    pub fn new(mut source: R) -> Result<Self> {
        let archive = Archive::read(&mut source, &Password::empty()).map_err(sevenz_error)?;
        let entries: Vec<_> = archive
            .files
            .iter()
            .map(|raw| (raw.name.clone(), describe(raw)))
            .collect();

        source.rewind().map_err(ExtractionError::Io)?;
        let reader = ArchiveReader::new(source, Password::empty()).map_err(sevenz_error)?;

        Ok(Self {
            reader,
            entries: entries.into_iter(),
            current: None,
        })
    }
}

fn describe(raw: &sevenz_rust2::ArchiveEntry) -> ArchiveEntry {
    let name = normalize_name(&raw.name);
    let attributes = raw.has_windows_attributes.then_some(raw.windows_attributes);
    let unix_mode = attributes
        .filter(|attrs| attrs & FILE_ATTRIBUTE_UNIX_EXTENSION != 0)
        .map(|attrs| attrs >> 16);

    let kind = if raw.is_anti_item {
        EntryKind::unsupported("anti-item")
    } else if attributes.is_some_and(|attrs| attrs & FILE_ATTRIBUTE_REPARSE_POINT != 0) {
        EntryKind::unsupported("reparse point")
    } else if raw.is_directory() {
        EntryKind::Directory
    } else {
        match unix_mode.and_then(kind_from_unix_mode) {
            Some(EntryKind::Symlink) => EntryKind::unsupported("symlink"),
            Some(kind) => kind,
            None => EntryKind::File,
        }
    };

    let mut entry = ArchiveEntry::new(name, kind);
    entry.size = raw.size;
    entry.mode = unix_mode.map(|mode| mode & 0o7777).filter(|mode| *mode != 0);
    entry
}

fn sevenz_error(err: sevenz_rust2::Error) -> ExtractionError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        return ExtractionError::InvalidArchive(format!(
            "7z: encrypted archives are not supported ({message})"
        ));
    }
    ExtractionError::InvalidArchive(format!("7z: {message}"))
}

impl<R: Read + Seek> Walker for SevenZWalker<R> {
    fn archive_type(&self) -> &str {
        "7z"
    }

    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        self.current = self.entries.next();
        Ok(self.current.as_ref().map(|(_, entry)| entry.clone()))
    }

    fn open_current(&mut self) -> Result<Box<dyn Read + '_>> {
        let Some((raw_name, _)) = self.current.as_ref() else {
            return Err(ExtractionError::InvalidArchive(
                "7z: no current entry".into(),
            ));
        };
        let data = self.reader.read_file(raw_name).map_err(sevenz_error)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let mut failure = None;
        let decoded = self.reader.for_each_entries(|raw, content| {
            let entry = describe(raw);
            if let Err(err) = visit(&entry, &mut StreamedContent(&mut *content)) {
                failure = Some(err);
                return Ok(false);
            }
            io::copy(content, &mut io::sink())?;
            Ok(true)
        });
        self.current = None;
        self.entries = Vec::new().into_iter();
        match failure {
            Some(err) => Err(err),
            None => decoded.map_err(sevenz_error),
        }
    }
}
