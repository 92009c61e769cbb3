//! Buffering of non-seekable input for formats that need random access.

use std::io;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;

/// Input captured in full, either in memory or in a temporary file that is
/// deleted on drop.
#[derive(Debug)]
pub enum Spool {
    /// Bytes kept in memory.
    Memory(Cursor<Vec<u8>>),
    /// Bytes written to an anonymous-looking temporary file.
    Disk(NamedTempFile),
}

impl Spool {
    /// Drains `reader` into memory or into a temporary file.
    pub fn capture<R: Read>(reader: &mut R, in_memory: bool) -> io::Result<Self> {
        let mut buffer = CopyBuffer::new();
        if in_memory {
            let mut data = Vec::new();
            copy_with_buffer(reader, &mut data, &mut buffer)?;
            return Ok(Self::Memory(Cursor::new(data)));
        }
        Self::capture_to_disk(reader, &mut buffer)
    }

    /// Drains `reader` into a temporary file; for decoders that only accept
    /// a path.
    pub fn capture_file<R: Read>(reader: &mut R) -> io::Result<Self> {
        Self::capture_to_disk(reader, &mut CopyBuffer::new())
    }

    fn capture_to_disk<R: Read>(reader: &mut R, buffer: &mut CopyBuffer) -> io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        copy_with_buffer(reader, file.as_file_mut(), buffer)?;
        file.as_file_mut().seek(SeekFrom::Start(0))?;
        Ok(Self::Disk(file))
    }

    /// Path of the backing file, if the spool lives on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Memory(_) => None,
            Self::Disk(file) => Some(file.path()),
        }
    }

    /// Captured length in bytes.
    pub fn len(&self) -> io::Result<u64> {
        match self {
            Self::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
            Self::Disk(file) => Ok(file.as_file().metadata()?.len()),
        }
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| len == 0)
    }
}

impl Read for Spool {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::Disk(file) => file.as_file_mut().read(buf),
        }
    }
}

impl Seek for Spool {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::Disk(file) => file.as_file_mut().seek(pos),
        }
    }
}
