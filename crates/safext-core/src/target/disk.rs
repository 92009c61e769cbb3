//! Target backed by the host filesystem.

use std::fs;
use std::io;
use std::io::BufWriter;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use filetime::FileTime;

use crate::ExtractionError;
use crate::LimitKind;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::io::LimitedWriter;
use crate::target::FileKind;
use crate::target::FileMetadata;
use crate::target::Target;
use crate::target::platform;

/// Writes through native OS calls.
///
/// Ownership changes are skipped when the process is not privileged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskTarget;

impl DiskTarget {
    /// Creates a disk target.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn metadata_of(meta: &fs::Metadata) -> FileMetadata {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        FileKind::Symlink
    } else if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    };
    FileMetadata {
        kind,
        size: meta.len(),
        mode: platform::mode_of(meta),
        modified: meta.modified().ok(),
    }
}

fn optional(result: io::Result<fs::Metadata>) -> Result<Option<FileMetadata>> {
    match result {
        Ok(meta) => Ok(Some(metadata_of(&meta))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

/// Clears `path` for a new non-directory object.
fn make_room(path: &Path, overwrite: bool) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() || !overwrite => Err(ExtractionError::AlreadyExists {
            path: path.to_path_buf(),
        }),
        Ok(_) => fs::remove_file(path).map_err(ExtractionError::Io),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

fn already_exists(path: &Path, err: io::Error) -> ExtractionError {
    if err.kind() == io::ErrorKind::AlreadyExists {
        ExtractionError::AlreadyExists {
            path: path.to_path_buf(),
        }
    } else {
        ExtractionError::Io(err)
    }
}

/// Fills in a missing timestamp from the other one.
fn file_times(
    accessed: Option<SystemTime>,
    modified: Option<SystemTime>,
) -> Option<(FileTime, FileTime)> {
    let accessed = accessed.or(modified)?;
    let modified = modified.unwrap_or(accessed);
    Some((
        FileTime::from_system_time(accessed),
        FileTime::from_system_time(modified),
    ))
}

impl Target for DiskTarget {
    fn create_file(
        &self,
        path: &Path,
        content: &mut dyn Read,
        mode: u32,
        overwrite: bool,
        max_size: Option<u64>,
    ) -> Result<u64> {
        make_room(path, overwrite)?;
        let file = platform::create_new(path, mode).map_err(|e| already_exists(path, e))?;

        let mut writer = LimitedWriter::new(BufWriter::new(file), max_size, LimitKind::ExtractionSize);
        let mut buffer = CopyBuffer::new();
        match copy_with_buffer(content, &mut writer, &mut buffer) {
            Ok(written) => Ok(written),
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(path);
                Err(ExtractionError::from(e))
            }
        }
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<()> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(ExtractionError::AlreadyExists {
                    path: path.to_path_buf(),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ExtractionError::Io(e)),
        }
        match platform::create_dir(path, mode) {
            Ok(()) => Ok(()),
            // Lost a race against another creator of the same directory.
            Err(e)
                if e.kind() == io::ErrorKind::AlreadyExists
                    && fs::symlink_metadata(path).is_ok_and(|m| m.is_dir()) =>
            {
                Ok(())
            }
            Err(e) => Err(already_exists(path, e)),
        }
    }

    fn create_symlink(&self, target: &Path, link: &Path, overwrite: bool) -> Result<()> {
        make_room(link, overwrite)?;
        platform::symlink(target, link).map_err(|e| already_exists(link, e))
    }

    fn lstat(&self, path: &Path) -> Result<Option<FileMetadata>> {
        optional(fs::symlink_metadata(path))
    }

    fn stat(&self, path: &Path) -> Result<Option<FileMetadata>> {
        optional(fs::metadata(path))
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        platform::set_mode(path, mode).map_err(ExtractionError::Io)
    }

    fn chtimes(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        let Some((atime, mtime)) = file_times(accessed, modified) else {
            return Ok(());
        };
        filetime::set_file_times(path, atime, mtime).map_err(ExtractionError::Io)
    }

    fn lchtimes(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        if !platform::can_preserve_symlink_times() {
            return Ok(());
        }
        let Some((atime, mtime)) = file_times(accessed, modified) else {
            return Ok(());
        };
        filetime::set_symlink_file_times(path, atime, mtime).map_err(ExtractionError::Io)
    }

    fn chown(&self, path: &Path, uid: Option<u64>, gid: Option<u64>) -> Result<()> {
        if !platform::is_privileged() {
            return Ok(());
        }
        platform::lchown(path, uid, gid).map_err(ExtractionError::Io)
    }

    fn can_preserve_symlink_times(&self) -> bool {
        platform::can_preserve_symlink_times()
    }
}
