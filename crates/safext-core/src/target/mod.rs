//! Filesystem targets extraction writes into.
//!
//! A [`Target`] performs raw operations on native paths. The extraction
//! driver never calls it directly; every mutation goes through
//! [`Sandbox`], which re-runs the path guard before delegating.

use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use crate::Result;

pub mod disk;
pub mod memory;
pub mod platform;
pub mod sandbox;

pub use disk::DiskTarget;
pub use memory::MemoryTarget;
pub use sandbox::Sandbox;

/// Kind of an existing filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (only reported by [`Target::lstat`]).
    Symlink,
    /// Anything else: sockets, devices, FIFOs.
    Other,
}

/// Subset of file metadata the extraction core looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Object kind.
    pub kind: FileKind,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits.
    pub mode: u32,
    /// Modification time, when known.
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    /// Whether this is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Whether this is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Whether this is a symlink.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

/// Destination filesystem.
///
/// Implementations must behave identically from the caller's point of view;
/// the disk and in-memory targets run the same conformance tests below.
pub trait Target: Send + Sync {
    /// Creates a regular file at `path` with the content of `content`.
    ///
    /// An existing non-directory is replaced only when `overwrite` is set.
    /// Writing stops with `LimitExceeded` after `max_size` bytes and the
    /// partial file is removed. Returns the number of bytes written.
    fn create_file(
        &self,
        path: &Path,
        content: &mut dyn Read,
        mode: u32,
        overwrite: bool,
        max_size: Option<u64>,
    ) -> Result<u64>;

    /// Creates a directory. Succeeds if one already exists.
    fn create_dir(&self, path: &Path, mode: u32) -> Result<()>;

    /// Creates `link` pointing at `target`.
    fn create_symlink(&self, target: &Path, link: &Path, overwrite: bool) -> Result<()>;

    /// Metadata without following a final symlink; `None` when absent.
    fn lstat(&self, path: &Path) -> Result<Option<FileMetadata>>;

    /// Metadata following symlinks; `None` when absent.
    fn stat(&self, path: &Path) -> Result<Option<FileMetadata>>;

    /// Sets permission bits.
    fn chmod(&self, path: &Path, mode: u32) -> Result<()>;

    /// Sets access and modification times, following symlinks.
    fn chtimes(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<()>;

    /// Sets times on a symlink itself.
    fn lchtimes(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<()>;

    /// Sets ownership without following a final symlink.
    fn chown(&self, path: &Path, uid: Option<u64>, gid: Option<u64>) -> Result<()>;

    /// Whether [`lchtimes`](Self::lchtimes) is meaningful here.
    fn can_preserve_symlink_times(&self) -> bool;
}
