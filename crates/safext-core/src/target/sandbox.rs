//! Guarded view of a [`Target`] rooted at the destination.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::Result;
use crate::logger::Logger;
use crate::security::PathGuard;
use crate::target::FileMetadata;
use crate::target::Target;
use crate::types::DestDir;
use crate::types::SafePath;

/// Mutations on a target, each preceded by a fresh guard check.
///
/// Callers hand in root-relative [`SafePath`]s. Before any create call the
/// sandbox re-derives the parent chain and re-checks it, so a symlink planted
/// after the name was resolved still cannot be written through. Directories
/// this sandbox created are remembered to avoid redundant creation calls.
pub struct Sandbox<'a> {
    target: &'a dyn Target,
    guard: PathGuard<'a>,
    dir_mode: u32,
    created: RefCell<HashSet<SafePath>>,
}

impl<'a> Sandbox<'a> {
    /// Wraps `target` for extraction under `root`.
    pub fn new(
        target: &'a dyn Target,
        root: &'a DestDir,
        traverse_symlinks: bool,
        dir_mode: u32,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            target,
            guard: PathGuard::new(target, root, traverse_symlinks, logger),
            dir_mode,
            created: RefCell::new(HashSet::new()),
        }
    }

    /// The path guard in use.
    #[must_use]
    pub const fn guard(&self) -> &PathGuard<'a> {
        &self.guard
    }

    /// Native path of `path`.
    #[must_use]
    pub fn native(&self, path: &SafePath) -> PathBuf {
        self.guard.root().join(path)
    }

    /// Creates one directory.
    ///
    /// # Errors
    ///
    /// Guard failures, or `AlreadyExists` when a non-directory is in the way.
    pub fn create_dir(&self, path: &SafePath, mode: u32) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        self.guard.revalidate(path)?;
        let native = self.native(path);
        // An existing symlink to a directory is only used when traversal
        // was explicitly allowed.
        let followed = self.guard.traverses_symlinks()
            && self.target.lstat(&native)?.is_some_and(|meta| meta.is_symlink())
            && self.target.stat(&native)?.is_some_and(|meta| meta.is_dir());
        if !followed {
            self.target.create_dir(&native, mode)?;
        }
        self.created.borrow_mut().insert(path.clone());
        Ok(())
    }

    /// Creates `path` and all missing ancestors with the default mode.
    ///
    /// # Errors
    ///
    /// As for [`create_dir`](Self::create_dir).
    pub fn create_dir_all(&self, path: &SafePath) -> Result<()> {
        for dir in path.ancestors().iter().chain(std::iter::once(path)) {
            if self.created.borrow().contains(dir) {
                continue;
            }
            self.create_dir(dir, self.dir_mode)?;
        }
        Ok(())
    }

    fn prepare_parent(&self, path: &SafePath) -> Result<()> {
        self.guard.revalidate(path)?;
        match path.parent() {
            Some(parent) => self.create_dir_all(&parent),
            None => Ok(()),
        }
    }

    /// Creates a regular file, creating missing parents first.
    ///
    /// # Errors
    ///
    /// Guard failures and whatever the target reports.
    pub fn create_file(
        &self,
        path: &SafePath,
        content: &mut dyn Read,
        mode: u32,
        overwrite: bool,
        max_size: Option<u64>,
    ) -> Result<u64> {
        self.prepare_parent(path)?;
        self.target
            .create_file(&self.native(path), content, mode, overwrite, max_size)
    }

    /// Creates a symlink after checking its target stays inside the root.
    ///
    /// # Errors
    ///
    /// Guard failures and whatever the target reports.
    pub fn create_symlink(&self, link: &SafePath, target: &str, overwrite: bool) -> Result<()> {
        self.prepare_parent(link)?;
        self.guard.check_link_target(link, target)?;
        self.target
            .create_symlink(Path::new(target), &self.native(link), overwrite)
    }

    /// Metadata of `path` without following a final symlink.
    ///
    /// # Errors
    ///
    /// Target I/O errors.
    pub fn lstat(&self, path: &SafePath) -> Result<Option<FileMetadata>> {
        self.target.lstat(&self.native(path))
    }

    /// Sets permission bits.
    ///
    /// # Errors
    ///
    /// Target I/O errors.
    pub fn chmod(&self, path: &SafePath, mode: u32) -> Result<()> {
        self.target.chmod(&self.native(path), mode)
    }

    /// Sets times, on the link itself for symlinks where supported.
    ///
    /// # Errors
    ///
    /// Target I/O errors.
    pub fn set_times(
        &self,
        path: &SafePath,
        symlink: bool,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        if accessed.is_none() && modified.is_none() {
            return Ok(());
        }
        let native = self.native(path);
        if symlink {
            if self.target.can_preserve_symlink_times() {
                self.target.lchtimes(&native, accessed, modified)?;
            }
            Ok(())
        } else {
            self.target.chtimes(&native, accessed, modified)
        }
    }

    /// Sets ownership of `path` itself.
    ///
    /// # Errors
    ///
    /// Target I/O errors.
    pub fn chown(&self, path: &SafePath, uid: Option<u64>, gid: Option<u64>) -> Result<()> {
        if uid.is_none() && gid.is_none() {
            return Ok(());
        }
        self.target.chown(&self.native(path), uid, gid)
    }
}
