//! In-memory target.
//!
//! Paths are kept in a map from absolute, lexically clean path to node. The
//! map and every node carry their own `RwLock`, so several extractions (and
//! readers) may share one instance. Relative paths are taken relative to
//! `/`.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::io::Read;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use crate::ExtractionError;
use crate::LimitKind;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::io::LimitedWriter;
use crate::target::FileKind;
use crate::target::FileMetadata;
use crate::target::Target;

/// Symlinks followed while resolving one path before giving up.
pub const MAX_SYMLINK_HOPS: usize = 256;

#[derive(Debug)]
enum Content {
    File(Vec<u8>),
    Directory,
    Symlink(PathBuf),
}

#[derive(Debug, Clone, Copy, Default)]
struct Attributes {
    mode: u32,
    modified: Option<SystemTime>,
    accessed: Option<SystemTime>,
    uid: Option<u64>,
    gid: Option<u64>,
}

#[derive(Debug)]
struct Node {
    content: RwLock<Content>,
    attributes: RwLock<Attributes>,
    readers: AtomicUsize,
}

impl Node {
    fn new(content: Content, mode: u32) -> Arc<Self> {
        Arc::new(Self {
            content: RwLock::new(content),
            attributes: RwLock::new(Attributes {
                mode: mode & 0o7777,
                modified: Some(SystemTime::now()),
                ..Attributes::default()
            }),
            readers: AtomicUsize::new(0),
        })
    }

    fn metadata(&self) -> io::Result<FileMetadata> {
        let content = self.content.read().map_err(|_| poisoned())?;
        let attributes = self.attributes.read().map_err(|_| poisoned())?;
        let (kind, size) = match &*content {
            Content::File(data) => (FileKind::File, data.len() as u64),
            Content::Directory => (FileKind::Directory, 0),
            Content::Symlink(target) => (FileKind::Symlink, target.as_os_str().len() as u64),
        };
        Ok(FileMetadata {
            kind,
            size,
            mode: attributes.mode,
            modified: attributes.modified,
        })
    }

    fn is_dir(&self) -> io::Result<bool> {
        Ok(matches!(
            *self.content.read().map_err(|_| poisoned())?,
            Content::Directory
        ))
    }

    fn symlink_target(&self) -> io::Result<Option<PathBuf>> {
        match &*self.content.read().map_err(|_| poisoned())? {
            Content::Symlink(target) => Ok(Some(target.clone())),
            _ => Ok(None),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Attributes)) -> io::Result<()> {
        let mut attributes = self.attributes.write().map_err(|_| poisoned())?;
        apply(&mut attributes);
        Ok(())
    }
}

fn poisoned() -> io::Error {
    io::Error::other("memory target lock poisoned")
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

type NodeMap = HashMap<PathBuf, Arc<Node>>;

/// Filesystem tree held in memory.
///
/// Besides the [`Target`] operations it offers read access for inspecting
/// extraction results.
///
/// # Examples
///
/// ```
/// use safext_core::target::{MemoryTarget, Target};
/// use std::path::Path;
///
/// let fs = MemoryTarget::new();
/// fs.create_dir(Path::new("/out"), 0o755)?;
/// fs.create_file(Path::new("/out/a.txt"), &mut &b"hi"[..], 0o644, false, None)?;
/// assert_eq!(fs.read_file("/out/a.txt")?, b"hi");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct MemoryTarget {
    nodes: RwLock<NodeMap>,
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader over a file of a [`MemoryTarget`].
///
/// While it is alive [`MemoryTarget::remove`] refuses the file. An
/// overwriting [`Target::create_file`] or [`Target::create_symlink`] still
/// goes ahead and the reader keeps the old content, as an unlinked file on
/// disk would.
#[derive(Debug)]
pub struct MemoryFile {
    node: Arc<Node>,
    position: usize,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let content = self.node.content.read().map_err(|_| poisoned())?;
        let Content::File(data) = &*content else {
            return Ok(0);
        };
        let remaining = data.get(self.position..).unwrap_or_default();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.node.readers.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Lexically cleaned absolute form of `path`, `..` not applied.
fn components(path: &Path) -> VecDeque<OsString> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_os_string()),
            Component::ParentDir => Some(OsString::from("..")),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

impl MemoryTarget {
    /// Empty tree containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(PathBuf::from("/"), Node::new(Content::Directory, 0o755));
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Resolves `path` against the tree, following intermediate symlinks and
    /// the final one when `follow_final` is set.
    ///
    /// Missing components are kept lexically so callers can create them. A
    /// regular file in the middle of the path is `NotADirectory`.
    fn resolve(nodes: &NodeMap, path: &Path, follow_final: bool) -> io::Result<PathBuf> {
        let mut pending = components(path);
        let mut resolved = PathBuf::from("/");
        let mut hops = 0usize;

        while let Some(component) = pending.pop_front() {
            if component == ".." {
                resolved.pop();
                continue;
            }
            let candidate = resolved.join(&component);
            let is_final = pending.is_empty();
            let Some(node) = nodes.get(&candidate) else {
                resolved = candidate;
                continue;
            };
            match &*node.content.read().map_err(|_| poisoned())? {
                Content::Symlink(target) if !is_final || follow_final => {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(io::Error::other(format!(
                            "too many levels of symbolic links: {}",
                            path.display()
                        )));
                    }
                    if target.has_root() {
                        resolved = PathBuf::from("/");
                    }
                    for part in components(target).into_iter().rev() {
                        pending.push_front(part);
                    }
                }
                Content::File(_) if !is_final => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("not a directory: {}", candidate.display()),
                    ));
                }
                _ => resolved = candidate,
            }
        }
        Ok(resolved)
    }

    fn read_nodes(&self) -> io::Result<std::sync::RwLockReadGuard<'_, NodeMap>> {
        self.nodes.read().map_err(|_| poisoned())
    }

    fn write_nodes(&self) -> io::Result<std::sync::RwLockWriteGuard<'_, NodeMap>> {
        self.nodes.write().map_err(|_| poisoned())
    }

    fn lookup(&self, path: &Path, follow_final: bool) -> io::Result<Option<(PathBuf, Arc<Node>)>> {
        let nodes = self.read_nodes()?;
        let resolved = Self::resolve(&nodes, path, follow_final)?;
        Ok(nodes.get(&resolved).map(|node| (resolved, Arc::clone(node))))
    }

    fn existing(&self, path: &Path, follow_final: bool) -> io::Result<Arc<Node>> {
        self.lookup(path, follow_final)?
            .map(|(_, node)| node)
            .ok_or_else(|| not_found(path))
    }

    /// Resolves where a new object named by `path` goes and checks that its
    /// parent is an existing directory.
    fn placement(nodes: &NodeMap, path: &Path) -> io::Result<PathBuf> {
        let resolved = Self::resolve(nodes, path, false)?;
        let parent = resolved.parent().unwrap_or_else(|| Path::new("/"));
        match nodes.get(parent) {
            Some(node) if node.is_dir()? => Ok(resolved),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", parent.display()),
            )),
            None => Err(not_found(parent)),
        }
    }

    /// Inserts `node` at `path`, replacing a non-directory when allowed.
    ///
    /// Open readers of a replaced node are not consulted; they hold their
    /// own handle on the old node.
    fn insert(&self, path: &Path, node: Arc<Node>, overwrite: bool) -> Result<()> {
        let mut nodes = self.write_nodes()?;
        let resolved = Self::placement(&nodes, path)?;
        if let Some(existing) = nodes.get(&resolved)
            && (!overwrite || existing.is_dir()?)
        {
            return Err(ExtractionError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        nodes.insert(resolved, node);
        Ok(())
    }

    /// Opens a file for reading, following symlinks.
    ///
    /// # Errors
    ///
    /// `NotFound` when missing, `IsADirectory` for directories.
    pub fn open(&self, path: impl AsRef<Path>) -> io::Result<MemoryFile> {
        let path = path.as_ref();
        let node = self.existing(path, true)?;
        if node.is_dir()? {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            ));
        }
        node.readers.fetch_add(1, Ordering::AcqRel);
        Ok(MemoryFile { node, position: 0 })
    }

    /// Reads a whole file, following symlinks.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn read_file(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.open(path)?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Target of the symlink at `path`.
    ///
    /// # Errors
    ///
    /// `NotFound` when missing, `InvalidInput` when not a symlink.
    pub fn read_link(&self, path: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = path.as_ref();
        self.existing(path, false)?.symlink_target()?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {}", path.display()),
            )
        })
    }

    /// Sorted names of the entries of the directory at `path`.
    ///
    /// # Errors
    ///
    /// `NotFound` when missing, `NotADirectory` otherwise.
    pub fn read_dir(&self, path: impl AsRef<Path>) -> io::Result<Vec<String>> {
        let path = path.as_ref();
        let nodes = self.read_nodes()?;
        let resolved = Self::resolve(&nodes, path, true)?;
        match nodes.get(&resolved) {
            None => return Err(not_found(path)),
            Some(node) if !node.is_dir()? => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            Some(_) => {}
        }
        let mut names: Vec<String> = nodes
            .keys()
            .filter(|candidate| candidate.parent() == Some(resolved.as_path()))
            .filter_map(|candidate| candidate.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Removes a file, symlink or empty directory.
    ///
    /// Fails fast with `ResourceBusy` while a [`MemoryFile`] for it is open.
    ///
    /// # Errors
    ///
    /// `NotFound`, `ResourceBusy`, `DirectoryNotEmpty`, or `PermissionDenied`
    /// for `/`.
    pub fn remove(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let mut nodes = self.write_nodes()?;
        let resolved = Self::resolve(&nodes, path, false)?;
        if resolved == Path::new("/") {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove the root",
            ));
        }
        let node = nodes.get(&resolved).ok_or_else(|| not_found(path))?;
        if node.readers.load(Ordering::Acquire) > 0 {
            return Err(io::Error::new(
                io::ErrorKind::ResourceBusy,
                format!("file is open: {}", path.display()),
            ));
        }
        if node.is_dir()? && nodes.keys().any(|k| k.parent() == Some(resolved.as_path())) {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("directory not empty: {}", path.display()),
            ));
        }
        nodes.remove(&resolved);
        Ok(())
    }

    /// Owner recorded for `path` by [`Target::chown`].
    ///
    /// # Errors
    ///
    /// `NotFound` when missing.
    pub fn owner(&self, path: impl AsRef<Path>) -> io::Result<(Option<u64>, Option<u64>)> {
        let node = self.existing(path.as_ref(), false)?;
        let attributes = node.attributes.read().map_err(|_| poisoned())?;
        Ok((attributes.uid, attributes.gid))
    }

    /// Access time recorded for `path`.
    ///
    /// # Errors
    ///
    /// `NotFound` when missing.
    pub fn accessed(&self, path: impl AsRef<Path>) -> io::Result<Option<SystemTime>> {
        let node = self.existing(path.as_ref(), false)?;
        let attributes = node.attributes.read().map_err(|_| poisoned())?;
        Ok(attributes.accessed)
    }
}

impl Target for MemoryTarget {
    fn create_file(
        &self,
        path: &Path,
        content: &mut dyn Read,
        mode: u32,
        overwrite: bool,
        max_size: Option<u64>,
    ) -> Result<u64> {
        {
            let nodes = self.read_nodes()?;
            let resolved = Self::placement(&nodes, path)?;
            if let Some(existing) = nodes.get(&resolved)
                && (!overwrite || existing.is_dir()?)
            {
                return Err(ExtractionError::AlreadyExists {
                    path: path.to_path_buf(),
                });
            }
        }

        // Content is buffered outside the map lock; nothing is inserted
        // unless the whole stream fits.
        let mut writer = LimitedWriter::new(Vec::new(), max_size, LimitKind::ExtractionSize);
        let mut buffer = CopyBuffer::new();
        let written = copy_with_buffer(content, &mut writer, &mut buffer)?;
        self.insert(path, Node::new(Content::File(writer.into_inner()), mode), overwrite)?;
        Ok(written)
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<()> {
        let mut nodes = self.write_nodes()?;
        let resolved = Self::placement(&nodes, path)?;
        match nodes.get(&resolved) {
            Some(existing) if existing.is_dir()? => Ok(()),
            Some(_) => Err(ExtractionError::AlreadyExists {
                path: path.to_path_buf(),
            }),
            None => {
                nodes.insert(resolved, Node::new(Content::Directory, mode));
                Ok(())
            }
        }
    }

    fn create_symlink(&self, target: &Path, link: &Path, overwrite: bool) -> Result<()> {
        self.insert(
            link,
            Node::new(Content::Symlink(target.to_path_buf()), 0o777),
            overwrite,
        )
    }

    fn lstat(&self, path: &Path) -> Result<Option<FileMetadata>> {
        match self.lookup(path, false)? {
            Some((_, node)) => Ok(Some(node.metadata()?)),
            None => Ok(None),
        }
    }

    fn stat(&self, path: &Path) -> Result<Option<FileMetadata>> {
        match self.lookup(path, true)? {
            Some((_, node)) => Ok(Some(node.metadata()?)),
            None => Ok(None),
        }
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        self.existing(path, true)?
            .update(|attributes| attributes.mode = mode & 0o7777)?;
        Ok(())
    }

    fn chtimes(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        self.existing(path, true)?.update(|attributes| {
            attributes.accessed = accessed.or(attributes.accessed);
            attributes.modified = modified.or(attributes.modified);
        })?;
        Ok(())
    }

    fn lchtimes(
        &self,
        path: &Path,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> Result<()> {
        self.existing(path, false)?.update(|attributes| {
            attributes.accessed = accessed.or(attributes.accessed);
            attributes.modified = modified.or(attributes.modified);
        })?;
        Ok(())
    }

    fn chown(&self, path: &Path, uid: Option<u64>, gid: Option<u64>) -> Result<()> {
        self.existing(path, false)?.update(|attributes| {
            attributes.uid = uid.or(attributes.uid);
            attributes.gid = gid.or(attributes.gid);
        })?;
        Ok(())
    }

    fn can_preserve_symlink_times(&self) -> bool {
        true
    }
}
