//! The path guard every created object passes through.
//!
//! A name is split on `/` and replayed component by component against the
//! destination root:
//!
//! - an absolute name is refused only when there is no root to anchor it;
//!   otherwise it is taken relative to the root
//! - `..` pops a component, and popping past the root is a traversal
//! - every existing component that is descended into is `lstat`ed through
//!   the target: a symlink is refused (or followed with a warning when
//!   insecure traversal is enabled) and a non-directory fails
//!
//! Ancestors are inspected on the path as written, before `..` is applied, so a
//! chain of symlinks is caught at the first link regardless of its length.
//! Link targets go through the same walk starting at the link's directory.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;
use crate::error::NameViolation;
use crate::logger::Logger;
use crate::target::Target;
use crate::types::DestDir;
use crate::types::SafePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ancestor {
    Present,
    Missing,
}

/// Validates archive names and link targets against a destination root.
pub struct PathGuard<'a> {
    target: &'a dyn Target,
    root: &'a DestDir,
    traverse_symlinks: bool,
    logger: &'a dyn Logger,
}

impl std::fmt::Debug for PathGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathGuard")
            .field("root", &self.root)
            .field("traverse_symlinks", &self.traverse_symlinks)
            .finish_non_exhaustive()
    }
}

fn is_absolute_name(name: &str) -> bool {
    name.starts_with('/') || Path::new(name).has_root()
}

impl<'a> PathGuard<'a> {
    /// Creates a guard for `root` probing through `target`.
    pub fn new(
        target: &'a dyn Target,
        root: &'a DestDir,
        traverse_symlinks: bool,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            target,
            root,
            traverse_symlinks,
            logger,
        }
    }

    /// The destination root.
    #[must_use]
    pub const fn root(&self) -> &DestDir {
        self.root
    }

    /// Whether existing symlinks may be followed.
    #[must_use]
    pub const fn traverses_symlinks(&self) -> bool {
        self.traverse_symlinks
    }

    /// Resolves an archive entry name to a path under the root.
    ///
    /// # Errors
    ///
    /// `AbsolutePath`, `PathTraversal`, `SymlinkInPath`, or an I/O error
    /// when an ancestor is not a directory.
    pub fn resolve(&self, name: &str) -> Result<SafePath> {
        if self.root.is_current_context() && is_absolute_name(name) {
            return Err(ExtractionError::AbsolutePath {
                path: PathBuf::from(name),
            });
        }
        let segments: Vec<&str> = name.split('/').collect();
        let parts = self.walk(Path::new(name), Vec::new(), &segments)?;
        Ok(SafePath::from_parts(&parts))
    }

    /// Checks that the symlink at `link` pointing to `target` stays inside
    /// the root.
    ///
    /// # Errors
    ///
    /// `SymlinkAbsoluteTarget` for absolute targets, `PathTraversal` when
    /// the target climbs out, `SymlinkInPath` when it runs through an
    /// existing symlink.
    pub fn check_link_target(&self, link: &SafePath, target: &str) -> Result<()> {
        if target.is_empty() {
            return Err(ExtractionError::IllegalName {
                name: link.to_string(),
                reason: NameViolation::Empty,
            });
        }
        if is_absolute_name(target) {
            return Err(ExtractionError::SymlinkAbsoluteTarget {
                path: link.as_path().to_path_buf(),
                target: PathBuf::from(target),
            });
        }
        let base: Vec<String> = link
            .parent()
            .map(|parent| parent.parts().map(str::to_owned).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = target.split('/').collect();
        self.walk(link.as_path(), base, &segments).map(|_| ())
    }

    /// Re-checks the ancestors of an already resolved path.
    ///
    /// Targets call this right before mutating, since the tree may have
    /// changed since [`resolve`](Self::resolve).
    ///
    /// # Errors
    ///
    /// `SymlinkInPath` or an I/O error when an ancestor is not a directory.
    pub fn revalidate(&self, path: &SafePath) -> Result<()> {
        for ancestor in path.ancestors() {
            if self.inspect(path.as_path(), &ancestor)? == Ancestor::Missing {
                break;
            }
        }
        Ok(())
    }

    fn walk(&self, display: &Path, mut stack: Vec<String>, segments: &[&str]) -> Result<Vec<String>> {
        let mut checking = true;
        for (index, segment) in segments.iter().enumerate() {
            match *segment {
                "" | "." => {}
                ".." => {
                    if stack.pop().is_none() {
                        return Err(ExtractionError::PathTraversal {
                            path: display.to_path_buf(),
                        });
                    }
                    checking = true;
                }
                part => {
                    stack.push(part.to_owned());
                    let descends = segments[index + 1..]
                        .iter()
                        .any(|rest| !matches!(*rest, "" | "."));
                    if checking && descends {
                        let ancestor = SafePath::from_parts(&stack);
                        checking = self.inspect(display, &ancestor)? == Ancestor::Present;
                    }
                }
            }
        }
        Ok(stack)
    }

    fn inspect(&self, display: &Path, ancestor: &SafePath) -> Result<Ancestor> {
        let Some(meta) = self.target.lstat(&self.root.join(ancestor))? else {
            return Ok(Ancestor::Missing);
        };
        if meta.is_symlink() {
            if !self.traverse_symlinks {
                return Err(ExtractionError::SymlinkInPath {
                    path: display.to_path_buf(),
                    symlink: ancestor.as_path().to_path_buf(),
                });
            }
            self.logger.warn(
                "following symlink in path",
                &[("path", &display.display()), ("symlink", ancestor)],
            );
            return Ok(Ancestor::Present);
        }
        if meta.is_dir() {
            return Ok(Ancestor::Present);
        }
        Err(ExtractionError::Io(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("not a directory: {ancestor}"),
        )))
    }
}
