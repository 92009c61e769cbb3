//! Relative path that passed the path guard.

use std::path::Path;
use std::path::PathBuf;

/// Path relative to the destination root, free of `..`, root and prefix
/// components, built from native separators.
///
/// Only the path guard constructs values from untrusted names; there is no
/// public constructor from raw strings or `PathBuf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SafePath(PathBuf);

impl SafePath {
    /// The destination root itself.
    #[must_use]
    pub(crate) fn root() -> Self {
        Self::default()
    }

    /// Builds a path from already-vetted normal components.
    pub(crate) fn from_parts<S: AsRef<str>>(parts: &[S]) -> Self {
        Self(parts.iter().map(AsRef::as_ref).collect())
    }

    /// Returns the relative path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Whether this is the root itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Last component, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|name| name.to_str())
    }

    /// Containing directory; the root for single-component paths.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| Self(p.to_path_buf()))
    }

    /// Components as strings, shallowest first.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|part| part.to_str())
    }

    /// Proper ancestors, shallowest first, excluding the root and `self`.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut ancestors: Vec<Self> = self
            .0
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| Self(p.to_path_buf()))
            .collect();
        ancestors.reverse();
        ancestors
    }

    /// Number of components.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.iter().count()
    }
}

impl AsRef<Path> for SafePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for SafePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.display().fmt(f)
    }
}
