//! Destination root of an extraction.

use std::path::Path;
use std::path::PathBuf;

use super::SafePath;

/// Root directory every extracted path must stay inside.
///
/// An empty root means "the current working context": paths stay relative
/// and absolute archive names are refused outright instead of being
/// re-anchored under the root.
///
/// The root is only a location; whether it exists is checked through the
/// filesystem target, which may not be the real disk.
///
/// # Examples
///
/// ```
/// use safext_core::types::DestDir;
///
/// let dest = DestDir::new("/srv/unpack");
/// assert!(!dest.is_current_context());
/// assert!(DestDir::new("").is_current_context());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Wraps `path` as the destination root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Whether the root is empty.
    #[must_use]
    pub fn is_current_context(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Native path of `safe` under this root.
    ///
    /// The root itself is returned as `.` when empty, so the result is
    /// always usable with filesystem calls.
    #[must_use]
    pub fn join(&self, safe: &SafePath) -> PathBuf {
        match (self.is_current_context(), safe.is_root()) {
            (true, true) => PathBuf::from("."),
            (true, false) => safe.as_path().to_path_buf(),
            (false, _) => self.0.join(safe.as_path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_under_root() {
        let dest = DestDir::new("/out");
        let safe = SafePath::from_parts(&["a", "b.txt"]);
        assert_eq!(dest.join(&safe), Path::new("/out/a/b.txt"));
        assert_eq!(dest.join(&SafePath::root()), Path::new("/out"));
    }

    #[test]
    fn test_join_current_context() {
        let dest = DestDir::new("");
        assert_eq!(
            dest.join(&SafePath::from_parts(&["x"])),
            Path::new("x")
        );
        assert_eq!(dest.join(&SafePath::root()), Path::new("."));
    }
}
