//! Entry name filtering with shell globs.

use globset::GlobBuilder;
use globset::GlobSet;
use globset::GlobSetBuilder;

use crate::ExtractionError;
use crate::Result;

/// Set of glob patterns an entry name must match to be extracted.
///
/// `*` and `?` do not cross `/`; `**` does. An empty set matches every name.
///
/// # Examples
///
/// ```
/// use safext_core::security::PatternFilter;
///
/// let filter = PatternFilter::new(["*.txt", "docs/**"])?;
/// assert!(filter.matches("a.txt"));
/// assert!(!filter.matches("dir/a.txt"));
/// assert!(filter.matches("docs/deep/file.md"));
/// # Ok::<(), safext_core::ExtractionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PatternFilter {
    globs: GlobSet,
    empty: bool,
}

impl PatternFilter {
    /// Compiles `patterns`.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` for the first pattern that fails to parse.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut empty = true;
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| invalid(pattern, &e))?;
            builder.add(glob);
            empty = false;
        }
        let globs = builder
            .build()
            .map_err(|e| invalid("<pattern set>", &e))?;
        Ok(Self { globs, empty })
    }

    /// Whether `name` passes the filter.
    ///
    /// Leading `/` and `./` as well as trailing `/` are ignored, so
    /// directory entries match the same patterns as their plain names.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if self.empty {
            return true;
        }
        let mut trimmed = name.trim_end_matches('/');
        loop {
            if let Some(rest) = trimmed.strip_prefix("./") {
                trimmed = rest;
            } else if let Some(rest) = trimmed.strip_prefix('/') {
                trimmed = rest;
            } else {
                break;
            }
        }
        self.globs.is_match(trimmed)
    }

    /// Whether no patterns were given.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.empty
    }
}

fn invalid(pattern: &str, err: &globset::Error) -> ExtractionError {
    ExtractionError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: err.kind().to_string(),
    }
}
