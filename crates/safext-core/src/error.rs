//! Error types for archive extraction operations.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Identifies which configured ceiling was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// Number of archive entries processed.
    Files,
    /// Bytes written to the target across all materialized files.
    ExtractionSize,
    /// Raw bytes consumed from the input stream.
    InputSize,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Files => f.write_str("max files"),
            Self::ExtractionSize => f.write_str("max extraction size"),
            Self::InputSize => f.write_str("max input size"),
        }
    }
}

/// Why an extraction stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller triggered the cancel handle.
    Cancelled,
    /// The context deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled by caller"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Reason an entry or output file name was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameViolation {
    /// Name is empty.
    Empty,
    /// Name is `.` or `..`.
    DotName,
    /// Name is longer than 255 bytes.
    TooLong(usize),
    /// Name contains a NUL byte.
    NulByte,
    /// Name contains a control character such as CR, LF or TAB.
    ControlCharacter,
    /// Name contains bytes outside the printable ASCII range.
    NonAscii,
    /// Name or link target is not valid UTF-8.
    NotUtf8,
    /// Name is a reserved Windows device name (`CON`, `LPT1`, ...).
    ReservedName,
    /// Name contains a character Windows refuses in file names.
    ForbiddenCharacter(char),
}

impl fmt::Display for NameViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty name"),
            Self::DotName => f.write_str("name is a dot entry"),
            Self::TooLong(len) => write!(f, "name too long ({len} > 255 bytes)"),
            Self::NulByte => f.write_str("embedded NUL byte"),
            Self::ControlCharacter => f.write_str("embedded control character"),
            Self::NonAscii => f.write_str("non-ASCII character"),
            Self::NotUtf8 => f.write_str("not valid UTF-8"),
            Self::ReservedName => f.write_str("reserved device name"),
            Self::ForbiddenCharacter(c) => write!(f, "forbidden character {c:?}"),
        }
    }
}

/// Errors that can occur during archive extraction.
///
/// Variants carry structured context; they are turned into text only when
/// displayed or recorded in the telemetry report.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// I/O operation failed on the target or the input.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// Input matched no registered signature and no type override was given.
    #[error("unsupported archive format")]
    UnsupportedFormat,

    /// The extraction type override names no registered format.
    #[error("unknown extraction type: {name}")]
    UnknownType {
        /// The override as given by the caller.
        name: String,
    },

    /// A codec failed on corrupt or truncated compressed data.
    #[error("failed to decode {codec} stream: {source}")]
    Decode {
        /// Short codec label (`gz`, `xz`, ...).
        codec: &'static str,
        /// Underlying decoder failure.
        #[source]
        source: io::Error,
    },

    /// Container structure is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// A configured ceiling was crossed.
    #[error("limit exceeded: {kind} ({limit})")]
    LimitExceeded {
        /// Which ceiling.
        kind: LimitKind,
        /// The configured value.
        limit: u64,
    },

    /// Entry name climbs above the destination root.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending archive path.
        path: PathBuf,
    },

    /// Absolute entry name with no destination root to anchor it.
    #[error("absolute path detected: {path}")]
    AbsolutePath {
        /// The offending archive path.
        path: PathBuf,
    },

    /// An existing ancestor of the entry path is a symlink.
    #[error("symlink in path: {path} (through {symlink})")]
    SymlinkInPath {
        /// The archive path being checked.
        path: PathBuf,
        /// The ancestor that is a symlink.
        symlink: PathBuf,
    },

    /// Symlink extraction is disabled by configuration.
    #[error("symlink extraction denied: {path}")]
    SymlinkDenied {
        /// The symlink entry.
        path: PathBuf,
    },

    /// Symlink target is an absolute path.
    #[error("symlink target is absolute: {path} -> {target}")]
    SymlinkAbsoluteTarget {
        /// The symlink entry.
        path: PathBuf,
        /// Its target as stored in the archive.
        target: PathBuf,
    },

    /// Entry or output name is not acceptable on this platform.
    #[error("illegal name {name:?}: {reason}")]
    IllegalName {
        /// The refused name.
        name: String,
        /// What is wrong with it.
        reason: NameViolation,
    },

    /// Entry kind that cannot be materialized (device, FIFO, hard link...).
    #[error("unsupported entry {name}: {kind}")]
    UnsupportedEntry {
        /// Archive path of the entry.
        name: String,
        /// Human readable kind.
        kind: String,
    },

    /// Destination root is missing and creation was not requested.
    #[error("destination does not exist: {path}")]
    DestinationMissing {
        /// The configured destination.
        path: PathBuf,
    },

    /// Object already exists and overwriting is disabled.
    #[error("already exists: {path}")]
    AlreadyExists {
        /// The existing object.
        path: PathBuf,
    },

    /// A name filter pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Parser message.
        reason: String,
    },

    /// Extraction stopped by cancellation or deadline.
    #[error("extraction cancelled: {reason}")]
    Cancelled {
        /// Cancellation cause.
        reason: CancelReason,
    },
}

impl ExtractionError {
    /// Returns `true` if this error represents a security violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use safext_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::PathTraversal {
    ///     path: PathBuf::from("../etc/passwd"),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = ExtractionError::UnsupportedFormat;
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. }
                | Self::AbsolutePath { .. }
                | Self::SymlinkInPath { .. }
                | Self::SymlinkAbsoluteTarget { .. }
                | Self::IllegalName { .. }
                | Self::LimitExceeded { .. }
        )
    }

    /// Returns `true` if the error ends the extraction regardless of
    /// `continue_on_error`.
    ///
    /// Cancellation, the input-size ceiling and anything that leaves the
    /// underlying decoder or walker in an unknown state cannot be skipped.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled { .. }
                | Self::LimitExceeded {
                    kind: LimitKind::InputSize,
                    ..
                }
                | Self::Decode { .. }
                | Self::InvalidArchive(_)
                | Self::UnsupportedFormat
                | Self::UnknownType { .. }
                | Self::DestinationMissing { .. }
                | Self::InvalidPattern { .. }
        )
    }

    /// Returns `true` for entries that were refused because of their kind.
    ///
    /// These are skipped when `continue_on_unsupported_files` is set.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedEntry { .. } | Self::SymlinkDenied { .. }
        )
    }

    /// Returns the limit that was crossed, if applicable.
    #[must_use]
    pub const fn limit_kind(&self) -> Option<LimitKind> {
        match self {
            Self::LimitExceeded { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns a context string for this error, if available.
    ///
    /// ```
    /// use safext_core::ExtractionError;
    ///
    /// let err = ExtractionError::InvalidArchive("bad header".to_string());
    /// assert_eq!(err.context(), Some("bad header"));
    /// assert_eq!(ExtractionError::UnsupportedFormat.context(), None);
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchive(msg) => Some(msg),
            Self::UnsupportedEntry { kind, .. } => Some(kind),
            Self::UnknownType { name } => Some(name),
            _ => None,
        }
    }
}

/// Marker carried inside an `io::Error` when a bounded stream crosses its
/// ceiling, so the condition survives codecs that only speak `io::Error`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LimitBreach {
    pub(crate) kind: LimitKind,
    pub(crate) limit: u64,
}

impl fmt::Display for LimitBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} bytes exceeded", self.kind, self.limit)
    }
}

impl std::error::Error for LimitBreach {}

impl LimitBreach {
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

/// Marker wrapping a decoder failure so it can be told apart from target
/// write errors once both travel through the same copy loop.
#[derive(Debug)]
pub(crate) struct DecodeFailure {
    pub(crate) codec: &'static str,
    pub(crate) source: io::Error,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.codec, self.source)
    }
}

impl std::error::Error for DecodeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<io::Error> for ExtractionError {
    fn from(err: io::Error) -> Self {
        let marked = err
            .get_ref()
            .is_some_and(|inner| inner.is::<LimitBreach>() || inner.is::<DecodeFailure>());
        if !marked {
            return Self::Io(err);
        }

        let kind = err.kind();
        let Some(inner) = err.into_inner() else {
            return Self::Io(io::Error::from(kind));
        };
        let inner = match inner.downcast::<LimitBreach>() {
            Ok(breach) => {
                return Self::LimitExceeded {
                    kind: breach.kind,
                    limit: breach.limit,
                };
            }
            Err(other) => other,
        };
        match inner.downcast::<DecodeFailure>() {
            Ok(failure) => {
                let DecodeFailure { codec, source } = *failure;
                Self::Decode { codec, source }
            }
            Err(other) => Self::Io(io::Error::new(kind, other)),
        }
    }
}

impl From<zip::result::ZipError> for ExtractionError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::from(e),
            other => Self::InvalidArchive(format!("zip: {other}")),
        }
    }
}
