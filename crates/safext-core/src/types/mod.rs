//! Type-safe wrappers for archive extraction operations.
//!
//! [`SafePath`] can only come out of the path guard, so any function taking
//! one knows the path was checked against the destination root.

pub mod dest_dir;
pub mod entry_kind;
pub mod safe_path;

pub use dest_dir::DestDir;
pub use entry_kind::EntryKind;
pub use entry_kind::kind_from_unix_mode;
pub use safe_path::SafePath;
