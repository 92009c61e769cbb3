//! Uniform view over container formats.

use std::io::Read;
use std::time::SystemTime;

use crate::Result;
use crate::error::NameViolation;
use crate::types::EntryKind;

/// One entry yielded by a [`Walker`].
///
/// Everything here comes from the archive and is untrusted. Entries are
/// consumed by the driver before the next one is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Archive-relative name, `/`-separated.
    pub name: String,
    /// Unified kind.
    pub kind: EntryKind,
    /// Declared size in bytes. Stream formats may lie.
    pub size: u64,
    /// Permission bits, without file-type bits.
    pub mode: Option<u32>,
    /// Modification time.
    pub modified: Option<SystemTime>,
    /// Access time.
    pub accessed: Option<SystemTime>,
    /// Symlink target, when the format stores it in the header. Formats that
    /// keep it in the entry content leave this empty.
    pub link_target: Option<String>,
    /// Owner id.
    pub uid: Option<u64>,
    /// Group id.
    pub gid: Option<u64>,
    /// Set when the stored name or link target could not be decoded. The
    /// entry is still yielded so the driver can refuse it on its own.
    pub name_violation: Option<NameViolation>,
}

impl ArchiveEntry {
    /// Entry with the given name and kind and no metadata.
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: 0,
            mode: None,
            modified: None,
            accessed: None,
            link_target: None,
            uid: None,
            gid: None,
            name_violation: None,
        }
    }
}

/// Content of the entry being visited, opened only on demand.
pub trait EntryContent {
    /// Opens the entry content for reading.
    fn open(&mut self) -> Result<Box<dyn Read + '_>>;
}

/// Callback invoked once per entry by [`Walker::for_each_entry`].
pub type EntryVisitor<'v> = dyn FnMut(&ArchiveEntry, &mut dyn EntryContent) -> Result<()> + 'v;

/// Stateful cursor over a container's entries.
///
/// Not rewindable. [`open_current`](Self::open_current) reads the entry most
/// recently returned by [`next_entry`](Self::next_entry); content that was
/// not read is skipped on the next call.
pub trait Walker {
    /// Canonical format label (`tar`, `tar.gz`, `zip`, `7z`, `rar`).
    fn archive_type(&self) -> &str;

    /// Advances to the next entry; `None` at the end of the archive.
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>>;

    /// Opens the content of the current entry.
    fn open_current(&mut self) -> Result<Box<dyn Read + '_>>;

    /// Visits every remaining entry in order, stopping at the first error
    /// `visit` returns.
    ///
    /// The provided implementation pulls through
    /// [`next_entry`](Self::next_entry) and
    /// [`open_current`](Self::open_current). Formats whose decoder can only
    /// stream entries in one pass override it.
    ///
    /// # Errors
    ///
    /// Walker errors, and the first error returned by `visit`.
    fn for_each_entry(&mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        while let Some(entry) = self.next_entry()? {
            visit(&entry, &mut CurrentEntry(&mut *self))?;
        }
        Ok(())
    }
}

/// [`EntryContent`] of a pull walker's current entry.
struct CurrentEntry<'w, W: ?Sized>(&'w mut W);

impl<W: Walker + ?Sized> EntryContent for CurrentEntry<'_, W> {
    fn open(&mut self) -> Result<Box<dyn Read + '_>> {
        self.0.open_current()
    }
}

/// [`EntryContent`] over a reader handed out by a streaming decoder.
pub(crate) struct StreamedContent<'r>(pub(crate) &'r mut dyn Read);

impl EntryContent for StreamedContent<'_> {
    fn open(&mut self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(&mut *self.0))
    }
}

/// Normalizes an archive name to `/` separators.
pub(crate) fn normalize_name(name: &str) -> String {
    name.replace('\\', "/")
}
