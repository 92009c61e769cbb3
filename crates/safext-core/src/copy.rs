//! Buffered copy loop shared by every writer in the crate.
//!
//! Each target write or spool allocates one 64 KiB [`CopyBuffer`] and reuses
//! it for every read of that copy, instead of the 8 KiB stack buffer
//! `std::io::copy` works with. A caller doing several copies in a row may
//! pass the same buffer to each.

use std::io;
use std::io::Read;
use std::io::Write;

/// Buffer size for I/O operations (64KB).
///
/// Matches typical filesystem block sizes.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable heap buffer for [`copy_with_buffer`].
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Allocates a zeroed buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer` through `buffer` and returns the byte count.
///
/// Interrupted reads are retried. Errors from either side are returned as
/// they are, so limit markers raised by bounded readers and writers keep
/// their identity.
///
/// # Examples
///
/// ```
/// use safext_core::copy::{CopyBuffer, copy_with_buffer};
///
/// let mut buffer = CopyBuffer::new();
/// let mut output = Vec::new();
/// let copied = copy_with_buffer(&mut &b"hello"[..], &mut output, &mut buffer)?;
/// assert_eq!(copied, 5);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn copy_with_buffer<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;
        total = total.saturating_add(bytes_read as u64);
    }

    writer.flush()?;
    Ok(total)
}
