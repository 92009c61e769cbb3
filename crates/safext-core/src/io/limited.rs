//! Byte ceilings for untrusted streams.
//!
//! [`LimitedReader`] guards the raw input, [`LimitedWriter`] guards every
//! file written to a target. Both report a crossed ceiling as an
//! `io::Error` wrapping a limit marker, which [`ExtractionError`] turns back
//! into [`ExtractionError::LimitExceeded`] even after the error travelled
//! through a decoder.
//!
//! [`ExtractionError`]: crate::ExtractionError
//! [`ExtractionError::LimitExceeded`]: crate::ExtractionError::LimitExceeded

use std::io;
use std::io::Read;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::error::LimitBreach;
use crate::error::LimitKind;

#[derive(Debug, Default)]
struct MeterState {
    bytes: AtomicU64,
    tripped: AtomicBool,
}

/// Shared view of how many bytes a [`LimitedReader`] let through.
///
/// The reader usually disappears inside a decoder or walker; the meter stays
/// with the driver so it can report the input size and recognise a ceiling
/// hit even if a codec replaced the original error.
#[derive(Debug, Clone, Default)]
pub struct ByteMeter {
    state: Arc<MeterState>,
}

impl ByteMeter {
    /// Bytes counted so far.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.state.bytes.load(Ordering::Relaxed)
    }

    /// Whether the ceiling was crossed.
    #[must_use]
    pub fn tripped(&self) -> bool {
        self.state.tripped.load(Ordering::Relaxed)
    }

    fn add(&self, n: usize) {
        self.state.bytes.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn trip(&self) {
        self.state.tripped.store(true, Ordering::Relaxed);
    }
}

/// Reader that yields at most `limit` bytes and then fails.
///
/// Reads are clamped to the remaining budget, so partial reads and EOF behave
/// exactly like the wrapped source. Once the budget is spent the reader
/// reads one more byte: a clean EOF is passed through, anything else is a
/// [`LimitKind`] breach and every later read fails the same way.
///
/// Memory use is independent of the source size, so it can sit directly on
/// a network stream.
///
/// # Examples
///
/// ```
/// use safext_core::io::LimitedReader;
/// use safext_core::LimitKind;
/// use std::io::Read;
///
/// let mut reader = LimitedReader::new(&b"hello world"[..], Some(5), LimitKind::InputSize);
/// let mut buf = [0u8; 5];
/// reader.read_exact(&mut buf)?;
/// assert_eq!(&buf, b"hello");
/// assert!(reader.read(&mut buf).is_err());
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct LimitedReader<R> {
    inner: R,
    limit: Option<u64>,
    remaining: u64,
    kind: LimitKind,
    meter: ByteMeter,
}

impl<R: Read> LimitedReader<R> {
    /// Wraps `inner`. `None` disables the ceiling but keeps counting.
    pub fn new(inner: R, limit: Option<u64>, kind: LimitKind) -> Self {
        Self {
            inner,
            limit,
            remaining: limit.unwrap_or(u64::MAX),
            kind,
            meter: ByteMeter::default(),
        }
    }

    /// Returns a meter observing this reader.
    #[must_use]
    pub fn meter(&self) -> ByteMeter {
        self.meter.clone()
    }

    /// Bytes read so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.meter.bytes()
    }

    fn breach(&self) -> io::Error {
        self.meter.trip();
        LimitBreach {
            kind: self.kind,
            limit: self.limit.unwrap_or(u64::MAX),
        }
        .into_io()
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.meter.tripped() {
            return Err(self.breach());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            let mut extra = [0u8; 1];
            return match self.inner.read(&mut extra)? {
                0 => Ok(0),
                _ => Err(self.breach()),
            };
        }

        let max = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        self.meter.add(n);
        Ok(n)
    }
}

/// Writer that accepts at most `limit` bytes.
///
/// Writes beyond the budget store the permitted prefix and the next write
/// fails, so callers using `write_all` see the breach after exactly `limit`
/// bytes reached the inner writer.
#[derive(Debug)]
pub struct LimitedWriter<W> {
    inner: W,
    limit: Option<u64>,
    written: u64,
    kind: LimitKind,
}

impl<W: Write> LimitedWriter<W> {
    /// Wraps `inner`. `None` disables the ceiling but keeps counting.
    pub fn new(inner: W, limit: Option<u64>, kind: LimitKind) -> Self {
        Self {
            inner,
            limit,
            written: 0,
            kind,
        }
    }

    /// Bytes accepted so far.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.written
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for LimitedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let allowed = match self.limit {
            None => buf.len(),
            Some(limit) => {
                let remaining = limit.saturating_sub(self.written);
                if remaining == 0 && !buf.is_empty() {
                    return Err(LimitBreach {
                        kind: self.kind,
                        limit,
                    }
                    .into_io());
                }
                usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()))
            }
        };
        let n = self.inner.write(&buf[..allowed])?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
