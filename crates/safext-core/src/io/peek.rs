//! Header peeking for format detection.

use std::io;
use std::io::BufRead;
use std::io::Read;

/// Reader that captured the first bytes of its source and replays them
/// before continuing with the rest.
///
/// Downstream consumers observe exactly the bytes the source would have
/// produced without peeking.
///
/// # Examples
///
/// ```
/// use safext_core::io::PeekReader;
/// use std::io::Read;
///
/// let mut reader = PeekReader::new(&b"PK\x03\x04rest"[..], 4)?;
/// assert_eq!(reader.header(), b"PK\x03\x04");
///
/// let mut all = Vec::new();
/// reader.read_to_end(&mut all)?;
/// assert_eq!(all, b"PK\x03\x04rest");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct PeekReader<R> {
    header: Vec<u8>,
    pos: usize,
    inner: R,
}

impl<R: Read> PeekReader<R> {
    /// Reads up to `n` bytes from `inner`.
    ///
    /// A short header on genuine EOF is not an error.
    pub fn new(mut inner: R, n: usize) -> io::Result<Self> {
        let mut header = Vec::with_capacity(n);
        (&mut inner).take(n as u64).read_to_end(&mut header)?;
        Ok(Self {
            header,
            pos: 0,
            inner,
        })
    }

    /// The captured prefix.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Returns the source without the unreplayed part of the header.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for PeekReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.header.len() {
            let n = (&self.header[self.pos..]).read(buf)?;
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

impl<R: BufRead> BufRead for PeekReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos < self.header.len() {
            return Ok(&self.header[self.pos..]);
        }
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if self.pos < self.header.len() {
            self.pos = (self.pos + amt).min(self.header.len());
        } else {
            self.inner.consume(amt);
        }
    }
}
