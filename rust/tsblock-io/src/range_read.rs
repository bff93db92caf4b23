//! A streaming reader over a single byte range of a `ReadAt` object.

use std::ops::Range;

use crate::ReadAt;

/// Turns a byte range of any `ReadAt` implementation into a standard `std::io::Read`.
///
/// The reader advances sequentially from `range.start` and reports end-of-stream at
/// `range.end` or at the end of the underlying object, whichever comes first. Each
/// `read` call issues at most one `read_at` request, sized by the caller's buffer:
/// wrap it in a `std::io::BufReader` to control the request granularity.
pub struct RangeReader<R> {
    inner: R,
    pos: u64,
    end: u64,
}

impl<R> RangeReader<R> {
    /// Creates a new `RangeReader` over `range` of `inner`.
    pub fn new(inner: R, range: Range<u64>) -> Self {
        Self {
            inner,
            pos: range.start,
            end: range.end.max(range.start),
        }
    }

    /// Returns the absolute position of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Returns the number of bytes left before the end of the range.
    pub fn remaining(&self) -> u64 {
        self.end - self.pos
    }

    /// Returns a reference to the underlying `ReadAt` implementation.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Consumes the reader and returns the underlying `ReadAt` implementation.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ReadAt> std::io::Read for RangeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let to_read = (buf.len() as u64).min(self.remaining());
        if to_read == 0 {
            return Ok(0);
        }

        let bytes = self.inner.read_at(self.pos..self.pos + to_read)?;
        let bytes_read = bytes.len();
        buf[..bytes_read].copy_from_slice(&bytes);

        // A short read means the object ended before the range did.
        if (bytes_read as u64) < to_read {
            self.end = self.pos + bytes_read as u64;
        }
        self.pos += bytes_read as u64;
        Ok(bytes_read)
    }
}
