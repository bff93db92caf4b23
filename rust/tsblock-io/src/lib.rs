//! I/O abstractions for immutable block objects:
//! - `ReadAt`: positional reader able to fetch a specified byte range from an object.
//! - `SealingWrite`: sequential writer with a `seal()` operation, committing the object.
//! - `RangeReader`: a streaming `std::io::Read` over one byte range of a `ReadAt`.
//!
//! Provides memory-based and file-based implementations.

use std::{ops::Range, sync::Arc};

use bytes::Bytes;

pub mod file;
pub mod memory;
pub mod range_read;
pub mod utils;

pub use range_read::RangeReader;

/// A conceptual object (file or blob) that supports reading from arbitrary positions.
pub trait ReadAt: Send + Sync + 'static {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads a specified range of bytes from the object.
    ///
    /// **NOTE**: `read_at` should not return with a short read, unless end-of-object
    /// is encountered. A range extending beyond the end of the object is clamped.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes>;

    /// Retrieves the storage profile associated with this reader.
    fn storage_profile(&self) -> StorageProfile;
}

/// Sequential writer with explicit sealing semantics: the written object becomes
/// visible to readers only after [`seal`](SealingWrite::seal) succeeds.
pub trait SealingWrite: Send {
    /// Appends the entire buffer, or fails without a partial write.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes and commits everything written so far. Further writes fail.
    fn seal(&mut self) -> std::io::Result<()>;

    /// Retrieves the storage profile associated with this writer.
    fn storage_profile(&self) -> StorageProfile;
}

/// Characterizes the performance aspects of the underlying storage implementation.
#[derive(Debug, Clone)]
pub struct StorageProfile {
    /// Suggested minimum size for an effective I/O request.
    /// Using buffers smaller than this size may be inefficient, as the round-trip time
    /// could dominate the overall I/O operation time.
    pub min_io_size: usize,

    /// Suggested maximum size for a single I/O request.
    pub max_io_size: usize,
}

impl Default for StorageProfile {
    fn default() -> StorageProfile {
        Self {
            min_io_size: 4 * 1024,
            max_io_size: 4 * 1024 * 1024,
        }
    }
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        self.as_ref().read_at(range)
    }

    fn storage_profile(&self) -> StorageProfile {
        self.as_ref().storage_profile()
    }
}

impl<T> SealingWrite for Box<T>
where
    T: SealingWrite + ?Sized,
{
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.as_mut().write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        self.as_mut().seal()
    }

    fn storage_profile(&self) -> StorageProfile {
        self.as_ref().storage_profile()
    }
}
