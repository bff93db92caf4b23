//! Reusable byte buffers for chunk loading.
//!
//! - [`ChunkPool`]: the allocation contract (`get(min_size)` / `put(buffer)`).
//! - [`PooledBytes`]: a fixed-capacity buffer handed out by a pool.
//! - [`BucketedPool`]: a size-classed pool with an optional limit on the total
//!   number of bytes handed out at any time.

use std::ops::{Deref, DerefMut};

use bytes::{Bytes, BytesMut};
use tsblock_common::Result;

pub mod bucketed;

pub use bucketed::{BucketedPool, BucketedPoolConfig};

/// Size-classed allocator of reusable byte buffers.
///
/// Implementations must be safe to use from many fetch tasks concurrently.
pub trait ChunkPool: Send + Sync + 'static {
    /// Returns an empty buffer with a capacity of at least `min_size` bytes.
    fn get(&self, min_size: usize) -> Result<PooledBytes>;

    /// Returns a buffer obtained from [`ChunkPool::get`] to the pool.
    fn put(&self, buf: PooledBytes);
}

/// A byte buffer obtained from a [`ChunkPool`].
///
/// The buffer remembers the capacity it was charged for, so that the pool can
/// account for it on return even after the content has been frozen into shared
/// views with [`PooledBytes::split_frozen`].
#[derive(Debug)]
pub struct PooledBytes {
    buf: BytesMut,
    charged: usize,
}

impl PooledBytes {
    /// Wraps a freshly allocated buffer; `charged` is the capacity accounted by the pool.
    pub fn new(buf: BytesMut, charged: usize) -> PooledBytes {
        PooledBytes { buf, charged }
    }

    /// Allocates an unpooled buffer, for pools that pass oversize requests through.
    pub fn unpooled(capacity: usize) -> PooledBytes {
        PooledBytes::new(BytesMut::with_capacity(capacity), capacity)
    }

    /// The capacity this buffer was charged for when handed out.
    pub fn charged(&self) -> usize {
        self.charged
    }

    /// Number of bytes that can still be appended without reallocation.
    pub fn remaining_capacity(&self) -> usize {
        self.buf.capacity() - self.buf.len()
    }

    /// Appends `data` if it fits into the remaining capacity.
    ///
    /// Returns `false`, leaving the buffer untouched, when it does not: a pooled
    /// buffer never grows past the capacity it was handed out with.
    pub fn try_extend(&mut self, data: &[u8]) -> bool {
        if data.len() > self.remaining_capacity() {
            return false;
        }
        self.buf.extend_from_slice(data);
        true
    }

    /// Freezes the current content into an immutable view sharing this buffer's
    /// allocation, leaving the buffer empty with the remaining capacity.
    pub fn split_frozen(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// Gives the pool access to the underlying buffer.
    pub fn inner_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }
}

impl Deref for PooledBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBytes {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl AsRef<[u8]> for PooledBytes {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/// A pool that does not pool: every `get` allocates and every `put` frees.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnpooledAllocator;

impl ChunkPool for UnpooledAllocator {
    fn get(&self, min_size: usize) -> Result<PooledBytes> {
        Ok(PooledBytes::unpooled(min_size))
    }

    fn put(&self, _buf: PooledBytes) {}
}
