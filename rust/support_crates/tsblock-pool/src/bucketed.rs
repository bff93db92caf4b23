//! Size-classed buffer pool with a limit on the total bytes handed out.

use std::sync::{Mutex, PoisonError};

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tsblock_common::{Result, error::Error, verify_arg};

use crate::{ChunkPool, PooledBytes};

/// Configuration of a [`BucketedPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketedPoolConfig {
    /// Capacity of the smallest size class.
    pub min_bucket_size: usize,
    /// Capacity of the largest size class. Larger requests are served unpooled.
    pub max_bucket_size: usize,
    /// Multiplier between consecutive size classes.
    pub growth_factor: usize,
    /// Upper bound on the bytes handed out and not yet returned; `0` disables the limit.
    pub max_total_bytes: u64,
}

impl Default for BucketedPoolConfig {
    fn default() -> Self {
        BucketedPoolConfig {
            min_bucket_size: 64 * 1024,
            max_bucket_size: 64 * 1024 * 1024,
            growth_factor: 2,
            max_total_bytes: 0,
        }
    }
}

impl BucketedPoolConfig {
    pub fn validate(&self) -> Result<()> {
        verify_arg!(min_bucket_size, self.min_bucket_size > 0);
        verify_arg!(max_bucket_size, self.max_bucket_size >= self.min_bucket_size);
        verify_arg!(growth_factor, self.growth_factor >= 2);
        Ok(())
    }

    /// Capacities of all size classes, ascending.
    pub fn bucket_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut size = self.min_bucket_size;
        while size <= self.max_bucket_size {
            sizes.push(size);
            match size.checked_mul(self.growth_factor) {
                Some(next) => size = next,
                None => break,
            }
        }
        sizes
    }
}

/// A [`ChunkPool`] keeping one free list per size class.
///
/// `get(n)` serves the smallest class whose capacity is at least `n`, reusing
/// a returned buffer when one is available. Requests above the largest class are
/// allocated exactly and dropped on return. Every handed-out buffer is charged
/// against `max_total_bytes` until it is returned.
pub struct BucketedPool {
    sizes: Vec<usize>,
    buckets: Vec<Mutex<Vec<BytesMut>>>,
    max_total: u64,
    used_total: Mutex<u64>,
}

impl BucketedPool {
    pub fn new(config: &BucketedPoolConfig) -> Result<BucketedPool> {
        config.validate()?;
        let sizes = config.bucket_sizes();
        let buckets = sizes.iter().map(|_| Mutex::new(Vec::new())).collect();
        Ok(BucketedPool {
            sizes,
            buckets,
            max_total: config.max_total_bytes,
            used_total: Mutex::new(0),
        })
    }

    /// Bytes currently handed out and not yet returned.
    pub fn used_total(&self) -> u64 {
        *self.used_total.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of idle buffers kept for reuse across all size classes.
    pub fn pooled_buffers(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    fn bucket_index(&self, size: usize) -> Option<usize> {
        self.sizes.iter().position(|&bucket| bucket >= size)
    }

    fn charge(&self, requested: usize, amount: usize) -> Result<()> {
        let mut used = self.used_total.lock().unwrap_or_else(PoisonError::into_inner);
        if self.max_total > 0 && *used + amount as u64 > self.max_total {
            return Err(Error::pool_exhausted(requested, self.max_total));
        }
        *used += amount as u64;
        Ok(())
    }

    fn refund(&self, amount: usize) {
        let mut used = self.used_total.lock().unwrap_or_else(PoisonError::into_inner);
        *used = used.saturating_sub(amount as u64);
    }
}

impl ChunkPool for BucketedPool {
    fn get(&self, min_size: usize) -> Result<PooledBytes> {
        let Some(idx) = self.bucket_index(min_size) else {
            self.charge(min_size, min_size)?;
            return Ok(PooledBytes::unpooled(min_size));
        };

        let bucket_size = self.sizes[idx];
        self.charge(min_size, bucket_size)?;
        let reused = self.buckets[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let buf = reused.unwrap_or_else(|| BytesMut::with_capacity(bucket_size));
        Ok(PooledBytes::new(buf, bucket_size))
    }

    fn put(&self, buf: PooledBytes) {
        let charged = buf.charged();
        self.refund(charged);

        let Some(idx) = self.sizes.iter().position(|&bucket| bucket == charged) else {
            return;
        };
        let mut buf = buf.into_inner();
        buf.clear();
        // Views frozen from this buffer may still be alive; the allocation can
        // only be reused once they are all gone.
        if buf.try_reclaim(charged) && buf.capacity() >= charged {
            self.buckets[idx]
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(buf);
        }
    }
}
