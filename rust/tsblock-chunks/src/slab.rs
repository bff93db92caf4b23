//! Arena of pooled slabs holding loaded chunk payloads.

use bytes::Bytes;
use tsblock_common::{Result, error::Error};
use tsblock_pool::{ChunkPool, PooledBytes};

/// Packs chunk payloads back to back into pooled buffers.
///
/// A new slab is taken from the pool whenever the payload does not fit into the
/// remaining capacity of the current one. Payloads are handed out as frozen views
/// into the slab, so they stay valid for as long as the caller holds them; the
/// pool gets the memory back for reuse only once all views are gone.
#[derive(Debug, Default)]
pub struct SlabArena {
    slabs: Vec<PooledBytes>,
}

impl SlabArena {
    pub fn new() -> SlabArena {
        SlabArena::default()
    }

    /// Copies `data` into the current slab and returns a view of the copy.
    pub fn save(&mut self, pool: &dyn ChunkPool, data: &[u8]) -> Result<Bytes> {
        if data.is_empty() {
            return Ok(Bytes::new());
        }
        let fits = self
            .slabs
            .last()
            .is_some_and(|slab| slab.remaining_capacity() >= data.len());
        if !fits {
            self.slabs.push(pool.get(data.len())?);
        }
        let Some(slab) = self.slabs.last_mut() else {
            return Err(Error::invalid_operation("save into an empty slab list"));
        };
        if !slab.try_extend(data) {
            return Err(Error::invalid_operation(format!(
                "save {} bytes into a slab without room",
                data.len()
            )));
        }
        Ok(slab.split_frozen())
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Returns every slab to `pool`; returns the number of slabs released.
    pub fn release(&mut self, pool: &dyn ChunkPool) -> usize {
        let count = self.slabs.len();
        for slab in self.slabs.drain(..) {
            pool.put(slab);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use tsblock_pool::{BucketedPool, BucketedPoolConfig, UnpooledAllocator};

    use super::SlabArena;

    #[test]
    fn test_payloads_share_a_slab_until_full() {
        let pool = UnpooledAllocator;
        let mut arena = SlabArena::new();
        let a = arena.save(&pool, &[1u8; 10]).unwrap();
        assert_eq!(arena.slab_count(), 1);
        // The first slab was sized for exactly 10 bytes.
        let b = arena.save(&pool, &[2u8; 5]).unwrap();
        assert_eq!(arena.slab_count(), 2);
        assert_eq!(a.as_ref(), &[1u8; 10]);
        assert_eq!(b.as_ref(), &[2u8; 5]);

        assert!(arena.save(&pool, &[]).unwrap().is_empty());
        assert_eq!(arena.slab_count(), 2);
        assert_eq!(arena.release(&pool), 2);
        assert_eq!(arena.slab_count(), 0);
    }

    #[test]
    fn test_views_outlive_release() {
        let pool = BucketedPool::new(&BucketedPoolConfig {
            min_bucket_size: 64,
            max_bucket_size: 256,
            growth_factor: 2,
            max_total_bytes: 0,
        })
        .unwrap();
        let mut arena = SlabArena::new();
        let views = (0..4u8)
            .map(|i| arena.save(&pool, &[i; 16]).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(arena.slab_count(), 1);
        arena.release(&pool);
        assert_eq!(pool.used_total(), 0);

        // The views keep the slab alive, so it is not reused.
        let mut other = SlabArena::new();
        let overwrite = other.save(&pool, &[0xff; 64]).unwrap();
        for (i, view) in views.iter().enumerate() {
            assert_eq!(view.as_ref(), &[i as u8; 16]);
        }
        assert_eq!(overwrite.as_ref(), &[0xff; 64]);
    }
}
