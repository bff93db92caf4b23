//! A loaded block: its segments and the shared resources of its chunk readers.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tsblock_common::Result;
use tsblock_io::ReadAt;
use tsblock_objectstore::{ObjectKey, ObjectStore};
use tsblock_partition::{GapPartitioner, Partitioner};
use tsblock_pool::{BucketedPool, BucketedPoolConfig, ChunkPool};
use tsblock_workflow::FetchPool;

use crate::{config::ChunkReaderConfig, reader::ChunkReader, segments::SegmentSet};

/// Chunk segments of one block together with everything a [`ChunkReader`] needs
/// to load from them: the buffer pool, the range partitioner and the fetch pool.
///
/// Every reader created with [`Block::chunk_reader`] holds a claim on the block
/// until it is closed, so the owner can drain readers before unloading.
pub struct Block {
    id: String,
    segments: SegmentSet,
    pool: Arc<dyn ChunkPool>,
    partitioner: Arc<dyn Partitioner>,
    fetch_pool: Arc<FetchPool>,
    config: ChunkReaderConfig,
    pending_readers: PendingReaders,
}

impl Block {
    pub fn builder(id: impl Into<String>) -> BlockBuilder {
        BlockBuilder::new(id.into())
    }

    /// Opens a block stored under `block_dir` with default resources, checking
    /// the header of every segment.
    pub fn open(
        store: &dyn ObjectStore,
        block_dir: &ObjectKey,
        segment_count: usize,
        config: ChunkReaderConfig,
    ) -> Result<Arc<Block>> {
        let segments = SegmentSet::open(store, block_dir, segment_count)?;
        segments.verify_headers()?;
        Block::builder(block_dir.as_str())
            .segments(segments)
            .config(config)
            .build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn segments(&self) -> &SegmentSet {
        &self.segments
    }

    pub fn pool(&self) -> &dyn ChunkPool {
        self.pool.as_ref()
    }

    pub fn partitioner(&self) -> &dyn Partitioner {
        self.partitioner.as_ref()
    }

    pub fn fetch_pool(&self) -> &FetchPool {
        &self.fetch_pool
    }

    pub fn config(&self) -> &ChunkReaderConfig {
        &self.config
    }

    /// Creates a chunk reader and registers it as pending on this block.
    pub fn chunk_reader(self: &Arc<Self>) -> ChunkReader {
        self.pending_readers.add();
        ChunkReader::new(self.clone())
    }

    /// Number of readers created and not yet closed.
    pub fn pending_readers(&self) -> usize {
        self.pending_readers.count()
    }

    /// Blocks until every reader of this block has been closed.
    pub fn wait_for_pending_readers(&self) {
        self.pending_readers.wait_idle();
    }

    pub(crate) fn release_reader(&self) {
        self.pending_readers.remove();
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("segments", &self.segments.len())
            .field("config", &self.config)
            .field("pending_readers", &self.pending_readers())
            .finish()
    }
}

#[derive(Default)]
struct PendingReaders {
    count: Mutex<usize>,
    idle: Condvar,
}

impl PendingReaders {
    fn add(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn remove(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn count(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle(&self) {
        let count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        let _idle = self
            .idle
            .wait_while(count, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Assembles a [`Block`]. Resources that are not set explicitly are derived from
/// the configuration.
pub struct BlockBuilder {
    id: String,
    segments: SegmentSet,
    config: ChunkReaderConfig,
    pool: Option<Arc<dyn ChunkPool>>,
    partitioner: Option<Arc<dyn Partitioner>>,
    fetch_pool: Option<Arc<FetchPool>>,
}

impl BlockBuilder {
    fn new(id: String) -> BlockBuilder {
        BlockBuilder {
            id,
            segments: SegmentSet::default(),
            config: ChunkReaderConfig::default(),
            pool: None,
            partitioner: None,
            fetch_pool: None,
        }
    }

    pub fn segments(mut self, segments: SegmentSet) -> Self {
        self.segments = segments;
        self
    }

    pub fn segment_objects(self, segments: Vec<Arc<dyn ReadAt>>) -> Self {
        self.segments(SegmentSet::new(segments))
    }

    pub fn config(mut self, config: ChunkReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn chunk_pool(mut self, pool: Arc<dyn ChunkPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    pub fn fetch_pool(mut self, fetch_pool: Arc<FetchPool>) -> Self {
        self.fetch_pool = Some(fetch_pool);
        self
    }

    pub fn build(self) -> Result<Arc<Block>> {
        self.config.validate()?;
        let pool: Arc<dyn ChunkPool> = match self.pool {
            Some(pool) => pool,
            None => Arc::new(BucketedPool::new(&BucketedPoolConfig::default())?),
        };
        let partitioner: Arc<dyn Partitioner> = match self.partitioner {
            Some(partitioner) => partitioner,
            None => Arc::new(GapPartitioner::new(self.config.max_gap_size)),
        };
        let fetch_pool = match self.fetch_pool {
            Some(fetch_pool) => fetch_pool,
            None if self.config.fetch_threads == FetchPool::DEFAULT_NUM_THREADS => {
                FetchPool::global()
            }
            None => Arc::new(FetchPool::new(self.config.fetch_threads)?),
        };
        Ok(Arc::new(Block {
            id: self.id,
            segments: self.segments,
            pool,
            partitioner,
            fetch_pool,
            config: self.config,
            pending_readers: PendingReaders::default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use tsblock_common::ErrorKind;

    use super::Block;
    use crate::ChunkReaderConfig;

    #[test]
    fn test_builder_resources_from_config() {
        let block = Block::builder("b")
            .config(ChunkReaderConfig {
                fetch_threads: 3,
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(block.fetch_pool().num_threads(), 3);
        assert!(block.segments().is_empty());
        assert_eq!(block.pending_readers(), 0);

        let err = Block::builder("b")
            .config(ChunkReaderConfig {
                estimated_max_chunk_size: 0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }
}
