use std::{
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use tsblock_io::{ReadAt, StorageProfile};
use tsblock_pool::{BucketedPool, BucketedPoolConfig};
use tsblock_workflow::FetchPool;

use crate::{
    Block, ChunkEncoding, ChunkReaderConfig, ChunkRef, SegmentWriter, encoding::encode_chunk,
};

/// A segment written with [`SegmentWriter`], with the payload of every chunk.
pub struct TestSegment {
    pub data: Bytes,
    pub chunks: Vec<(ChunkRef, Vec<u8>)>,
}

/// Writes segment `seq` holding one XOR chunk per payload.
pub fn write_segment(seq: u32, payloads: Vec<Vec<u8>>) -> TestSegment {
    let mut writer = SegmentWriter::new(Vec::new(), seq).unwrap();
    let chunks = payloads
        .into_iter()
        .map(|payload| (writer.append(ChunkEncoding::XOR, &payload).unwrap(), payload))
        .collect();
    TestSegment {
        data: writer.finish().unwrap().into(),
        chunks,
    }
}

/// Builds a headerless segment with each chunk placed at an explicit offset;
/// the space between chunks is zero-filled.
pub fn place_chunks(chunks: &[(u32, &[u8])]) -> Bytes {
    let mut data = Vec::new();
    for &(offset, payload) in chunks {
        assert!(data.len() <= offset as usize, "chunks overlap");
        data.resize(offset as usize, 0);
        encode_chunk(ChunkEncoding::XOR, payload, &mut data);
    }
    data.into()
}

/// Deterministic payload of `len` bytes.
pub fn payload(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

pub fn small_pool() -> Arc<BucketedPool> {
    Arc::new(
        BucketedPool::new(&BucketedPoolConfig {
            min_bucket_size: 256,
            max_bucket_size: 64 * 1024,
            growth_factor: 2,
            max_total_bytes: 0,
        })
        .unwrap(),
    )
}

pub fn config(estimated_max_chunk_size: usize, max_gap_size: u64) -> ChunkReaderConfig {
    ChunkReaderConfig {
        estimated_max_chunk_size,
        max_gap_size,
        ..Default::default()
    }
}

pub fn build_block(
    segments: Vec<Arc<dyn ReadAt>>,
    config: ChunkReaderConfig,
    pool: Arc<BucketedPool>,
    fetch_threads: usize,
) -> Arc<Block> {
    Block::builder("test-block")
        .segment_objects(segments)
        .config(config)
        .chunk_pool(pool)
        .fetch_pool(Arc::new(FetchPool::new(fetch_threads).unwrap()))
        .build()
        .unwrap()
}

pub fn memory_segments(data: impl IntoIterator<Item = Bytes>) -> Vec<Arc<dyn ReadAt>> {
    data.into_iter()
        .map(|d| Arc::new(d) as Arc<dyn ReadAt>)
        .collect()
}

/// Wraps a segment, counting reads and failing those that touch `fail_range`.
pub struct FaultyReadAt {
    inner: Bytes,
    fail_range: Option<Range<u64>>,
    delay: Option<Duration>,
    reads: AtomicUsize,
}

impl FaultyReadAt {
    pub fn new(inner: Bytes) -> FaultyReadAt {
        FaultyReadAt {
            inner,
            fail_range: None,
            delay: None,
            reads: AtomicUsize::new(0),
        }
    }

    /// Sleeps for `delay` before serving each read.
    pub fn slow(inner: Bytes, delay: Duration) -> FaultyReadAt {
        FaultyReadAt {
            delay: Some(delay),
            ..FaultyReadAt::new(inner)
        }
    }

    pub fn failing(inner: Bytes, fail_range: Range<u64>) -> FaultyReadAt {
        FaultyReadAt {
            fail_range: Some(fail_range),
            ..FaultyReadAt::new(inner)
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ReadAt for FaultyReadAt {
    fn size(&self) -> std::io::Result<u64> {
        self.inner.size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let fails = self
            .fail_range
            .as_ref()
            .is_some_and(|fail| range.start < fail.end && fail.start < range.end);
        if fails {
            return Err(std::io::Error::other(format!(
                "injected failure reading {range:?}"
            )));
        }
        self.inner.read_at(range)
    }

    fn storage_profile(&self) -> StorageProfile {
        self.inner.storage_profile()
    }
}
