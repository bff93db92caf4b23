//! Batched, concurrent loading of registered chunks into output slots.

use std::sync::{Arc, Mutex, PoisonError};

use tsblock_common::Result;
use tsblock_partition::Part;
use tsblock_workflow::{CancellationToken, try_for_each};

use crate::{
    block::Block,
    chunk_ref::ChunkLocation,
    output::{SeriesEntry, SlotIndex, verify_slot},
    slab::SlabArena,
    stats::ChunkFetchStats,
};

/// One registered chunk: where it starts within its segment and which output
/// slot receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoadRequest {
    pub offset: u32,
    pub slot: SlotIndex,
}

/// A run of requests of one segment served by a single range read.
pub(crate) struct PartitionTask<'a> {
    pub segment: u32,
    pub part: Part,
    pub requests: &'a [LoadRequest],
}

#[derive(Default)]
pub(crate) struct ReaderState {
    pub stats: ChunkFetchStats,
    pub slabs: SlabArena,
}

/// Loads chunks of one [`Block`].
///
/// Chunks are registered one at a time with [`ChunkReader::register`] and then
/// fetched together by [`ChunkReader::load`]: requests are grouped per segment,
/// nearby requests are coalesced into range reads and the range reads run
/// concurrently on the block's fetch pool. Loaded payloads live in slabs owned
/// by the reader until it is closed.
pub struct ChunkReader {
    block: Arc<Block>,
    to_load: Vec<Vec<LoadRequest>>,
    state: Mutex<ReaderState>,
    closed: bool,
}

impl ChunkReader {
    pub(crate) fn new(block: Arc<Block>) -> ChunkReader {
        let segment_count = block.segments().len();
        ChunkReader {
            block,
            to_load: vec![Vec::new(); segment_count],
            state: Mutex::new(ReaderState::default()),
            closed: false,
        }
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    /// Schedules the chunk at `location` to be loaded into `slot` by the next
    /// [`ChunkReader::load`].
    ///
    /// Fails without side effects when the segment does not exist in the block.
    pub fn register(&mut self, location: impl Into<ChunkLocation>, slot: SlotIndex) -> Result<()> {
        let location = location.into();
        self.block.segments().get(location.segment)?;
        self.to_load[location.segment as usize].push(LoadRequest {
            offset: location.offset,
            slot,
        });
        Ok(())
    }

    /// Number of registrations waiting for the next load.
    pub fn pending_requests(&self) -> usize {
        self.to_load.iter().map(Vec::len).sum()
    }

    /// Fetches every registered chunk and populates its output slot.
    ///
    /// All slots are checked against `output` before any I/O. The pending
    /// registrations are consumed whether or not the load succeeds. On failure,
    /// the remaining range reads are cancelled and the error of the first failing
    /// read is returned; slots filled by reads that completed stay populated.
    pub fn load(&mut self, output: &[SeriesEntry]) -> Result<()> {
        let segment_count = self.to_load.len();
        let mut to_load = std::mem::replace(&mut self.to_load, vec![Vec::new(); segment_count]);
        for request in to_load.iter().flatten() {
            verify_slot(output, request.slot)?;
        }

        let max_chunk_size = self.block.config().estimated_max_chunk_size as u64;
        for requests in to_load.iter_mut() {
            requests.sort_by_key(|r| r.offset);
        }
        let mut tasks = Vec::new();
        for (segment, requests) in to_load.iter().enumerate() {
            if requests.is_empty() {
                continue;
            }
            let parts = self.block.partitioner().partition(requests.len(), &|i| {
                let start = requests[i].offset as u64;
                (start, start + max_chunk_size)
            });
            tasks.extend(parts.into_iter().map(|part| PartitionTask {
                segment: segment as u32,
                requests: &requests[part.elem_range.clone()],
                part,
            }));
        }
        if tasks.is_empty() {
            return Ok(());
        }

        log::debug!(
            "block {}: loading {} chunks from {} segments in {} range reads",
            self.block.id(),
            to_load.iter().map(Vec::len).sum::<usize>(),
            to_load.iter().filter(|r| !r.is_empty()).count(),
            tasks.len()
        );

        let token = CancellationToken::new();
        let this = &*self;
        try_for_each(
            self.block.fetch_pool(),
            &token,
            tasks,
            |task, token| this.load_partition(task, output, token),
        )
    }

    /// Snapshot of the counters accumulated so far.
    pub fn stats(&self) -> ChunkFetchStats {
        self.with_state(|state| state.stats.clone())
    }

    /// Returns all slabs to the pool and releases the reader's claim on its block.
    pub fn close(mut self) -> Result<()> {
        self.release();
        Ok(())
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ReaderState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let pool = self.block.pool();
        let released = self.with_state(|state| state.slabs.release(pool));
        log::debug!(
            "block {}: chunk reader closed, {released} slabs returned",
            self.block.id()
        );
        self.block.release_reader();
    }
}

impl Drop for ChunkReader {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("block", &self.block.id())
            .field("pending_requests", &self.pending_requests())
            .field("closed", &self.closed)
            .finish()
    }
}
