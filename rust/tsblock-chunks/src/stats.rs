use std::time::Duration;

/// Counters accumulated by one chunk reader across all of its loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFetchStats {
    /// Range reads issued, corrective re-fetches included.
    pub chunks_fetch_count: usize,
    /// Chunk requests covered by the partition range reads.
    pub chunks_fetched: usize,
    /// Bytes requested from storage, corrective re-fetches included.
    pub chunks_fetched_size_sum: u64,
    pub chunks_fetch_duration_sum: Duration,
    /// Corrective re-fetches of chunks longer than the presumed length.
    pub chunks_refetched: usize,
    /// Output slots populated.
    pub chunks_touched: usize,
    /// Payload bytes delivered to output slots.
    pub chunks_touched_size_sum: u64,
}

impl ChunkFetchStats {
    pub(crate) fn record_range_fetch(&mut self, requests: usize, size: u64, elapsed: Duration) {
        self.chunks_fetch_count += 1;
        self.chunks_fetched += requests;
        self.chunks_fetched_size_sum += size;
        self.chunks_fetch_duration_sum += elapsed;
    }

    pub(crate) fn record_refetch(&mut self, size: u64, elapsed: Duration) {
        self.chunks_fetch_count += 1;
        self.chunks_refetched += 1;
        self.chunks_fetched_size_sum += size;
        self.chunks_fetch_duration_sum += elapsed;
    }

    pub(crate) fn record_touched(&mut self, payload_len: usize) {
        self.chunks_touched += 1;
        self.chunks_touched_size_sum += payload_len as u64;
    }
}
