//! Chunk read path of a time-series block.
//!
//! A [`Block`] exposes the chunk segments of one block. A [`ChunkReader`] created
//! from it collects chunk registrations, then loads them in one batch: requests
//! are grouped per segment, nearby chunks are coalesced into range reads, the
//! range reads run concurrently, and each chunk payload is copied into pooled
//! slabs and handed to its output slot as a [`RawChunk`].

pub mod block;
pub mod chunk_ref;
pub mod config;
pub mod encoding;
mod fetch;
pub mod output;
pub mod reader;
pub mod segment_writer;
pub mod segments;
pub mod slab;
pub mod stats;

#[cfg(test)]
mod tests;

pub use block::{Block, BlockBuilder};
pub use chunk_ref::{ChunkLocation, ChunkRef};
pub use config::ChunkReaderConfig;
pub use encoding::{ChunkEncoding, RawChunk};
pub use output::{SeriesEntry, SlotIndex};
pub use reader::ChunkReader;
pub use segment_writer::SegmentWriter;
pub use segments::SegmentSet;
pub use stats::ChunkFetchStats;
