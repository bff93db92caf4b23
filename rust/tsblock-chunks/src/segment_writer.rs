//! Producer side of the segment format.

use tsblock_common::{Result, error::Error};
use tsblock_io::SealingWrite;

use crate::{
    chunk_ref::ChunkRef,
    encoding::{ChunkEncoding, encode_chunk, encode_segment_header},
};

/// Writes one chunk segment: the segment header followed by encoded chunks.
pub struct SegmentWriter<W> {
    writer: W,
    segment: u32,
    position: u64,
    chunk_count: usize,
    scratch: Vec<u8>,
}

impl<W: SealingWrite> SegmentWriter<W> {
    /// Starts segment `segment` (zero-based sequence number) by writing its header.
    pub fn new(mut writer: W, segment: u32) -> Result<SegmentWriter<W>> {
        let mut header = Vec::new();
        encode_segment_header(&mut header);
        writer
            .write_all(&header)
            .map_err(|e| Error::io(format!("write header of segment {segment}"), e))?;
        Ok(SegmentWriter {
            writer,
            segment,
            position: header.len() as u64,
            chunk_count: 0,
            scratch: Vec::new(),
        })
    }

    /// Appends a chunk and returns its reference.
    pub fn append(&mut self, encoding: ChunkEncoding, payload: &[u8]) -> Result<ChunkRef> {
        let offset = u32::try_from(self.position).map_err(|_| {
            Error::invalid_operation(format!(
                "append chunk past the addressable range of segment {}",
                self.segment
            ))
        })?;
        self.scratch.clear();
        let len = encode_chunk(encoding, payload, &mut self.scratch);
        self.writer
            .write_all(&self.scratch)
            .map_err(|e| Error::io(format!("write chunk to segment {}", self.segment), e))?;
        self.position += len as u64;
        self.chunk_count += 1;
        Ok(ChunkRef::new(self.segment, offset))
    }

    /// Bytes written so far, the segment header included.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Seals the segment and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer
            .seal()
            .map_err(|e| Error::io(format!("seal segment {}", self.segment), e))?;
        Ok(self.writer)
    }
}
