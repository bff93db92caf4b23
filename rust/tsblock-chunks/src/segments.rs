//! Range-read client over the segment objects of one block.

use std::{ops::Range, sync::Arc};

use tsblock_common::{Result, error::Error};
use tsblock_io::{RangeReader, ReadAt};
use tsblock_objectstore::{ObjectStore, key::ObjectKey};
use tsblock_pool::{ChunkPool, PooledBytes};

use crate::encoding::{SEGMENT_HEADER_SIZE, verify_segment_header};

/// The chunk segment objects of a block, indexed by zero-based sequence number.
#[derive(Clone, Default)]
pub struct SegmentSet {
    segments: Vec<Arc<dyn ReadAt>>,
}

impl SegmentSet {
    pub fn new(segments: Vec<Arc<dyn ReadAt>>) -> SegmentSet {
        SegmentSet { segments }
    }

    /// Opens `segment_count` segments of the block stored under `block_dir`.
    ///
    /// Segment `seq` lives at `{block_dir}/chunks/{seq + 1:06}`.
    pub fn open(
        store: &dyn ObjectStore,
        block_dir: &ObjectKey,
        segment_count: usize,
    ) -> Result<SegmentSet> {
        let segments = (0..segment_count)
            .map(|seq| {
                let key = segment_key(block_dir, seq)?;
                store
                    .open(&key)
                    .map_err(|e| Error::io(format!("open segment {key}"), e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SegmentSet { segments })
    }

    /// Reads the header of every segment and checks its magic and version.
    pub fn verify_headers(&self) -> Result<()> {
        for (seq, object) in self.segments.iter().enumerate() {
            let header = object
                .read_at(0..SEGMENT_HEADER_SIZE as u64)
                .map_err(|e| Error::io(format!("read header of segment {seq}"), e))?;
            verify_segment_header(&header)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, segment: u32) -> Result<&Arc<dyn ReadAt>> {
        self.segments
            .get(segment as usize)
            .ok_or_else(|| Error::invalid_reference(segment, self.segments.len()))
    }

    /// Returns a streaming reader over `range` of the segment.
    ///
    /// No I/O happens until the reader is read from. Reads past the end of the
    /// segment end the stream early rather than failing.
    pub fn open_range(
        &self,
        segment: u32,
        range: Range<u64>,
    ) -> Result<RangeReader<Arc<dyn ReadAt>>> {
        let object = self.get(segment)?;
        Ok(RangeReader::new(object.clone(), range))
    }

    /// Reads `len` bytes at `offset` of the segment into a buffer taken from
    /// `pool`.
    ///
    /// Fails with [`ErrorKind::ShortRead`] when the segment ends before
    /// `offset + len`; nothing is taken from the pool in that case. On success
    /// the buffer holds exactly `len` bytes, and the caller owns it and must
    /// return it to `pool`.
    ///
    /// [`ErrorKind::ShortRead`]: tsblock_common::ErrorKind::ShortRead
    pub fn fetch_range(
        &self,
        segment: u32,
        offset: u32,
        len: usize,
        pool: &dyn ChunkPool,
    ) -> Result<PooledBytes> {
        let object = self.get(segment)?;
        let end = (offset as u64).checked_add(len as u64).ok_or_else(|| {
            Error::invalid_arg("len", format!("{offset} + {len} overflows a segment offset"))
        })?;
        let range = offset as u64..end;
        let bytes = object
            .read_at(range.clone())
            .map_err(|e| Error::io(format!("read range {range:?} of segment {segment}"), e))?;
        if bytes.len() != len {
            return Err(Error::short_read(segment, offset, len, bytes.len()));
        }

        let mut buf = pool.get(len)?;
        if !buf.try_extend(&bytes) {
            pool.put(buf);
            return Err(Error::invalid_operation(format!(
                "fit {len} bytes into a pooled buffer"
            )));
        }
        Ok(buf)
    }
}

pub fn segment_key(block_dir: &ObjectKey, seq: usize) -> Result<ObjectKey> {
    block_dir.join(&format!("chunks/{:06}", seq + 1))
}
