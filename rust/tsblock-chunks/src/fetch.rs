//! The fetch-and-parse loop run for each partition of a load.

use std::{
    io::{BufReader, Read},
    time::Instant,
};

use bytes::Bytes;
use tsblock_common::{Result, error::Error};
use tsblock_io::utils::{read_fully, skip};
use tsblock_workflow::CancellationToken;

use crate::{
    encoding::{ChunkHeader, RawChunk},
    output::SeriesEntry,
    reader::{ChunkReader, LoadRequest, PartitionTask},
};

impl ChunkReader {
    /// Reads one partition as a single stream and populates the slots of all of
    /// its requests.
    ///
    /// Each chunk is read with a presumed length: the distance to the next chunk
    /// of the partition, capped at the estimated maximum chunk size. A chunk whose
    /// header announces more than that is fetched again on its own.
    pub(crate) fn load_partition(
        &self,
        task: PartitionTask<'_>,
        output: &[SeriesEntry],
        token: &CancellationToken,
    ) -> Result<()> {
        let PartitionTask {
            segment,
            part,
            requests,
        } = task;
        let max_chunk_size = self.block().config().estimated_max_chunk_size;

        token.check()?;
        let fetch_begin = Instant::now();
        let range_reader = self.block().segments().open_range(segment, part.byte_range())?;
        let mut reader = BufReader::with_capacity(
            max_chunk_size,
            CancellableRead {
                inner: range_reader,
                token,
            },
        );
        self.with_state(|state| {
            state
                .stats
                .record_range_fetch(requests.len(), part.len(), fetch_begin.elapsed())
        });

        let mut buf = vec![0u8; max_chunk_size];
        let mut read_offset = part.start;
        let mut chunks = requests.chunk_by(|a, b| a.offset == b.offset).peekable();
        while let Some(slots) = chunks.next() {
            token.check()?;
            let offset = slots[0].offset;

            // Fast forward over the gap before the chunk.
            if read_offset < offset as u64 {
                let gap = offset as u64 - read_offset;
                let skipped = skip(&mut reader, gap).map_err(|e| {
                    Error::io(format!("fast forward range reader of segment {segment}"), e)
                })?;
                read_offset += skipped;
                if skipped < gap {
                    return Err(Error::io(
                        format!("fast forward range reader of segment {segment}"),
                        std::io::ErrorKind::UnexpectedEof.into(),
                    ));
                }
            }

            let next_offset = chunks.peek().map(|next| next[0].offset);
            let presumed_len = match next_offset {
                Some(next) => max_chunk_size.min((next - offset) as usize),
                None => max_chunk_size,
            };
            let chunk = &mut buf[..presumed_len];
            let n = read_fully(&mut reader, chunk).map_err(|e| {
                Error::io(format!("read range for seq {segment} offset {offset:#x}"), e)
            })?;
            read_offset += n as u64;
            // The partition range may end within the presumed length of its last
            // chunk; anywhere else the stream must deliver the full length.
            if n < presumed_len && next_offset.is_some() {
                return Err(Error::io(
                    format!("read range for seq {segment} offset {offset:#x}"),
                    std::io::ErrorKind::UnexpectedEof.into(),
                ));
            }

            let chunk = &chunk[..n];
            let header = ChunkHeader::parse(chunk)
                .map_err(|reason| Error::malformed_chunk_header(segment, offset, reason))?;
            if header.encoded_len() <= chunk.len() {
                self.with_state(|state| -> Result<()> {
                    let data = state
                        .slabs
                        .save(self.block().pool(), &chunk[header.payload_range()])?;
                    populate(output, slots, &header, data, |len| {
                        state.stats.record_touched(len)
                    })
                })?;
                continue;
            }

            self.refetch_chunk(segment, offset, &header, slots, output, token)?;
        }
        Ok(())
    }

    /// Fetches a chunk that is longer than the bytes read for it so far.
    fn refetch_chunk(
        &self,
        segment: u32,
        offset: u32,
        header: &ChunkHeader,
        slots: &[LoadRequest],
        output: &[SeriesEntry],
        token: &CancellationToken,
    ) -> Result<()> {
        let chunk_len = header.encoded_len();
        log::warn!(
            "block {}: chunk {segment}:{offset:#x} is {chunk_len} bytes, longer than \
             the estimated maximum of {}; fetching it separately",
            self.block().id(),
            self.block().config().estimated_max_chunk_size
        );

        if (offset as u64).checked_add(chunk_len as u64).is_none() {
            return Err(Error::malformed_chunk_header(
                segment,
                offset,
                format!("chunk length {chunk_len} runs past any segment offset"),
            ));
        }

        token.check()?;
        let pool = self.block().pool();
        let fetch_begin = Instant::now();
        let fetched = self
            .block()
            .segments()
            .fetch_range(segment, offset, chunk_len, pool)?;
        let result = self.with_state(|state| -> Result<()> {
            state
                .stats
                .record_refetch(fetched.len() as u64, fetch_begin.elapsed());
            let data = state.slabs.save(pool, &fetched[header.payload_range()])?;
            populate(output, slots, header, data, |len| {
                state.stats.record_touched(len)
            })
        });
        pool.put(fetched);
        result
    }
}

/// Hands the same payload view to every slot registered for one chunk.
fn populate(
    output: &[SeriesEntry],
    slots: &[LoadRequest],
    header: &ChunkHeader,
    data: Bytes,
    mut touched: impl FnMut(usize),
) -> Result<()> {
    for request in slots {
        let chunk = RawChunk::new(header.encoding, data.clone());
        output[request.slot.series_entry].populate(request.slot.chunk, chunk)?;
        touched(data.len());
    }
    Ok(())
}

/// Fails every read once the token is cancelled.
struct CancellableRead<'a, R> {
    inner: R,
    token: &'a CancellationToken,
}

impl<R: Read> Read for CancellableRead<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.token.check_io()?;
        self.inner.read(buf)
    }
}
