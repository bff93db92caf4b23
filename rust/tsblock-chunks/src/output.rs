//! Output slots filled by [`ChunkReader::load`](crate::ChunkReader::load).

use std::sync::OnceLock;

use tsblock_common::{Result, error::Error};

use crate::encoding::RawChunk;

/// Addresses one output slot: the chunk cell `chunk` of the series entry
/// `series_entry` in the slice passed to `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex {
    pub series_entry: usize,
    pub chunk: usize,
}

impl SlotIndex {
    pub fn new(series_entry: usize, chunk: usize) -> SlotIndex {
        SlotIndex {
            series_entry,
            chunk,
        }
    }
}

/// The chunks of one series, as a fixed number of write-once cells.
///
/// Cells are filled from the fetch tasks without further synchronization; each
/// cell accepts exactly one chunk.
#[derive(Debug, Default)]
pub struct SeriesEntry {
    chunks: Vec<OnceLock<RawChunk>>,
}

impl SeriesEntry {
    /// Creates an entry with `chunk_count` empty cells.
    pub fn with_chunks(chunk_count: usize) -> SeriesEntry {
        SeriesEntry {
            chunks: (0..chunk_count).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the chunk loaded into cell `index`, if any.
    pub fn chunk(&self, index: usize) -> Option<&RawChunk> {
        self.chunks.get(index).and_then(OnceLock::get)
    }

    pub fn is_populated(&self, index: usize) -> bool {
        self.chunk(index).is_some()
    }

    pub fn populated_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.get().is_some()).count()
    }

    pub fn into_chunks(self) -> Vec<Option<RawChunk>> {
        self.chunks.into_iter().map(OnceLock::into_inner).collect()
    }

    pub(crate) fn has_cell(&self, index: usize) -> bool {
        index < self.chunks.len()
    }

    pub(crate) fn populate(&self, index: usize, chunk: RawChunk) -> Result<()> {
        let cell = self
            .chunks
            .get(index)
            .ok_or_else(|| Error::invalid_arg("chunk", format!("no chunk cell {index}")))?;
        cell.set(chunk)
            .map_err(|_| Error::invalid_operation(format!("populate chunk cell {index} twice")))
    }
}

/// Checks that `slot` names an existing cell of `output`.
pub(crate) fn verify_slot(output: &[SeriesEntry], slot: SlotIndex) -> Result<()> {
    let Some(entry) = output.get(slot.series_entry) else {
        return Err(Error::invalid_arg(
            "series_entry",
            format!(
                "slot {slot:?} refers to series entry {} of {}",
                slot.series_entry,
                output.len()
            ),
        ));
    };
    if !entry.has_cell(slot.chunk) {
        return Err(Error::invalid_arg(
            "chunk",
            format!(
                "slot {slot:?} refers to chunk cell {} of {}",
                slot.chunk,
                entry.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tsblock_common::ErrorKind;

    use super::{SeriesEntry, SlotIndex, verify_slot};
    use crate::encoding::{ChunkEncoding, RawChunk};

    #[test]
    fn test_cells_are_write_once() {
        let entry = SeriesEntry::with_chunks(2);
        let chunk = RawChunk::new(ChunkEncoding::XOR, Bytes::from_static(b"abc"));
        entry.populate(1, chunk.clone()).unwrap();
        assert!(!entry.is_populated(0));
        assert_eq!(entry.chunk(1), Some(&chunk));

        let err = entry.populate(1, chunk.clone()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
        assert_eq!(entry.populated_count(), 1);
        assert_eq!(entry.into_chunks(), vec![None, Some(chunk)]);
    }

    #[test]
    fn test_verify_slot() {
        let output = vec![SeriesEntry::with_chunks(1), SeriesEntry::with_chunks(3)];
        verify_slot(&output, SlotIndex::new(1, 2)).unwrap();
        assert!(verify_slot(&output, SlotIndex::new(0, 1)).is_err());
        assert!(verify_slot(&output, SlotIndex::new(2, 0)).is_err());
    }
}
