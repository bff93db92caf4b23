//! Chunk addressing within a block.

use std::fmt;

/// Explicit location of a chunk: the segment sequence number within the block
/// and the byte offset of the chunk within that segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkLocation {
    pub segment: u32,
    pub offset: u32,
}

impl ChunkLocation {
    pub fn new(segment: u32, offset: u32) -> ChunkLocation {
        ChunkLocation { segment, offset }
    }
}

impl fmt::Display for ChunkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:#x}", self.segment, self.offset)
    }
}

/// Packed chunk reference as stored by the block index: the segment sequence
/// number in the upper 32 bits and the segment offset in the lower 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkRef(pub u64);

impl ChunkRef {
    pub fn new(segment: u32, offset: u32) -> ChunkRef {
        ChunkRef(((segment as u64) << 32) | offset as u64)
    }

    pub fn segment(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn offset(self) -> u32 {
        self.0 as u32
    }

    pub fn location(self) -> ChunkLocation {
        ChunkLocation::new(self.segment(), self.offset())
    }
}

impl From<ChunkRef> for ChunkLocation {
    fn from(r: ChunkRef) -> Self {
        r.location()
    }
}

impl From<ChunkLocation> for ChunkRef {
    fn from(loc: ChunkLocation) -> Self {
        ChunkRef::new(loc.segment, loc.offset)
    }
}

impl From<u64> for ChunkRef {
    fn from(packed: u64) -> Self {
        ChunkRef(packed)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkLocation, ChunkRef};

    #[test]
    fn test_packed_layout() {
        let r = ChunkRef::new(3, 0x10);
        assert_eq!(r.0, 0x0000_0003_0000_0010);
        assert_eq!(r.segment(), 3);
        assert_eq!(r.offset(), 0x10);

        let r = ChunkRef::from(u64::MAX);
        assert_eq!(r.location(), ChunkLocation::new(u32::MAX, u32::MAX));
        assert_eq!(ChunkRef::from(r.location()), r);
        assert_eq!(ChunkLocation::new(1, 255).to_string(), "1:0xff");
    }
}
