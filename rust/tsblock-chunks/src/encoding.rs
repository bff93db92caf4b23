//! Chunk and segment binary layout.
//!
//! A segment starts with an 8-byte header (4-byte magic, 1-byte format version,
//! 3 bytes of padding) followed by concatenated chunks. Each chunk is laid out as
//!
//! ```text
//! [1 byte encoding][uvarint payload length][payload][4 byte CRC32, big-endian]
//! ```
//!
//! The read path parses only the encoding byte and the length prefix; the payload
//! is opaque and the checksum is not verified.

use std::fmt;

use bytes::Bytes;
use tsblock_common::{Result, verify_data};

pub const SEGMENT_MAGIC: u32 = 0x85BD_40DD;
pub const SEGMENT_FORMAT_V1: u8 = 1;
pub const SEGMENT_HEADER_SIZE: usize = 8;
pub const CHUNK_CHECKSUM_SIZE: usize = 4;

/// The one-byte encoding tag at the start of every chunk.
///
/// Unknown tags are preserved as-is: the payload is never interpreted here.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkEncoding(pub u8);

impl ChunkEncoding {
    pub const NONE: ChunkEncoding = ChunkEncoding(0);
    pub const XOR: ChunkEncoding = ChunkEncoding(1);
    pub const HISTOGRAM: ChunkEncoding = ChunkEncoding(2);
    pub const FLOAT_HISTOGRAM: ChunkEncoding = ChunkEncoding(3);

    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::NONE => Some("none"),
            Self::XOR => Some("XOR"),
            Self::HISTOGRAM => Some("histogram"),
            Self::FLOAT_HISTOGRAM => Some("floathistogram"),
            _ => None,
        }
    }
}

impl fmt::Debug for ChunkEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "<unknown {}>", self.0),
        }
    }
}

/// Parsed chunk prefix: encoding tag and payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub encoding: ChunkEncoding,
    pub payload_len: u64,
    /// Bytes taken by the encoding tag and the length prefix.
    pub header_len: usize,
}

impl ChunkHeader {
    /// Parses the header at the start of `buf`.
    ///
    /// `buf` may end anywhere after the header: only the encoding byte and the
    /// length prefix must be present. Returns a description of the problem when
    /// they are not.
    pub fn parse(buf: &[u8]) -> std::result::Result<ChunkHeader, String> {
        let Some((&tag, mut rest)) = buf.split_first() else {
            return Err("reading chunk encoding failed: empty buffer".to_string());
        };
        let varint_start = rest.len();
        let payload_len = prost::encoding::decode_varint(&mut rest)
            .map_err(|e| format!("reading chunk length failed: {e}"))?;
        let header_len = 1 + varint_start - rest.len();
        let header = ChunkHeader {
            encoding: ChunkEncoding(tag),
            payload_len,
            header_len,
        };
        if usize::try_from(payload_len)
            .ok()
            .and_then(|len| len.checked_add(header_len))
            .is_none()
        {
            return Err(format!("chunk length {payload_len} out of range"));
        }
        Ok(header)
    }

    /// Length of the encoded chunk up to the end of the payload (the trailing
    /// checksum excluded).
    pub fn encoded_len(&self) -> usize {
        self.header_len + self.payload_len as usize
    }

    /// Byte range of the payload relative to the chunk start.
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        self.header_len..self.encoded_len()
    }
}

/// Appends one encoded chunk, checksum included, to `out`.
///
/// Returns the number of bytes appended.
pub fn encode_chunk(encoding: ChunkEncoding, payload: &[u8], out: &mut Vec<u8>) -> usize {
    let start = out.len();
    out.push(encoding.0);
    prost::encoding::encode_varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
    let crc = crc32fast::hash(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
    out.len() - start
}

/// Appends the segment header to `out`.
pub fn encode_segment_header(out: &mut Vec<u8>) {
    out.extend_from_slice(&SEGMENT_MAGIC.to_be_bytes());
    out.push(SEGMENT_FORMAT_V1);
    out.extend_from_slice(&[0u8; 3]);
}

/// Checks the magic and format version of the segment header at the start of `buf`.
pub fn verify_segment_header(buf: &[u8]) -> Result<()> {
    verify_data!(segment_header, buf.len() >= SEGMENT_HEADER_SIZE);
    let magic = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    verify_data!(segment_magic, magic == SEGMENT_MAGIC);
    verify_data!(segment_version, buf[4] == SEGMENT_FORMAT_V1);
    Ok(())
}

/// A loaded chunk: its encoding and a view of its payload bytes.
///
/// The payload view shares memory with the chunk reader's slabs.
#[derive(Clone, PartialEq, Eq)]
pub struct RawChunk {
    encoding: ChunkEncoding,
    data: Bytes,
}

impl RawChunk {
    pub fn new(encoding: ChunkEncoding, data: Bytes) -> RawChunk {
        RawChunk { encoding, data }
    }

    pub fn encoding(&self) -> ChunkEncoding {
        self.encoding
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for RawChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawChunk")
            .field("encoding", &self.encoding)
            .field("len", &self.data.len())
            .finish()
    }
}
