//! Chunk metadata header and status bytes
//!
//! ```text
//! ┌────────────┬────────────┬─────────────┐
//! │ chunk_size │ num_chunks │ total_bytes │
//! │ u16 LE     │ u16 LE     │ u32 LE      │
//! └────────────┴────────────┴─────────────┘
//! ```

use core::ops::Range;

use nodecom_protocol::{CodecError, Decode, Encode, Reader, WireForm, Writer};

/// Encoded size of [`ChunkMetadata`]
pub const METADATA_SIZE: usize = 8;

/// Preamble sent before a chunked payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkMetadata {
    /// Sender's chunk size (0 = unchunked)
    pub chunk_size: u16,
    /// Number of chunks that follow
    pub num_chunks: u16,
    /// Payload length in bytes
    pub total_bytes: u32,
}

/// `ceil(total / chunk_size)`, or 0 for an unchunked transfer
pub fn chunk_count(total_bytes: u32, chunk_size: u16) -> u32 {
    if chunk_size == 0 {
        return 0;
    }
    total_bytes.div_ceil(u32::from(chunk_size))
}

impl ChunkMetadata {
    /// Header for a payload of `total` bytes split into `chunk_size` pieces
    ///
    /// Returns `None` if the payload length or chunk count overflow their
    /// header fields.
    pub fn for_payload(total: usize, chunk_size: u16) -> Option<Self> {
        let total_bytes = u32::try_from(total).ok()?;
        let num_chunks = u16::try_from(chunk_count(total_bytes, chunk_size)).ok()?;
        Some(Self {
            chunk_size,
            num_chunks,
            total_bytes,
        })
    }

    /// Whether `num_chunks` matches the other two fields
    ///
    /// A zero `chunk_size` only describes an empty payload.
    pub fn is_consistent(&self) -> bool {
        (self.chunk_size > 0 || self.total_bytes == 0)
            && chunk_count(self.total_bytes, self.chunk_size) == u32::from(self.num_chunks)
    }

    /// Payload length as a buffer size
    pub fn total_len(&self) -> usize {
        self.total_bytes as usize
    }

    /// Length of chunk `index`
    ///
    /// Every chunk is `chunk_size` long except the last, which carries the
    /// remainder.
    pub fn chunk_len(&self, index: u16) -> usize {
        if u32::from(index) + 1 < u32::from(self.num_chunks) {
            return usize::from(self.chunk_size);
        }
        let before = usize::from(self.chunk_size) * usize::from(self.num_chunks.saturating_sub(1));
        self.total_len().saturating_sub(before)
    }

    /// Byte range of chunk `index` within the payload
    pub fn chunk_range(&self, index: u16) -> Range<usize> {
        let start = usize::from(self.chunk_size) * usize::from(index);
        start..start + self.chunk_len(index)
    }
}

impl Encode for ChunkMetadata {
    const FORM: WireForm = WireForm::Fixed(METADATA_SIZE);

    fn encoded_len(&self) -> usize {
        METADATA_SIZE
    }

    fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut writer = Writer::new(out);
        writer.put(self.chunk_size)?;
        writer.put(self.num_chunks)?;
        writer.put(self.total_bytes)?;
        Ok(writer.finish())
    }
}

impl Decode for ChunkMetadata {
    fn decode(input: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(input);
        Ok(Self {
            chunk_size: reader.get()?,
            num_chunks: reader.get()?,
            total_bytes: reader.get()?,
        })
    }
}

/// Receiver's answer to a header or chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChunkStatus {
    /// Received, continue with the next chunk
    Ok = 0,
    /// Size mismatch or data not ready, send the same chunk again
    NotReady = 1,
    /// Sender's chunk size exceeds the receiver's capacity
    Rejected = 2,
}

impl ChunkStatus {
    /// Parse a status byte
    ///
    /// Unknown values are treated as [`ChunkStatus::NotReady`] so they cause a
    /// resend rather than an advance.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => ChunkStatus::Ok,
            2 => ChunkStatus::Rejected,
            _ => ChunkStatus::NotReady,
        }
    }

    /// Wire value
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Returns true if the sender may advance
    pub fn is_ok(self) -> bool {
        matches!(self, ChunkStatus::Ok)
    }
}
