//! Chunk records received from store shards and their decoded form.
//!
//! A [`ChunkRecord`] is the wire representation: an encoding tag, the time
//! range the chunk covers, and the compressed payload. [`translate_chunk`]
//! turns it into a [`ChunkMeta`] that the series iterators read from.

pub mod xor;

pub use xor::{XorAppender, XorChunk, XorIterator};

use crate::error::{QueryError, Result};
use crate::Timestamp;

/// Chunk encodings understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ChunkEncoding {
    /// Delta-of-delta timestamps with XOR-compressed float values.
    #[default]
    Xor = 0,
}

impl ChunkEncoding {
    /// Creates a ChunkEncoding from a wire tag.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Xor),
            _ => None,
        }
    }

    /// Returns the wire tag of this encoding.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// A chunk as returned by a store shard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkRecord {
    /// Raw encoding tag. Unknown tags are rejected by [`translate_chunk`].
    pub encoding: i32,
    /// Smallest timestamp the chunk may contain.
    pub min_time: Timestamp,
    /// Largest timestamp the chunk may contain.
    pub max_time: Timestamp,
    /// Encoded payload.
    pub data: Vec<u8>,
}

impl ChunkRecord {
    /// Builds an XOR chunk record from time-sorted samples.
    ///
    /// `min_time` and `max_time` are taken from the first and last sample.
    /// An empty sample slice yields an empty chunk with a zero time range.
    pub fn xor(samples: &[(Timestamp, f64)]) -> Self {
        let chunk = XorChunk::encode(samples);
        Self {
            encoding: ChunkEncoding::Xor.as_i32(),
            min_time: samples.first().map_or(0, |s| s.0),
            max_time: samples.last().map_or(0, |s| s.0),
            data: chunk.bytes().to_vec(),
        }
    }
}

/// A decoded chunk tagged with the time range declared by its record.
///
/// The bounds are trusted as given; they are never recomputed from samples.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    /// Declared minimum timestamp.
    pub min_time: Timestamp,
    /// Declared maximum timestamp.
    pub max_time: Timestamp,
    /// The decoded chunk.
    pub chunk: XorChunk,
}

/// Converts a wire chunk into a [`ChunkMeta`].
///
/// Fails with [`QueryError::UnsupportedEncoding`] for any tag other than
/// [`ChunkEncoding::Xor`] and with [`QueryError::ChunkDecode`] for a payload
/// too short to hold a chunk header.
pub fn translate_chunk(record: &ChunkRecord) -> Result<ChunkMeta> {
    match ChunkEncoding::from_i32(record.encoding) {
        Some(ChunkEncoding::Xor) => {}
        None => return Err(QueryError::UnsupportedEncoding(record.encoding)),
    }
    let chunk = XorChunk::from_bytes(&record.data)?;
    Ok(ChunkMeta {
        min_time: record.min_time,
        max_time: record.max_time,
        chunk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_from_i32() {
        assert_eq!(ChunkEncoding::from_i32(0), Some(ChunkEncoding::Xor));
        assert_eq!(ChunkEncoding::from_i32(1), None);
        assert_eq!(ChunkEncoding::from_i32(-1), None);
        assert_eq!(ChunkEncoding::Xor.as_i32(), 0);
    }

    #[test]
    fn test_translate_keeps_declared_bounds() {
        let mut record = ChunkRecord::xor(&[(10, 1.0), (20, 2.0)]);
        // Declared bounds wider than the samples are kept as-is.
        record.min_time = 0;
        record.max_time = 100;

        let meta = translate_chunk(&record).unwrap();
        assert_eq!(meta.min_time, 0);
        assert_eq!(meta.max_time, 100);
        assert_eq!(meta.chunk.num_samples(), 2);
    }

    #[test]
    fn test_translate_rejects_unknown_encoding() {
        let mut record = ChunkRecord::xor(&[(10, 1.0)]);
        record.encoding = 99;

        let err = translate_chunk(&record).unwrap_err();
        assert_eq!(err, QueryError::UnsupportedEncoding(99));
        assert_eq!(err.to_string(), "unrecognized chunk encoding 99");
    }

    #[test]
    fn test_translate_rejects_short_payload() {
        let record = ChunkRecord {
            encoding: ChunkEncoding::Xor.as_i32(),
            min_time: 0,
            max_time: 10,
            data: vec![1],
        };
        assert!(matches!(
            translate_chunk(&record),
            Err(QueryError::ChunkDecode(_))
        ));
    }

    #[test]
    fn test_xor_record_bounds() {
        let record = ChunkRecord::xor(&[(5, 0.5), (7, 0.7), (9, 0.9)]);
        assert_eq!(record.encoding, 0);
        assert_eq!(record.min_time, 5);
        assert_eq!(record.max_time, 9);
    }
}
