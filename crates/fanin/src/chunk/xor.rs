//! XOR chunk encoding for float samples.
//!
//! A chunk is a 4-byte big-endian sample count followed by a single MSB-first
//! bit stream in which every sample contributes its timestamp and then its
//! value.
//!
//! ## Timestamp Encoding (Delta-of-Delta)
//!
//! - First sample: 64 bits raw
//! - Subsequent samples, by delta-of-delta:
//!   - `0`: `'0'` (1 bit)
//!   - `[-63, 64]`: `'10'` + 7 bits
//!   - `[-255, 256]`: `'110'` + 9 bits
//!   - `[-2047, 2048]`: `'1110'` + 12 bits
//!   - else: `'1111'` + 64 bits
//!
//! ## Value Encoding (XOR-based)
//!
//! - First sample: 64 bits raw (IEEE 754)
//! - Subsequent samples, XOR with the previous value:
//!   - XOR = 0: `'0'` (1 bit)
//!   - Same window: `'10'` + meaningful bits
//!   - New window: `'11'` + 5 bits leading + 6 bits length + meaningful bits

use crate::error::{QueryError, Result};
use crate::Timestamp;
use bitvec::prelude::*;
use std::sync::Arc;

/// Size of the sample count header in bytes.
pub const HEADER_SIZE: usize = 4;

/// An immutable XOR-encoded chunk.
///
/// The payload is reference counted so that every iterator over the chunk
/// shares the same bytes.
#[derive(Debug, Clone)]
pub struct XorChunk {
    data: Arc<[u8]>,
}

impl XorChunk {
    /// Wraps raw chunk bytes, validating the header.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(QueryError::ChunkDecode(format!(
                "chunk too short: {} bytes, header needs {}",
                data.len(),
                HEADER_SIZE
            )));
        }
        Ok(Self {
            data: Arc::from(data),
        })
    }

    /// Encodes a sequence of (timestamp, value) pairs into a chunk.
    ///
    /// ```rust
    /// use alopex_fanin::chunk::XorChunk;
    ///
    /// let chunk = XorChunk::encode(&[(1000, 1.0), (1010, 1.5)]);
    /// assert_eq!(chunk.num_samples(), 2);
    /// ```
    pub fn encode(samples: &[(Timestamp, f64)]) -> Self {
        let mut appender = XorAppender::new();
        for &(t, v) in samples {
            appender.append(t, v);
        }
        appender.finish()
    }

    /// Number of samples declared by the chunk header.
    pub fn num_samples(&self) -> u32 {
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&self.data[..HEADER_SIZE]);
        u32::from_be_bytes(header)
    }

    /// Raw chunk bytes, header included.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns a fresh iterator positioned before the first sample.
    pub fn iter(&self) -> XorIterator {
        XorIterator::new(Arc::clone(&self.data), self.num_samples())
    }
}

/// Builds an [`XorChunk`] one sample at a time.
#[derive(Debug, Default)]
pub struct XorAppender {
    bits: BitVec<u8, Msb0>,
    count: u32,
    ts: TimestampEncoder,
    val: ValueEncoder,
}

impl XorAppender {
    /// Creates an empty appender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one sample. Timestamps are expected in ascending order.
    pub fn append(&mut self, t: Timestamp, v: f64) {
        self.ts.encode(t, &mut self.bits);
        self.val.encode(v, &mut self.bits);
        self.count += 1;
    }

    /// Number of samples appended so far.
    pub fn len(&self) -> u32 {
        self.count
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Seals the appender into a chunk.
    pub fn finish(self) -> XorChunk {
        let body = self.bits.into_vec();
        let mut data = Vec::with_capacity(HEADER_SIZE + body.len());
        data.extend_from_slice(&self.count.to_be_bytes());
        data.extend_from_slice(&body);
        XorChunk {
            data: Arc::from(data),
        }
    }
}

fn push_bits(output: &mut BitVec<u8, Msb0>, value: u64, width: u32) {
    for i in (0..width).rev() {
        output.push((value >> i) & 1 == 1);
    }
}

#[derive(Debug, Default)]
struct TimestampEncoder {
    started: bool,
    prev_ts: i64,
    prev_delta: i64,
}

impl TimestampEncoder {
    fn encode(&mut self, timestamp: i64, output: &mut BitVec<u8, Msb0>) {
        if !self.started {
            self.started = true;
            self.prev_ts = timestamp;
            self.prev_delta = 0;
            push_bits(output, timestamp as u64, 64);
            return;
        }

        let delta = timestamp.wrapping_sub(self.prev_ts);
        let dod = delta.wrapping_sub(self.prev_delta);

        if dod == 0 {
            output.push(false);
        } else if (-63..=64).contains(&dod) {
            push_bits(output, 0b10, 2);
            push_bits(output, (dod + 63) as u64, 7);
        } else if (-255..=256).contains(&dod) {
            push_bits(output, 0b110, 3);
            push_bits(output, (dod + 255) as u64, 9);
        } else if (-2047..=2048).contains(&dod) {
            push_bits(output, 0b1110, 4);
            push_bits(output, (dod + 2047) as u64, 12);
        } else {
            push_bits(output, 0b1111, 4);
            push_bits(output, dod as u64, 64);
        }

        self.prev_delta = delta;
        self.prev_ts = timestamp;
    }
}

#[derive(Debug, Default)]
struct ValueEncoder {
    started: bool,
    prev_value: u64,
    /// (leading, trailing) zeros of the last written window.
    window: Option<(u32, u32)>,
}

impl ValueEncoder {
    fn encode(&mut self, value: f64, output: &mut BitVec<u8, Msb0>) {
        let bits = value.to_bits();

        if !self.started {
            self.started = true;
            self.prev_value = bits;
            push_bits(output, bits, 64);
            return;
        }

        let xor = bits ^ self.prev_value;
        self.prev_value = bits;

        if xor == 0 {
            output.push(false);
            return;
        }

        // Leading zeros are stored in 5 bits.
        let leading = xor.leading_zeros().min(31);
        let trailing = xor.trailing_zeros();

        match self.window {
            Some((prev_leading, prev_trailing))
                if leading >= prev_leading && trailing >= prev_trailing =>
            {
                push_bits(output, 0b10, 2);
                let meaningful = 64 - prev_leading - prev_trailing;
                push_bits(output, xor >> prev_trailing, meaningful);
            }
            _ => {
                push_bits(output, 0b11, 2);
                let meaningful = 64 - leading - trailing;
                push_bits(output, leading as u64, 5);
                push_bits(output, (meaningful - 1) as u64, 6);
                push_bits(output, xor >> trailing, meaningful);
                self.window = Some((leading, trailing));
            }
        }
    }
}

struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn read_bit(&mut self) -> Result<bool> {
        let bit = self
            .bits
            .get(self.pos)
            .map(|bit| *bit)
            .ok_or_else(|| {
                QueryError::ChunkDecode(format!("unexpected end of chunk data at bit {}", self.pos))
            })?;
        self.pos += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, width: u32) -> Result<u64> {
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }
}

#[derive(Debug, Default)]
struct TimestampDecoder {
    started: bool,
    prev_ts: i64,
    prev_delta: i64,
}

impl TimestampDecoder {
    fn decode(&mut self, reader: &mut BitReader<'_>) -> Result<i64> {
        if !self.started {
            let ts = reader.read_bits(64)? as i64;
            self.started = true;
            self.prev_ts = ts;
            self.prev_delta = 0;
            return Ok(ts);
        }

        let dod = if !reader.read_bit()? {
            0
        } else if !reader.read_bit()? {
            reader.read_bits(7)? as i64 - 63
        } else if !reader.read_bit()? {
            reader.read_bits(9)? as i64 - 255
        } else if !reader.read_bit()? {
            reader.read_bits(12)? as i64 - 2047
        } else {
            reader.read_bits(64)? as i64
        };

        let delta = self.prev_delta.wrapping_add(dod);
        let ts = self.prev_ts.wrapping_add(delta);
        self.prev_delta = delta;
        self.prev_ts = ts;
        Ok(ts)
    }
}

#[derive(Debug, Default)]
struct ValueDecoder {
    started: bool,
    prev_value: u64,
    prev_leading: u32,
    prev_trailing: u32,
}

impl ValueDecoder {
    fn decode(&mut self, reader: &mut BitReader<'_>) -> Result<f64> {
        if !self.started {
            let bits = reader.read_bits(64)?;
            self.started = true;
            self.prev_value = bits;
            return Ok(f64::from_bits(bits));
        }

        let xor = if !reader.read_bit()? {
            0
        } else if !reader.read_bit()? {
            let meaningful = 64 - self.prev_leading - self.prev_trailing;
            reader.read_bits(meaningful)? << self.prev_trailing
        } else {
            let leading = reader.read_bits(5)? as u32;
            let meaningful = reader.read_bits(6)? as u32 + 1;
            let trailing = 64u32.checked_sub(leading + meaningful).ok_or_else(|| {
                QueryError::ChunkDecode(format!(
                    "invalid xor window: {leading} leading zeros, {meaningful} meaningful bits"
                ))
            })?;
            self.prev_leading = leading;
            self.prev_trailing = trailing;
            reader.read_bits(meaningful)? << trailing
        };

        self.prev_value ^= xor;
        Ok(f64::from_bits(self.prev_value))
    }
}

/// Lazily decodes the samples of an [`XorChunk`].
///
/// Follows the crate's pull protocol: call [`next`](Self::next), read the
/// sample with [`at`](Self::at), and consult [`err`](Self::err) once `next`
/// returns false.
#[derive(Debug)]
pub struct XorIterator {
    data: Arc<[u8]>,
    total: u32,
    read: u32,
    pos: usize,
    ts: TimestampDecoder,
    val: ValueDecoder,
    cur: (Timestamp, f64),
    err: Option<QueryError>,
}

impl XorIterator {
    fn new(data: Arc<[u8]>, total: u32) -> Self {
        Self {
            data,
            total,
            read: 0,
            pos: 0,
            ts: TimestampDecoder::default(),
            val: ValueDecoder::default(),
            cur: (0, 0.0),
            err: None,
        }
    }

    /// Advances to the next sample.
    pub fn next(&mut self) -> bool {
        if self.err.is_some() || self.read >= self.total {
            return false;
        }

        let mut reader = BitReader {
            bits: self.data[HEADER_SIZE..].view_bits::<Msb0>(),
            pos: self.pos,
        };
        let decoded = self
            .ts
            .decode(&mut reader)
            .and_then(|t| self.val.decode(&mut reader).map(|v| (t, v)));

        match decoded {
            Ok(sample) => {
                self.pos = reader.pos;
                self.read += 1;
                self.cur = sample;
                true
            }
            Err(err) => {
                self.err = Some(err);
                false
            }
        }
    }

    /// Returns the current sample.
    pub fn at(&self) -> (Timestamp, f64) {
        self.cur
    }

    /// Returns the decode error that stopped the iterator, if any.
    pub fn err(&self) -> Option<&QueryError> {
        self.err.as_ref()
    }
}
