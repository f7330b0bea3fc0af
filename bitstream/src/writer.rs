//! Bounded message writer.

use crate::error::{BitError, BitResult};

/// Largest magnitude accepted by [`BitWriter::write_bits`].
pub const MAX_PACKED_BITS: u32 = 31;

/// Maximum length of a length-prefixed string.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// A writer over a fixed-capacity message buffer.
///
/// Byte-aligned primitives are written little-endian. Packed bits collect in
/// a rolling accumulator that spills to the buffer in 32-bit words; call
/// [`flush_bits`](Self::flush_bits) before returning to byte-aligned writes.
///
/// Every write either succeeds completely or fails with
/// [`BitError::BufferOverflow`] and leaves the writer untouched.
#[derive(Debug, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    capacity: usize,
    /// Pending packed bits, least significant first.
    acc: u64,
    /// Number of valid bits in `acc` (always below 32 between calls).
    acc_bits: u32,
}

impl BitWriter {
    /// Creates a writer that refuses to grow past `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity.min(4096)),
            capacity,
            acc: 0,
            acc_bits: 0,
        }
    }

    /// Returns the fixed capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes committed to the buffer.
    ///
    /// Bits still held in the accumulator are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && self.acc_bits == 0
    }

    /// Returns the number of bytes that can still be written, accounting for
    /// the bytes pending bits will occupy once flushed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity
            .saturating_sub(self.bytes.len() + self.acc_bits.div_ceil(8) as usize)
    }

    /// Returns the number of packed bits waiting in the accumulator.
    #[must_use]
    pub const fn pending_bits(&self) -> u32 {
        self.acc_bits
    }

    /// Returns the committed bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes a `u8`.
    pub fn write_u8(&mut self, value: u8) -> BitResult<()> {
        self.write_bytes(&[value])
    }

    /// Writes an `i8`.
    pub fn write_i8(&mut self, value: i8) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `i16`.
    pub fn write_i16(&mut self, value: i16) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `u64`.
    pub fn write_u64(&mut self, value: u64) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an IEEE-754 `f32` in little-endian byte order.
    pub fn write_f32(&mut self, value: f32) -> BitResult<()> {
        self.write_bytes(&value.to_bits().to_le_bytes())
    }

    /// Writes a string prefixed with its byte length as a `u16`.
    pub fn write_string(&mut self, value: &str) -> BitResult<()> {
        let len = value.len();
        let prefix = u16::try_from(len).map_err(|_| BitError::StringTooLong {
            len,
            max: MAX_STRING_LEN,
        })?;
        self.ensure_aligned()?;
        self.reserve(2 + len)?;
        self.bytes.extend_from_slice(&prefix.to_le_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Writes an unsigned LEB128 varint.
    pub fn write_varu64(&mut self, mut value: u64) -> BitResult<()> {
        let mut encoded = [0u8; 10];
        let mut len = 0;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                encoded[len] = byte;
                len += 1;
                break;
            }
            encoded[len] = byte | 0x80;
            len += 1;
        }
        self.write_bytes(&encoded[..len])
    }

    /// Writes raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> BitResult<()> {
        self.ensure_aligned()?;
        self.reserve(data.len())?;
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Packs the low `|width|` bits of `value` into the accumulator.
    ///
    /// A negative width marks the field as signed; the bits written are the
    /// same, the sign only matters to [`BitReader::read_bits`](crate::BitReader::read_bits).
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] for a width of 0 or a magnitude
    /// above 31, and [`BitError::BufferOverflow`] if the flushed bits would not
    /// fit.
    pub fn write_bits(&mut self, value: i32, width: i32) -> BitResult<()> {
        let bits = packed_width(width)?;
        let pending = self.acc_bits + bits;
        let needed = self.bytes.len() + pending.div_ceil(8) as usize;
        if needed > self.capacity {
            return Err(BitError::BufferOverflow {
                attempted: needed,
                capacity: self.capacity,
            });
        }

        #[allow(clippy::cast_sign_loss)]
        let raw = (value as u32) & ((1u32 << bits) - 1);
        self.acc |= u64::from(raw) << self.acc_bits;
        self.acc_bits = pending;
        if self.acc_bits >= 32 {
            #[allow(clippy::cast_possible_truncation)]
            let word = self.acc as u32;
            self.bytes.extend_from_slice(&word.to_le_bytes());
            self.acc >>= 32;
            self.acc_bits -= 32;
        }
        Ok(())
    }

    /// Pads pending packed bits with zeros out to the next byte boundary.
    ///
    /// Space for these bytes was reserved by [`write_bits`](Self::write_bits),
    /// so flushing cannot overflow.
    pub fn flush_bits(&mut self) {
        while self.acc_bits > 0 {
            #[allow(clippy::cast_possible_truncation)]
            self.bytes.push(self.acc as u8);
            self.acc >>= 8;
            self.acc_bits = self.acc_bits.saturating_sub(8);
        }
        self.acc = 0;
    }

    /// Flushes pending bits and returns the message bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.flush_bits();
        self.bytes
    }

    fn ensure_aligned(&self) -> BitResult<()> {
        if self.acc_bits != 0 {
            return Err(BitError::MisalignedAccess {
                pending_bits: self.acc_bits,
            });
        }
        Ok(())
    }

    fn reserve(&self, additional: usize) -> BitResult<()> {
        let needed = self.bytes.len() + additional;
        if needed > self.capacity {
            return Err(BitError::BufferOverflow {
                attempted: needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

/// Validates a packed-bit width and returns its magnitude.
pub(crate) fn packed_width(width: i32) -> BitResult<u32> {
    let bits = width.unsigned_abs();
    if bits == 0 || bits > MAX_PACKED_BITS {
        return Err(BitError::InvalidBitCount { bits: width });
    }
    Ok(bits)
}
