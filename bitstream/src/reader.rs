//! Bounded message reader.

use crate::error::{BitError, BitResult};
use crate::writer::packed_width;

/// A reader over a received message buffer.
///
/// The exact inverse of [`BitWriter`](crate::BitWriter). Every read is
/// bounds-checked; running out of input yields
/// [`BitError::UnexpectedEndOfInput`] and never panics. The position only
/// moves forward.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u64,
    acc_bits: u32,
}

impl<'a> BitReader<'a> {
    /// Creates a new reader over `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            acc: 0,
            acc_bits: 0,
        }
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns `true` if every byte has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the current byte position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the unread tail of the input without consuming it.
    #[must_use]
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> BitResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Reads an `i8`.
    pub fn read_i8(&mut self) -> BitResult<i8> {
        Ok(i8::from_le_bytes(self.read_array::<1>()?))
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> BitResult<u16> {
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    /// Reads a little-endian `i16`.
    pub fn read_i16(&mut self) -> BitResult<i16> {
        Ok(i16::from_le_bytes(self.read_array::<2>()?))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> BitResult<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> BitResult<i32> {
        Ok(i32::from_le_bytes(self.read_array::<4>()?))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> BitResult<u64> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    /// Reads an IEEE-754 `f32`.
    pub fn read_f32(&mut self) -> BitResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> BitResult<&'a [u8]> {
        self.ensure_aligned()?;
        self.ensure_bytes(len)?;
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Reads a string written by [`BitWriter::write_string`](crate::BitWriter::write_string).
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn read_string(&mut self) -> BitResult<String> {
        let len = self.read_u16()?;
        let bytes = self.read_bytes(usize::from(len))?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads an unsigned LEB128 varint.
    pub fn read_varu64(&mut self) -> BitResult<u64> {
        let mut result = 0u64;
        for shift in (0..70).step_by(7) {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(BitError::InvalidVarint);
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(BitError::InvalidVarint)
    }

    /// Reads `|width|` packed bits; a negative width sign-extends the result.
    pub fn read_bits(&mut self, width: i32) -> BitResult<i32> {
        let bits = packed_width(width)?;
        if bits > self.acc_bits {
            let needed = (bits - self.acc_bits).div_ceil(8) as usize;
            self.ensure_bytes(needed)?;
            while self.acc_bits < bits {
                self.acc |= u64::from(self.data[self.pos]) << self.acc_bits;
                self.pos += 1;
                self.acc_bits += 8;
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let raw = (self.acc as u32) & ((1u32 << bits) - 1);
        self.acc >>= bits;
        self.acc_bits -= bits;

        #[allow(clippy::cast_possible_wrap)]
        let value = if width < 0 {
            let shift = 32 - bits;
            ((raw << shift) as i32) >> shift
        } else {
            raw as i32
        };
        Ok(value)
    }

    /// Discards the padding left in the accumulator after a packed-bit run.
    pub fn flush_bits(&mut self) {
        self.acc = 0;
        self.acc_bits = 0;
    }

    fn ensure_aligned(&self) -> BitResult<()> {
        if self.acc_bits != 0 {
            return Err(BitError::MisalignedAccess {
                pending_bits: self.acc_bits,
            });
        }
        Ok(())
    }

    fn ensure_bytes(&self, requested: usize) -> BitResult<()> {
        let available = self.remaining();
        if requested > available {
            return Err(BitError::UnexpectedEndOfInput {
                requested,
                available,
            });
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> BitResult<[u8; N]> {
        self.ensure_aligned()?;
        self.ensure_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reader() {
        let reader = BitReader::new(&[]);
        assert!(reader.is_empty());
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn read_from_empty_fails() {
        let mut reader = BitReader::new(&[]);
        assert_eq!(
            reader.read_u8(),
            Err(BitError::UnexpectedEndOfInput {
                requested: 1,
                available: 0,
            })
        );
    }

    #[test]
    fn short_read_does_not_advance() {
        let mut reader = BitReader::new(&[1, 2, 3]);
        assert!(reader.read_u32().is_err());
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn read_little_endian() {
        let mut reader = BitReader::new(&[0x78, 0x56, 0x34, 0x12, 0xFE]);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(reader.read_i8().unwrap(), -2);
        assert!(reader.is_empty());
    }

    #[test]
    fn read_bits_sign_extends() {
        let mut reader = BitReader::new(&[0x0F]);
        assert_eq!(reader.read_bits(-4).unwrap(), -1);
        assert_eq!(reader.read_bits(4).unwrap(), 0);
    }

    #[test]
    fn read_bits_across_bytes() {
        let mut reader = BitReader::new(&[0xFF, 0x01]);
        assert_eq!(reader.read_bits(9).unwrap(), 0x1FF);
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn read_bits_past_end_fails() {
        let mut reader = BitReader::new(&[0xFF]);
        assert_eq!(
            reader.read_bits(9),
            Err(BitError::UnexpectedEndOfInput {
                requested: 2,
                available: 1,
            })
        );
    }

    #[test]
    fn byte_read_requires_flush() {
        let mut reader = BitReader::new(&[0x01, 0x02]);
        reader.read_bits(1).unwrap();
        assert_eq!(
            reader.read_u8(),
            Err(BitError::MisalignedAccess { pending_bits: 7 })
        );
        reader.flush_bits();
        assert_eq!(reader.read_u8().unwrap(), 2);
    }

    #[test]
    fn read_varint() {
        let mut reader = BitReader::new(&[0xAC, 0x02]);
        assert_eq!(reader.read_varu64().unwrap(), 300);
    }

    #[test]
    fn read_varint_too_long() {
        let mut reader = BitReader::new(&[0xFF; 11]);
        assert_eq!(reader.read_varu64(), Err(BitError::InvalidVarint));
    }

    #[test]
    fn read_string_lossy() {
        let mut reader = BitReader::new(&[2, 0, b'o', 0xFF]);
        assert_eq!(reader.read_string().unwrap(), "o\u{FFFD}");
    }

    #[test]
    fn remaining_slice_is_tail() {
        let mut reader = BitReader::new(&[1, 2, 3]);
        reader.read_u8().unwrap();
        assert_eq!(reader.remaining_slice(), &[2, 3]);
    }
}
