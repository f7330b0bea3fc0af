//! Bounded byte and packed-bit cursor for the deltachan wire format.
//!
//! This crate provides [`BitWriter`] and [`BitReader`], the only way the
//! channel and codec layers touch message bytes. A writer or reader is an
//! explicit value owned by one encode or decode pass; there is no shared
//! global buffer.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - Writers have a fixed capacity; readers never read past the input.
//! - **No domain knowledge** - This crate knows nothing about entities, players, or channels.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Wire conventions
//!
//! - Byte-aligned primitives are little-endian.
//! - Packed bits are filled least-significant first and spill to the buffer as
//!   little-endian 32-bit words. A flush pads the final partial word out to a
//!   byte boundary.
//! - Byte-aligned access while packed bits are pending is rejected with
//!   [`BitError::MisalignedAccess`].
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new(64);
//! writer.write_u8(7).unwrap();
//! writer.write_bits(-3, -5).unwrap();
//! writer.flush_bits();
//! writer.write_u16(0xBEEF).unwrap();
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_u8().unwrap(), 7);
//! assert_eq!(reader.read_bits(-5).unwrap(), -3);
//! reader.flush_bits();
//! assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::{BitWriter, MAX_PACKED_BITS, MAX_STRING_LEN};
