//! Player stats: a presence mask followed by one `i16` per set bit.

use bitstream::{BitReader, BitWriter};

use crate::error::{CodecError, CodecResult, FieldKind};
use crate::types::MAX_STATS;
use crate::variant::StatsEncoding;

/// Mask of the stats that differ between `from` and `to`.
///
/// Only the first [`StatsEncoding::count`] stats are considered.
#[must_use]
pub fn stats_mask(
    from: &[i16; MAX_STATS],
    to: &[i16; MAX_STATS],
    encoding: StatsEncoding,
) -> u64 {
    from.iter()
        .zip(to.iter())
        .take(encoding.count())
        .enumerate()
        .filter(|(_, (old, new))| old != new)
        .fold(0, |mask, (index, _)| mask | (1 << index))
}

pub(crate) fn write_stats(
    writer: &mut BitWriter,
    stats: &[i16; MAX_STATS],
    mask: u64,
    encoding: StatsEncoding,
) -> CodecResult<()> {
    match encoding {
        #[allow(clippy::cast_possible_truncation)]
        StatsEncoding::Fixed32 => writer.write_u32(mask as u32)?,
        StatsEncoding::Fixed64 => writer.write_u64(mask)?,
        StatsEncoding::Varint => writer.write_varu64(mask)?,
    }
    for (index, value) in stats.iter().enumerate().take(encoding.count()) {
        if mask & (1 << index) != 0 {
            writer.write_i16(*value)?;
        }
    }
    Ok(())
}

pub(crate) fn read_stats(
    reader: &mut BitReader<'_>,
    stats: &mut [i16; MAX_STATS],
    encoding: StatsEncoding,
) -> CodecResult<u64> {
    let mask = match encoding {
        StatsEncoding::Fixed32 => u64::from(reader.read_u32()?),
        StatsEncoding::Fixed64 => reader.read_u64()?,
        StatsEncoding::Varint => reader.read_varu64()?,
    };
    if encoding.count() < 64 && mask >> encoding.count() != 0 {
        return Err(CodecError::unexpected_bits(
            FieldKind::StatsMask,
            mask >> encoding.count() << encoding.count(),
        ));
    }
    for (index, value) in stats.iter_mut().enumerate().take(encoding.count()) {
        if mask & (1 << index) != 0 {
            *value = reader.read_i16()?;
        }
    }
    Ok(mask)
}

/// Zeroes the stats an encoding cannot address.
pub(crate) fn clear_unaddressable(stats: &mut [i16; MAX_STATS], encoding: StatsEncoding) {
    for value in stats.iter_mut().skip(encoding.count()) {
        *value = 0;
    }
}
