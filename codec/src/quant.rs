//! Fixed-point quantization of coordinates, angles and small scalars.
//!
//! Deltas compare quantized wire values rather than raw floats, so a change
//! smaller than the wire resolution never produces a flag bit. In float mode
//! the wire value is the IEEE-754 bit pattern.

use bitstream::{BitReader, BitWriter};

use crate::error::{CodecError, CodecResult, FieldKind};

/// Coordinate resolution: 1/8 unit.
pub const COORD_SCALE: f32 = 8.0;

/// Offset resolution: 1/4 unit.
pub const OFFSET_SCALE: f32 = 4.0;

/// Scale resolution: 1/16.
pub const SCALE_SCALE: f32 = 16.0;

/// Quantizes a coordinate to 1/8 units.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn coord_to_fixed(value: f32) -> i32 {
    (value * COORD_SCALE).round() as i32
}

/// Expands a 1/8-unit coordinate.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn fixed_to_coord(value: i32) -> f32 {
    value as f32 / COORD_SCALE
}

/// Quantizes an angle in degrees to a wrapping 16-bit turn fraction.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn angle_to_short(degrees: f32) -> i16 {
    let turns = (degrees * 8192.0 / 45.0).round() as i64;
    turns as u16 as i16
}

/// Expands a 16-bit angle into degrees in `[-180, 180)`.
#[must_use]
pub fn short_to_angle(value: i16) -> f32 {
    f32::from(value) * 45.0 / 8192.0
}

/// Quantizes an angle to 8 bits: the high byte of its 16-bit form.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn angle_to_byte(degrees: f32) -> i8 {
    (angle_to_short(degrees) >> 8) as i8
}

/// Expands an 8-bit angle into degrees in `[-180, 180)`.
#[must_use]
pub fn byte_to_angle(value: i8) -> f32 {
    f32::from(value) * 45.0 / 32.0
}

/// Quantizes a translucency in `0..=1` to a byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn alpha_to_byte(alpha: f32) -> u8 {
    (alpha * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Expands a byte translucency.
#[must_use]
pub fn byte_to_alpha(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Quantizes a model scale to 1/16 steps.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn scale_to_byte(scale: f32) -> u8 {
    (scale * SCALE_SCALE).round().clamp(0.0, 255.0) as u8
}

/// Expands a 1/16-step model scale.
#[must_use]
pub fn byte_to_scale(value: u8) -> f32 {
    f32::from(value) / SCALE_SCALE
}

/// Quantizes a view or gun offset to 1/4 units.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn offset_to_fixed(value: f32) -> i32 {
    (value * OFFSET_SCALE).round() as i32
}

/// Expands a 1/4-unit offset.
#[must_use]
pub fn fixed_to_offset(value: i8) -> f32 {
    f32::from(value) / OFFSET_SCALE
}

/// Wire key of a coordinate: what a delta compares.
pub(crate) fn coord_key(value: f32, float: bool) -> i64 {
    if float {
        i64::from(value.to_bits())
    } else {
        i64::from(coord_to_fixed(value))
    }
}

/// Wire key of an angle sent at 16-bit (or float) precision.
pub(crate) fn angle16_key(value: f32, float: bool) -> i64 {
    if float {
        i64::from(value.to_bits())
    } else {
        i64::from(angle_to_short(value))
    }
}

/// Wire key of an angle sent at 8-bit precision.
pub(crate) fn angle8_key(value: f32, float: bool) -> i64 {
    if float {
        i64::from(value.to_bits())
    } else {
        i64::from(angle_to_byte(value))
    }
}

pub(crate) fn write_coord(writer: &mut BitWriter, value: f32, float: bool) -> CodecResult<()> {
    if float {
        writer.write_f32(value)?;
        return Ok(());
    }
    if !value.is_finite() {
        return Err(CodecError::not_finite(FieldKind::Coordinate, value));
    }
    let fixed = coord_to_fixed(value);
    let wire = i16::try_from(fixed).map_err(|_| {
        CodecError::out_of_range(
            FieldKind::Coordinate,
            i64::from(fixed),
            i64::from(i16::MIN),
            i64::from(i16::MAX),
        )
    })?;
    writer.write_i16(wire)?;
    Ok(())
}

pub(crate) fn read_coord(reader: &mut BitReader<'_>, float: bool) -> CodecResult<f32> {
    if float {
        Ok(reader.read_f32()?)
    } else {
        Ok(fixed_to_coord(i32::from(reader.read_i16()?)))
    }
}

pub(crate) fn write_angle16(writer: &mut BitWriter, value: f32, float: bool) -> CodecResult<()> {
    if float {
        writer.write_f32(value)?;
    } else {
        writer.write_i16(angle_to_short(value))?;
    }
    Ok(())
}

pub(crate) fn read_angle16(reader: &mut BitReader<'_>, float: bool) -> CodecResult<f32> {
    if float {
        Ok(reader.read_f32()?)
    } else {
        Ok(short_to_angle(reader.read_i16()?))
    }
}

pub(crate) fn write_angle8(writer: &mut BitWriter, value: f32, float: bool) -> CodecResult<()> {
    if float {
        writer.write_f32(value)?;
    } else {
        writer.write_i8(angle_to_byte(value))?;
    }
    Ok(())
}

pub(crate) fn read_angle8(reader: &mut BitReader<'_>, float: bool) -> CodecResult<f32> {
    if float {
        Ok(reader.read_f32()?)
    } else {
        Ok(byte_to_angle(reader.read_i8()?))
    }
}

pub(crate) fn write_offset(writer: &mut BitWriter, value: f32) -> CodecResult<()> {
    if !value.is_finite() {
        return Err(CodecError::not_finite(FieldKind::Offset, value));
    }
    let fixed = offset_to_fixed(value);
    let wire = i8::try_from(fixed).map_err(|_| {
        CodecError::out_of_range(
            FieldKind::Offset,
            i64::from(fixed),
            i64::from(i8::MIN),
            i64::from(i8::MAX),
        )
    })?;
    writer.write_i8(wire)?;
    Ok(())
}

pub(crate) fn read_offset(reader: &mut BitReader<'_>) -> CodecResult<f32> {
    Ok(fixed_to_offset(reader.read_i8()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldReason;

    #[test]
    fn coord_resolution() {
        assert_eq!(coord_to_fixed(1.0), 8);
        assert_eq!(coord_to_fixed(-0.125), -1);
        assert_eq!(coord_to_fixed(0.06), 0);
        assert_eq!(fixed_to_coord(12), 1.5);
    }

    #[test]
    fn coord_out_of_range_rejected() {
        let mut writer = BitWriter::new(16);
        assert!(write_coord(&mut writer, 4095.875, false).is_ok());
        let err = write_coord(&mut writer, 4096.0, false).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedField {
                field: FieldKind::Coordinate,
                ..
            }
        ));
        assert_eq!(writer.len(), 2);
    }

    #[test]
    fn non_finite_fixed_point_rejected() {
        let mut writer = BitWriter::new(16);
        for value in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = write_coord(&mut writer, value, false).unwrap_err();
            assert!(matches!(
                err,
                CodecError::MalformedField {
                    field: FieldKind::Coordinate,
                    reason: FieldReason::NotFinite { .. },
                }
            ));
            let err = write_offset(&mut writer, value).unwrap_err();
            assert!(matches!(
                err,
                CodecError::MalformedField {
                    field: FieldKind::Offset,
                    reason: FieldReason::NotFinite { .. },
                }
            ));
        }
        assert!(writer.is_empty());

        // Float mode carries the raw bit pattern.
        write_coord(&mut writer, f32::INFINITY, true).unwrap();
        assert_eq!(writer.len(), 4);
    }

    #[test]
    fn angle_short_wraps() {
        assert_eq!(angle_to_short(0.0), 0);
        assert_eq!(angle_to_short(90.0), 16_384);
        assert_eq!(angle_to_short(180.0), i16::MIN);
        assert_eq!(angle_to_short(360.0), 0);
        assert_eq!(angle_to_short(-90.0), -16_384);
        assert_eq!(short_to_angle(i16::MIN), -180.0);
    }

    #[test]
    fn angle_short_is_exact_on_grid() {
        for raw in [i16::MIN, -12_345, -1, 0, 1, 777, i16::MAX] {
            assert_eq!(angle_to_short(short_to_angle(raw)), raw);
        }
    }

    #[test]
    fn angle_byte_is_high_byte() {
        assert_eq!(angle_to_byte(90.0), 64);
        assert_eq!(angle_to_byte(-90.0), -64);
        assert_eq!(byte_to_angle(64), 90.0);
        for raw in [i8::MIN, -3, 0, 5, i8::MAX] {
            assert_eq!(angle_to_byte(byte_to_angle(raw)), raw);
        }
    }

    #[test]
    fn alpha_and_scale_saturate() {
        assert_eq!(alpha_to_byte(1.0), 255);
        assert_eq!(alpha_to_byte(2.0), 255);
        assert_eq!(alpha_to_byte(-1.0), 0);
        assert_eq!(scale_to_byte(1.0), 16);
        assert_eq!(byte_to_scale(24), 1.5);
    }

    #[test]
    fn offsets_fit_signed_byte() {
        let mut writer = BitWriter::new(4);
        write_offset(&mut writer, 31.75).unwrap();
        write_offset(&mut writer, -32.0).unwrap();
        assert!(write_offset(&mut writer, 32.0).is_err());
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(read_offset(&mut reader).unwrap(), 31.75);
        assert_eq!(read_offset(&mut reader).unwrap(), -32.0);
    }

    #[test]
    fn float_keys_distinguish_sub_resolution_changes() {
        assert_eq!(coord_key(1.0, false), coord_key(1.01, false));
        assert_ne!(coord_key(1.0, true), coord_key(1.01, true));
    }

    #[test]
    fn nan_quantizes_to_zero() {
        assert_eq!(coord_to_fixed(f32::NAN), 0);
        assert_eq!(angle_to_short(f32::NAN), 0);
    }
}
