//! Error types for codec operations.

use std::fmt;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during entity and player delta encoding/decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Bitstream error.
    Bitstream(bitstream::BitError),

    /// A field cannot be represented, or decoded flags are inconsistent.
    MalformedField { field: FieldKind, reason: FieldReason },

    /// Entities are not in strictly increasing number order.
    InvalidEntityOrder { previous: u16, current: u16 },

    /// A delta or removal references an entity absent from the reference frame.
    EntityNotFound {
        /// The missing entity number.
        number: u16,
    },
}

/// Field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    EntityNumber,
    EntityFlags,
    PlayerNumber,
    PlayerFlags,
    Coordinate,
    Offset,
    ModelIndex,
    Sound,
    PmTime,
    PmFlags,
    GunIndex,
    StatsMask,
}

/// Details for malformed field errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldReason {
    /// Zero is reserved.
    Zero,
    /// Value lies outside the range the active variant can carry.
    OutOfRange { value: i64, min: i64, max: i64 },
    /// Non-finite floating point input.
    NotFinite { value: f32 },
    /// Flag bits the active variant does not define.
    UnexpectedBits { bits: u64 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::MalformedField { field, reason } => {
                write!(f, "malformed {field}: {reason}")
            }
            Self::InvalidEntityOrder { previous, current } => {
                write!(f, "entity order invalid: {previous} then {current}")
            }
            Self::EntityNotFound { number } => {
                write!(f, "entity {number} not found in reference frame")
            }
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EntityNumber => "entity number",
            Self::EntityFlags => "entity flags",
            Self::PlayerNumber => "player number",
            Self::PlayerFlags => "player flags",
            Self::Coordinate => "coordinate",
            Self::Offset => "view offset",
            Self::ModelIndex => "model index",
            Self::Sound => "sound index",
            Self::PmTime => "pmove time",
            Self::PmFlags => "pmove flags",
            Self::GunIndex => "gun index",
            Self::StatsMask => "stats mask",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for FieldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "zero is reserved"),
            Self::OutOfRange { value, min, max } => {
                write!(f, "value {value} outside [{min}, {max}]")
            }
            Self::NotFinite { value } => write!(f, "non-finite value {value}"),
            Self::UnexpectedBits { bits } => write!(f, "unexpected bits 0x{bits:X}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl CodecError {
    pub(crate) const fn out_of_range(field: FieldKind, value: i64, min: i64, max: i64) -> Self {
        Self::MalformedField {
            field,
            reason: FieldReason::OutOfRange { value, min, max },
        }
    }

    pub(crate) fn not_finite(field: FieldKind, value: f32) -> Self {
        Self::MalformedField {
            field,
            reason: FieldReason::NotFinite { value },
        }
    }

    pub(crate) const fn unexpected_bits(field: FieldKind, bits: u64) -> Self {
        Self::MalformedField {
            field,
            reason: FieldReason::UnexpectedBits { bits },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_entity_not_found() {
        let err = CodecError::EntityNotFound { number: 123 };
        let msg = err.to_string();
        assert!(msg.contains("123"), "should mention entity number");
    }

    #[test]
    fn error_display_out_of_range() {
        let err = CodecError::out_of_range(FieldKind::Coordinate, 40_000, -32_768, 32_767);
        let msg = err.to_string();
        assert!(msg.contains("coordinate"));
        assert!(msg.contains("40000"));
        assert!(msg.contains("32767"));
    }

    #[test]
    fn error_display_unexpected_bits() {
        let err = CodecError::unexpected_bits(FieldKind::EntityFlags, 0x4000_0000);
        assert!(err.to_string().contains("0x40000000"));
    }

    #[test]
    fn error_display_order() {
        let err = CodecError::InvalidEntityOrder {
            previous: 9,
            current: 4,
        };
        assert_eq!(err.to_string(), "entity order invalid: 9 then 4");
    }

    #[test]
    fn error_from_bitstream_error() {
        let bit_err = bitstream::BitError::UnexpectedEndOfInput {
            requested: 1,
            available: 0,
        };
        let codec_err: CodecError = bit_err.into();
        assert!(matches!(codec_err, CodecError::Bitstream(_)));
        assert!(std::error::Error::source(&codec_err).is_some());
    }

    #[test]
    fn error_source_none_for_others() {
        let err = CodecError::EntityNotFound { number: 1 };
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<CodecError>();
    }
}
