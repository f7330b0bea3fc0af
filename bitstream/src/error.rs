//! Error types for cursor operations.

use std::fmt;

/// Result type for cursor operations.
pub type BitResult<T> = Result<T, BitError>;

/// Errors that can occur while writing or reading a message buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// A write would exceed the writer's fixed capacity.
    ///
    /// The writer is left unchanged; the caller must drop or truncate the
    /// message rather than send it.
    BufferOverflow {
        /// Total bytes the buffer would have needed.
        attempted: usize,
        /// Maximum capacity in bytes.
        capacity: usize,
    },

    /// Attempted to read past the end of the input.
    UnexpectedEndOfInput {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// Packed-bit width outside `[-31, 31]` or equal to zero.
    InvalidBitCount {
        /// The invalid width provided.
        bits: i32,
    },

    /// A byte-aligned operation was attempted while packed bits are pending.
    MisalignedAccess {
        /// Bits held in the accumulator at the time of the call.
        pending_bits: u32,
    },

    /// A variable-length integer was longer than its type allows.
    InvalidVarint,

    /// A string does not fit its 16-bit length prefix.
    StringTooLong {
        /// Length of the string in bytes.
        len: usize,
        /// Maximum encodable length.
        max: usize,
    },
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferOverflow {
                attempted,
                capacity,
            } => {
                write!(
                    f,
                    "attempted to write {attempted} bytes but buffer capacity is {capacity} bytes"
                )
            }
            Self::UnexpectedEndOfInput {
                requested,
                available,
            } => {
                write!(
                    f,
                    "attempted to read {requested} bytes but only {available} bytes available"
                )
            }
            Self::InvalidBitCount { bits } => {
                write!(f, "invalid bit width {bits}, expected -31..=31 excluding 0")
            }
            Self::MisalignedAccess { pending_bits } => {
                write!(
                    f,
                    "byte-aligned access with {pending_bits} packed bits pending flush"
                )
            }
            Self::InvalidVarint => write!(f, "invalid varint encoding"),
            Self::StringTooLong { len, max } => {
                write!(f, "string length {len} exceeds maximum {max}")
            }
        }
    }
}

impl std::error::Error for BitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_buffer_overflow() {
        let err = BitError::BufferOverflow {
            attempted: 1401,
            capacity: 1400,
        };
        let msg = err.to_string();
        assert!(msg.contains("1401"), "should mention attempted bytes");
        assert!(msg.contains("1400"), "should mention capacity");
        assert!(msg.contains("write"), "should mention write operation");
    }

    #[test]
    fn error_display_end_of_input() {
        let err = BitError::UnexpectedEndOfInput {
            requested: 4,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("4 bytes"), "should mention requested bytes");
        assert!(msg.contains("3 bytes"), "should mention available bytes");
        assert!(msg.contains("read"), "should mention read operation");
    }

    #[test]
    fn error_display_invalid_bit_count() {
        let err = BitError::InvalidBitCount { bits: 32 };
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn error_display_misaligned() {
        let err = BitError::MisalignedAccess { pending_bits: 5 };
        assert!(err.to_string().contains("5 packed bits"));
    }

    #[test]
    fn error_display_string_too_long() {
        let err = BitError::StringTooLong {
            len: 70_000,
            max: 65_535,
        };
        let msg = err.to_string();
        assert!(msg.contains("70000"));
        assert!(msg.contains("65535"));
    }

    #[test]
    fn error_equality() {
        let err1 = BitError::UnexpectedEndOfInput {
            requested: 2,
            available: 1,
        };
        let err2 = err1.clone();
        let err3 = BitError::UnexpectedEndOfInput {
            requested: 2,
            available: 0,
        };
        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<BitError>();
    }
}
