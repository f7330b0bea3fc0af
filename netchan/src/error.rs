//! Error types for channel operations.

use std::fmt;

use bitstream::BitError;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors surfaced to the owner of a channel.
///
/// Datagrams that are stale, malformed, or fail reassembly are not errors;
/// they are reported as [`DropReason`]s and counted in the channel stats.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChannelError {
    /// Cursor failure while framing a datagram.
    Bitstream(BitError),

    /// Datagram is shorter than the header it must carry.
    DatagramTooSmall { actual: usize, required: usize },

    /// The reliable staging area cannot hold the queued data.
    ReliableOverflow { needed: usize, capacity: usize },

    /// A message does not fit the channel even after fragmentation.
    MessageTooLarge { len: usize, capacity: usize },
}

/// Why an incoming datagram produced no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Sequence not newer than the last accepted one.
    Stale,
    /// Header could not be parsed.
    Malformed,
    /// Fragment offset does not continue the bytes assembled so far.
    FragmentOutOfOrder,
    /// Fragment extends past its declared total length.
    FragmentBeyondTotal,
    /// Fragment declares a different total than earlier fragments.
    FragmentTotalMismatch,
    /// Declared total exceeds the channel's message capacity.
    FragmentTooLarge,
    /// Final fragment arrived before the declared total was assembled.
    FragmentIncomplete,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream(err) => write!(f, "bitstream error: {err}"),
            Self::DatagramTooSmall { actual, required } => {
                write!(
                    f,
                    "datagram too small: {actual} bytes, need at least {required}"
                )
            }
            Self::ReliableOverflow { needed, capacity } => {
                write!(
                    f,
                    "reliable overflow: {needed} bytes queued, capacity {capacity}"
                )
            }
            Self::MessageTooLarge { len, capacity } => {
                write!(f, "message too large: {len} bytes, capacity {capacity}")
            }
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BitError> for ChannelError {
    fn from(err: BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stale => "stale or duplicate sequence",
            Self::Malformed => "malformed header",
            Self::FragmentOutOfOrder => "fragment out of order",
            Self::FragmentBeyondTotal => "fragment beyond declared total",
            Self::FragmentTotalMismatch => "fragment total mismatch",
            Self::FragmentTooLarge => "fragmented message too large",
            Self::FragmentIncomplete => "final fragment before message complete",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn error_display_too_small() {
        let err = ChannelError::DatagramTooSmall {
            actual: 3,
            required: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 bytes"));
        assert!(msg.contains("8"));
    }

    #[test]
    fn error_display_reliable_overflow() {
        let err = ChannelError::ReliableOverflow {
            needed: 2000,
            capacity: 1390,
        };
        assert!(err.to_string().contains("2000"));
    }

    #[test]
    fn bit_error_is_source() {
        let err = ChannelError::from(BitError::InvalidVarint);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("varint"));
    }

    #[test]
    fn drop_reason_display() {
        assert_eq!(DropReason::Stale.to_string(), "stale or duplicate sequence");
        assert!(DropReason::FragmentBeyondTotal.to_string().contains("total"));
    }
}
