//! Channel configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::header::{FRAGMENT_HEADER_LEN, SEQUENCE_HEADER_LEN};
use crate::sequence::SequenceSpace;

/// Largest logical message a channel will ever carry (32 KiB).
pub const MAX_MSGLEN: usize = 32 * 1024;

/// Conservative datagram size for the legacy channel.
pub const MAX_PACKETLEN: usize = 1400;

/// Datagram size negotiated by the enhanced, non-fragmenting generations.
pub const MAX_PACKETLEN_LARGE: usize = 4096;

/// Which end of the connection this channel represents.
///
/// Only clients write a qport; servers read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NetSource {
    /// The observer end: sends input, receives state.
    Client,
    /// The authority end: sends state, receives input.
    Server,
}

/// Width of the qport field carried in client datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QportMode {
    /// No qport on the wire.
    None,
    /// One byte.
    Byte,
    /// Two bytes, little-endian.
    Word,
}

impl QportMode {
    /// Returns the number of bytes the qport occupies.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Byte => 1,
            Self::Word => 2,
        }
    }

    /// Returns `true` if no qport is carried.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Per-connection channel settings.
///
/// A channel is configured once when the connection is established and the
/// configuration never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelConfig {
    /// Local role; decides which side carries the qport.
    pub role: NetSource,

    /// Qport width used by client datagrams.
    pub qport: QportMode,

    /// Maximum size of one physical datagram, headers included.
    pub max_packet_len: usize,

    /// Maximum size of one logical message (reliable plus unreliable).
    pub max_message_len: usize,

    /// Whether oversized messages are split into fragments.
    ///
    /// Fragmenting channels use bit 30 of the sequence word as the fragment
    /// marker, leaving 30 bits of sequence space.
    pub fragmentation: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::legacy(NetSource::Client)
    }
}

impl ChannelConfig {
    /// The original datagram channel: 16-bit qport, no fragmentation.
    #[must_use]
    pub const fn legacy(role: NetSource) -> Self {
        Self {
            role,
            qport: QportMode::Word,
            max_packet_len: MAX_PACKETLEN,
            max_message_len: MAX_PACKETLEN,
            fragmentation: false,
        }
    }

    /// A fragmenting channel: 8-bit qport, messages up to [`MAX_MSGLEN`].
    #[must_use]
    pub const fn fragmenting(role: NetSource) -> Self {
        Self {
            role,
            qport: QportMode::Byte,
            max_packet_len: MAX_PACKETLEN,
            max_message_len: MAX_MSGLEN,
            fragmentation: true,
        }
    }

    /// Creates a fragmenting configuration with tiny datagrams.
    #[must_use]
    pub const fn for_testing(role: NetSource) -> Self {
        Self {
            role,
            qport: QportMode::Byte,
            max_packet_len: 64,
            max_message_len: 1024,
            fragmentation: true,
        }
    }

    /// Returns a copy with the role replaced.
    #[must_use]
    pub const fn with_role(mut self, role: NetSource) -> Self {
        self.role = role;
        self
    }

    /// Returns the sequence space this configuration uses.
    #[must_use]
    pub const fn sequence_space(&self) -> SequenceSpace {
        if self.fragmentation {
            SequenceSpace::FRAGMENTING
        } else {
            SequenceSpace::LEGACY
        }
    }

    /// Header bytes on datagrams sent by `source`.
    #[must_use]
    pub const fn header_len(&self, source: NetSource) -> usize {
        match source {
            NetSource::Client => SEQUENCE_HEADER_LEN + self.qport.len(),
            NetSource::Server => SEQUENCE_HEADER_LEN,
        }
    }

    /// Payload bytes that fit one unfragmented outgoing datagram.
    #[must_use]
    pub const fn datagram_capacity(&self) -> usize {
        self.max_packet_len
            .saturating_sub(self.header_len(self.role))
    }

    /// Payload bytes carried by each outgoing fragment.
    #[must_use]
    pub const fn fragment_capacity(&self) -> usize {
        self.datagram_capacity().saturating_sub(FRAGMENT_HEADER_LEN)
    }

    /// Largest logical message this channel can send.
    #[must_use]
    pub const fn message_capacity(&self) -> usize {
        let limit = if self.max_message_len < MAX_MSGLEN {
            self.max_message_len
        } else {
            MAX_MSGLEN
        };
        if self.fragmentation {
            limit
        } else if limit < self.datagram_capacity() {
            limit
        } else {
            self.datagram_capacity()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_legacy_client() {
        let config = ChannelConfig::default();
        assert_eq!(config.role, NetSource::Client);
        assert_eq!(config.qport, QportMode::Word);
        assert!(!config.fragmentation);
        assert_eq!(config.sequence_space(), SequenceSpace::LEGACY);
    }

    #[test]
    fn header_len_depends_on_sender() {
        let config = ChannelConfig::legacy(NetSource::Client);
        assert_eq!(config.header_len(NetSource::Client), 10);
        assert_eq!(config.header_len(NetSource::Server), 8);
    }

    #[test]
    fn legacy_message_capacity_is_one_datagram() {
        let client = ChannelConfig::legacy(NetSource::Client);
        assert_eq!(client.message_capacity(), MAX_PACKETLEN - 10);
        let server = ChannelConfig::legacy(NetSource::Server);
        assert_eq!(server.message_capacity(), MAX_PACKETLEN - 8);
    }

    #[test]
    fn fragmenting_capacity() {
        let config = ChannelConfig::fragmenting(NetSource::Client);
        assert_eq!(config.message_capacity(), MAX_MSGLEN);
        assert_eq!(config.fragment_capacity(), MAX_PACKETLEN - 9 - 4);
        assert_eq!(config.sequence_space(), SequenceSpace::FRAGMENTING);
    }

    #[test]
    fn message_capacity_never_exceeds_max_msglen() {
        let mut config = ChannelConfig::fragmenting(NetSource::Server);
        config.max_message_len = usize::MAX;
        assert_eq!(config.message_capacity(), MAX_MSGLEN);
    }

    #[test]
    fn testing_config_values() {
        const CONFIG: ChannelConfig = ChannelConfig::for_testing(NetSource::Server);
        assert_eq!(CONFIG.max_packet_len, 64);
        assert_eq!(CONFIG.datagram_capacity(), 56);
        assert_eq!(CONFIG.fragment_capacity(), 52);
    }

    #[test]
    fn qport_widths() {
        assert_eq!(QportMode::None.len(), 0);
        assert!(QportMode::None.is_empty());
        assert_eq!(QportMode::Byte.len(), 1);
        assert_eq!(QportMode::Word.len(), 2);
    }
}
