//! Datagram header layout.
//!
//! ```text
//! u32  sequence | RELIABLE_BIT [| FRAGMENT_BIT]
//! u32  ack      | RELIABLE_BIT (echo of the peer's reliable toggle)
//! qport         (client datagrams only; 0, 1 or 2 bytes)
//! u16  offset   | FRAGMENT_MORE   (fragments only)
//! u16  total_len                  (fragments only)
//! ```

use bitstream::{BitReader, BitWriter};

use crate::config::{ChannelConfig, NetSource, QportMode};
use crate::error::{ChannelError, ChannelResult};

/// Bytes taken by the two sequence words.
pub const SEQUENCE_HEADER_LEN: usize = 8;

/// Bytes taken by a fragment header.
pub const FRAGMENT_HEADER_LEN: usize = 4;

/// Reliable toggle in both sequence words.
pub const RELIABLE_BIT: u32 = 1 << 31;

/// Fragment marker in the outgoing sequence word of fragmenting channels.
pub const FRAGMENT_BIT: u32 = 1 << 30;

/// Set in a fragment offset when more fragments follow.
pub const FRAGMENT_MORE: u16 = 0x8000;

/// Position of one fragment within a logical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Byte offset of this fragment's data.
    pub offset: u16,
    /// Length of the complete message.
    pub total_len: u16,
    /// `true` on the final fragment.
    pub is_last: bool,
}

impl FragmentHeader {
    fn encode(self, writer: &mut BitWriter) -> ChannelResult<()> {
        let more = if self.is_last { 0 } else { FRAGMENT_MORE };
        writer.write_u16(self.offset | more)?;
        writer.write_u16(self.total_len)?;
        Ok(())
    }

    fn decode(reader: &mut BitReader<'_>) -> ChannelResult<Self> {
        let raw = reader.read_u16()?;
        let total_len = reader.read_u16()?;
        Ok(Self {
            offset: raw & !FRAGMENT_MORE,
            total_len,
            is_last: raw & FRAGMENT_MORE == 0,
        })
    }
}

/// Parsed datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Sender's sequence number.
    pub sequence: u32,
    /// Whether the payload starts with reliable data.
    pub reliable: bool,
    /// Newest sequence the sender has accepted from us.
    pub ack: u32,
    /// Sender's incoming reliable toggle.
    pub ack_reliable: bool,
    /// Client correlation token, when the sender is a client.
    pub qport: Option<u16>,
    /// Present on fragments.
    pub fragment: Option<FragmentHeader>,
}

impl PacketHeader {
    /// Writes the header for a datagram sent by `config.role`.
    pub fn encode(&self, writer: &mut BitWriter, config: &ChannelConfig) -> ChannelResult<()> {
        let mask = config.sequence_space().mask();
        let mut w1 = self.sequence & mask;
        if self.reliable {
            w1 |= RELIABLE_BIT;
        }
        if self.fragment.is_some() {
            w1 |= FRAGMENT_BIT;
        }
        let mut w2 = self.ack & mask;
        if self.ack_reliable {
            w2 |= RELIABLE_BIT;
        }
        writer.write_u32(w1)?;
        writer.write_u32(w2)?;

        if config.role == NetSource::Client {
            let qport = self.qport.unwrap_or(0);
            match config.qport {
                QportMode::None => {}
                #[allow(clippy::cast_possible_truncation)]
                QportMode::Byte => writer.write_u8(qport as u8)?,
                QportMode::Word => writer.write_u16(qport)?,
            }
        }
        if let Some(fragment) = self.fragment {
            fragment.encode(writer)?;
        }
        Ok(())
    }

    /// Reads the header of a datagram sent by the peer of `config.role`.
    pub fn decode(reader: &mut BitReader<'_>, config: &ChannelConfig) -> ChannelResult<Self> {
        let peer = match config.role {
            NetSource::Client => NetSource::Server,
            NetSource::Server => NetSource::Client,
        };
        let required = config.header_len(peer);
        if reader.remaining() < required {
            return Err(ChannelError::DatagramTooSmall {
                actual: reader.remaining(),
                required,
            });
        }

        let mask = config.sequence_space().mask();
        let w1 = reader.read_u32()?;
        let w2 = reader.read_u32()?;
        let qport = match peer {
            NetSource::Server => None,
            NetSource::Client => read_qport(reader, config.qport)?,
        };
        let fragment = if config.fragmentation && w1 & FRAGMENT_BIT != 0 {
            Some(FragmentHeader::decode(reader)?)
        } else {
            None
        };

        Ok(Self {
            sequence: w1 & mask,
            reliable: w1 & RELIABLE_BIT != 0,
            ack: w2 & mask,
            ack_reliable: w2 & RELIABLE_BIT != 0,
            qport,
            fragment,
        })
    }
}

fn read_qport(reader: &mut BitReader<'_>, mode: QportMode) -> ChannelResult<Option<u16>> {
    Ok(match mode {
        QportMode::None => None,
        QportMode::Byte => Some(u16::from(reader.read_u8()?)),
        QportMode::Word => Some(reader.read_u16()?),
    })
}

/// Reads the qport of a client datagram without touching any channel state.
///
/// Servers use this to route a datagram to its connection before processing.
/// Returns `None` for datagrams too short to carry one or when `mode` is
/// [`QportMode::None`].
#[must_use]
pub fn peek_qport(datagram: &[u8], mode: QportMode) -> Option<u16> {
    let mut reader = BitReader::new(datagram.get(SEQUENCE_HEADER_LEN..)?);
    read_qport(&mut reader, mode).ok().flatten()
}
