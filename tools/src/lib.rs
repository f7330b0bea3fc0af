//! Introspection and debugging tools for deltachan captures.
//!
//! This crate provides utilities for inspecting captured traffic:
//!
//! - Parse a datagram header and report sequencing and fragment state
//! - Decode a packet-entities payload into entity states
//! - Render decoded entities as JSON or a compact table
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to understand what the codec is doing.

use std::fmt::Write as _;

use bitstream::BitReader;
use codec::{read_packet_entities, BaselineStore, CodecResult, EntityState, ProtocolVariant};
use netchan::{ChannelConfig, ChannelResult, FragmentHeader, PacketHeader};
use serde::Serialize;

/// Header fields of one captured datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatagramReport {
    pub sequence: u32,
    pub reliable: bool,
    pub ack: u32,
    pub ack_reliable: bool,
    pub qport: Option<u16>,
    pub fragment: Option<FragmentReport>,
    /// Bytes after the header.
    pub payload_len: usize,
}

/// Fragment header of a captured datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FragmentReport {
    pub offset: u16,
    pub total_len: u16,
    pub is_last: bool,
}

impl From<FragmentHeader> for FragmentReport {
    fn from(header: FragmentHeader) -> Self {
        Self {
            offset: header.offset,
            total_len: header.total_len,
            is_last: header.is_last,
        }
    }
}

/// Parses the header of `bytes` as received by an endpoint configured with
/// `config`.
pub fn inspect_datagram(bytes: &[u8], config: &ChannelConfig) -> ChannelResult<DatagramReport> {
    let mut reader = BitReader::new(bytes);
    let header = PacketHeader::decode(&mut reader, config)?;
    Ok(DatagramReport {
        sequence: header.sequence,
        reliable: header.reliable,
        ack: header.ack,
        ack_reliable: header.ack_reliable,
        qport: header.qport,
        fragment: header.fragment.map(FragmentReport::from),
        payload_len: reader.remaining(),
    })
}

/// Decodes a packet-entities payload against an empty reference frame and
/// empty baselines.
pub fn decode_entities(bytes: &[u8], variant: ProtocolVariant) -> CodecResult<Vec<EntityState>> {
    let caps = variant.capabilities();
    let baselines = BaselineStore::new(0);
    let mut reader = BitReader::new(bytes);
    read_packet_entities(&mut reader, &[], &baselines, caps)
}

/// Formats decoded entities as one line each.
#[must_use]
pub fn format_entities_pretty(entities: &[EntityState]) -> String {
    let mut out = String::new();
    for entity in entities {
        let [x, y, z] = entity.origin;
        let _ = write!(
            out,
            "#{:<5} model {:<5} frame {:<5} origin ({x:.3}, {y:.3}, {z:.3})",
            entity.number, entity.model_index[0], entity.frame
        );
        if entity.event != 0 {
            let _ = write!(out, " event {}", entity.event);
        }
        if entity.sound != 0 {
            let _ = write!(out, " sound {}", entity.sound);
        }
        out.push('\n');
    }
    let _ = write!(out, "{} entities", entities.len());
    out
}
