//! Entity and player delta codec for the deltachan wire format.
//!
//! The codec turns game state into the compact per-frame messages a
//! [`netchan::Channel`] carries, and back. Every record is a delta: a flag
//! mask naming the fields that changed, followed by those fields in a fixed
//! order and at the narrowest width the negotiated protocol allows.
//!
//! # Features
//!
//! - Entity deltas with continuation-byte flag masks and variable field widths
//! - Player deltas in the default, enhanced and packet (spectator) shapes
//! - Packet-entities lists merged against a reference frame
//! - Spawn baselines and a ring of recent frames for delta selection
//! - Protocol variants selected from a capability table
//!
//! # Design Principles
//!
//! - **Capabilities, not version checks** - Every layout decision reads a
//!   field of [`Capabilities`]; the variant only picks the row.
//! - **Typed failure** - Unrepresentable values and malformed input return a
//!   [`CodecError`]; nothing panics on hostile bytes.
//! - **All or nothing** - A failed decode leaves caller state untouched.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//! use codec::{
//!     read_delta_entity, read_entity_header, write_delta_entity, EntityDeltaFlags,
//!     EntityState, ProtocolVariant,
//! };
//!
//! let caps = ProtocolVariant::EnhancedV2.capabilities();
//! let old = EntityState::new(12);
//! let mut new = old.clone();
//! new.origin = [64.0, -8.0, 24.0];
//!
//! let mut writer = BitWriter::new(64);
//! write_delta_entity(&mut writer, Some(&old), &new, caps, EntityDeltaFlags::default()).unwrap();
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! let header = read_entity_header(&mut reader).unwrap();
//! let decoded = read_delta_entity(&mut reader, header, Some(&old), caps).unwrap();
//! assert_eq!(decoded.origin, new.origin);
//! ```

mod baseline;
mod entity;
mod error;
mod packet_entities;
mod player;
pub mod quant;
mod spectator;
mod stats;
mod types;
mod variant;

pub use baseline::{
    select_delta_frame, write_baseline, BaselineStore, FrameHistory, HistoryError, UPDATE_BACKUP,
};
pub use entity::{
    entity_delta_bits, read_delta_entity, read_entity_header, write_delta_entity,
    write_entity_removal, write_entity_terminator, EntityBits, EntityDeltaFlags, EntityHeader,
};
pub use error::{CodecError, CodecResult, FieldKind, FieldReason};
pub use packet_entities::{read_packet_entities, write_packet_entities, PacketEntitiesSummary};
pub use player::{
    player_delta_bits, read_delta_player, write_delta_player, PlayerBits, PlayerDelta,
    PlayerExtraBits, PlayerIgnore,
};
pub use spectator::{
    packet_player_bits, read_delta_player_packet, read_packet_player_header,
    write_delta_player_packet, write_player_removal, PacketPlayerBits, PacketPlayerHeader,
};
pub use stats::stats_mask;
pub use types::{
    BoxExtents, EntityState, FrameNumber, PlayerState, PmoveState, Solid, Vec3, MAX_STATS,
    RF_BEAM, RF_FRAMELERP,
};
pub use variant::{
    Capabilities, ChannelCaps, ProtocolVariant, StatsEncoding, VariantLimits,
    ENHANCED_MINOR_SHORT_ANGLES, EXTENDED_MINOR_LIMITS, EXTENDED_MINOR_MODERN, PROTOCOL_ENHANCED,
    PROTOCOL_EXTENDED, PROTOCOL_LEGACY,
};
