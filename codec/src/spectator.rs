//! Packet-shaped player records for spectator and demo streams.
//!
//! Every player in view gets a self-contained record: slot number, a 16-bit
//! flag word whose top bit announces an optional third flag byte, then the
//! flagged fields. Prediction-only fields never appear. Unchanged players
//! are omitted unless forced.

use bitstream::{BitReader, BitWriter};

use crate::error::{CodecError, CodecResult, FieldKind};
use crate::player::{
    angles_differ, clear_unsupported, coords_differ, offsets_differ, read_angles, read_coords,
    read_gun_index, read_offsets, write_angles, write_coords, write_gun_index, write_offsets,
    PlayerIgnore,
};
use crate::stats::{read_stats, stats_mask, write_stats};
use crate::types::PlayerState;
use crate::variant::Capabilities;

/// Flag mask of a packet-shaped player record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PacketPlayerBits(u32);

impl PacketPlayerBits {
    pub const M_TYPE: u32 = 1 << 0;
    pub const M_ORIGIN: u32 = 1 << 1;
    pub const M_ORIGIN_Z: u32 = 1 << 2;
    pub const VIEWOFFSET: u32 = 1 << 3;
    pub const VIEWANGLES: u32 = 1 << 4;
    pub const VIEW_ROLL: u32 = 1 << 5;
    pub const KICKANGLES: u32 = 1 << 6;
    pub const BLEND: u32 = 1 << 7;
    pub const FOV: u32 = 1 << 8;
    pub const WEAPONINDEX: u32 = 1 << 9;
    pub const WEAPONFRAME: u32 = 1 << 10;
    pub const GUN_OFFSET: u32 = 1 << 11;
    pub const GUN_ANGLES: u32 = 1 << 12;
    pub const RDFLAGS: u32 = 1 << 13;
    pub const STATS: u32 = 1 << 14;
    pub const MOREBITS: u32 = 1 << 15;

    pub const REMOVE: u32 = 1 << 16;
    pub const DAMAGE_BLEND: u32 = 1 << 17;
    pub const GUN_SKIN: u32 = 1 << 18;
    pub const GUN_RATE: u32 = 1 << 19;

    const EXTENDED: u32 = Self::DAMAGE_BLEND | Self::GUN_SKIN | Self::GUN_RATE;
    const DEFINED: u32 = (1 << 20) - 1;

    /// Creates flags from a raw mask.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw mask.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if any bit of `mask` is set.
    #[must_use]
    pub const fn contains(self, mask: u32) -> bool {
        self.0 & mask != 0
    }

    /// Returns `true` if no field is flagged.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & !Self::MOREBITS == 0
    }

    fn set(&mut self, mask: u32) {
        self.0 |= mask;
    }

    const fn with_continuation(self) -> Self {
        if self.0 >> 16 != 0 {
            Self(self.0 | Self::MOREBITS)
        } else {
            Self(self.0 & !Self::MOREBITS)
        }
    }
}

/// Slot number and flags leading a packet-shaped player record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketPlayerHeader {
    pub number: u8,
    pub bits: PacketPlayerBits,
}

impl PacketPlayerHeader {
    /// Returns `true` for a removal record.
    #[must_use]
    pub const fn is_remove(&self) -> bool {
        self.bits.contains(PacketPlayerBits::REMOVE)
    }
}

const XY: [usize; 2] = [0, 1];
const Z: [usize; 1] = [2];

/// Computes the packet-shape flags for `from -> to`.
#[must_use]
pub fn packet_player_bits(
    from: &PlayerState,
    to: &PlayerState,
    caps: &Capabilities,
) -> PacketPlayerBits {
    let float = caps.float_coords;
    let mut bits = PacketPlayerBits::default();

    if to.pmove.pm_type != from.pmove.pm_type {
        bits.set(PacketPlayerBits::M_TYPE);
    }
    if coords_differ(&to.pmove.origin, &from.pmove.origin, &XY, float) {
        bits.set(PacketPlayerBits::M_ORIGIN);
    }
    if coords_differ(&to.pmove.origin, &from.pmove.origin, &Z, float) {
        bits.set(PacketPlayerBits::M_ORIGIN_Z);
    }
    if offsets_differ(&to.view_offset, &from.view_offset) {
        bits.set(PacketPlayerBits::VIEWOFFSET);
    }
    if angles_differ(&to.view_angles, &from.view_angles, &XY, float) {
        bits.set(PacketPlayerBits::VIEWANGLES);
    }
    if angles_differ(&to.view_angles, &from.view_angles, &Z, float) {
        bits.set(PacketPlayerBits::VIEW_ROLL);
    }
    if offsets_differ(&to.kick_angles, &from.kick_angles) {
        bits.set(PacketPlayerBits::KICKANGLES);
    }
    if to.blend != from.blend {
        bits.set(PacketPlayerBits::BLEND);
    }
    if to.fov != from.fov {
        bits.set(PacketPlayerBits::FOV);
    }
    if to.gun_index != from.gun_index {
        bits.set(PacketPlayerBits::WEAPONINDEX);
    }
    if to.gun_frame != from.gun_frame {
        bits.set(PacketPlayerBits::WEAPONFRAME);
    }
    if offsets_differ(&to.gun_offset, &from.gun_offset) {
        bits.set(PacketPlayerBits::GUN_OFFSET);
    }
    if offsets_differ(&to.gun_angles, &from.gun_angles) {
        bits.set(PacketPlayerBits::GUN_ANGLES);
    }
    if to.rdflags != from.rdflags {
        bits.set(PacketPlayerBits::RDFLAGS);
    }
    if stats_mask(&from.stats, &to.stats, caps.stats) != 0 {
        bits.set(PacketPlayerBits::STATS);
    }
    if caps.player_extensions {
        if to.damage_blend != from.damage_blend {
            bits.set(PacketPlayerBits::DAMAGE_BLEND);
        }
        if to.gun_skin != from.gun_skin {
            bits.set(PacketPlayerBits::GUN_SKIN);
        }
        if to.gun_rate != from.gun_rate {
            bits.set(PacketPlayerBits::GUN_RATE);
        }
    }
    bits.with_continuation()
}

fn write_packet_header(
    writer: &mut BitWriter,
    number: u8,
    bits: PacketPlayerBits,
) -> CodecResult<()> {
    writer.write_u8(number)?;
    #[allow(clippy::cast_possible_truncation)]
    writer.write_u16(bits.raw() as u16)?;
    if bits.contains(PacketPlayerBits::MOREBITS) {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u8((bits.raw() >> 16) as u8)?;
    }
    Ok(())
}

/// Writes the packet-shaped record `from -> to` for player slot `number`.
///
/// Suppressed groups in `ignore` are copied from `from` into `to` first.
/// Writes nothing and returns an empty mask when nothing changed and
/// `force` is unset.
pub fn write_delta_player_packet(
    writer: &mut BitWriter,
    number: u8,
    from: Option<&PlayerState>,
    to: &mut PlayerState,
    caps: &Capabilities,
    ignore: PlayerIgnore,
    force: bool,
) -> CodecResult<PacketPlayerBits> {
    let null = PlayerState::default();
    let from = from.unwrap_or(&null);
    ignore.apply(from, to);
    let bits = packet_player_bits(from, to, caps);
    if bits.is_empty() && !force {
        return Ok(bits);
    }
    let float = caps.float_coords;

    write_packet_header(writer, number, bits)?;

    if bits.contains(PacketPlayerBits::M_TYPE) {
        writer.write_u8(to.pmove.pm_type)?;
    }
    if bits.contains(PacketPlayerBits::M_ORIGIN) {
        write_coords(writer, &to.pmove.origin, &XY, float)?;
    }
    if bits.contains(PacketPlayerBits::M_ORIGIN_Z) {
        write_coords(writer, &to.pmove.origin, &Z, float)?;
    }
    if bits.contains(PacketPlayerBits::VIEWOFFSET) {
        write_offsets(writer, &to.view_offset)?;
    }
    if bits.contains(PacketPlayerBits::VIEWANGLES) {
        write_angles(writer, &to.view_angles, &XY, float)?;
    }
    if bits.contains(PacketPlayerBits::VIEW_ROLL) {
        write_angles(writer, &to.view_angles, &Z, float)?;
    }
    if bits.contains(PacketPlayerBits::KICKANGLES) {
        write_offsets(writer, &to.kick_angles)?;
    }
    if bits.contains(PacketPlayerBits::WEAPONINDEX) {
        write_gun_index(writer, to.gun_index, caps)?;
    }
    if bits.contains(PacketPlayerBits::GUN_SKIN) {
        writer.write_u8(to.gun_skin)?;
    }
    if bits.contains(PacketPlayerBits::WEAPONFRAME) {
        writer.write_u8(to.gun_frame)?;
    }
    if bits.contains(PacketPlayerBits::GUN_OFFSET) {
        write_offsets(writer, &to.gun_offset)?;
    }
    if bits.contains(PacketPlayerBits::GUN_ANGLES) {
        write_offsets(writer, &to.gun_angles)?;
    }
    if bits.contains(PacketPlayerBits::GUN_RATE) {
        writer.write_u8(to.gun_rate)?;
    }
    if bits.contains(PacketPlayerBits::BLEND) {
        writer.write_bytes(&to.blend)?;
    }
    if bits.contains(PacketPlayerBits::DAMAGE_BLEND) {
        writer.write_bytes(&to.damage_blend)?;
    }
    if bits.contains(PacketPlayerBits::FOV) {
        writer.write_u8(to.fov)?;
    }
    if bits.contains(PacketPlayerBits::RDFLAGS) {
        writer.write_u8(to.rdflags)?;
    }
    if bits.contains(PacketPlayerBits::STATS) {
        let mask = stats_mask(&from.stats, &to.stats, caps.stats);
        write_stats(writer, &to.stats, mask, caps.stats)?;
    }

    Ok(bits)
}

/// Writes a removal record for player slot `number`.
pub fn write_player_removal(writer: &mut BitWriter, number: u8) -> CodecResult<()> {
    let bits = PacketPlayerBits::from_raw(PacketPlayerBits::REMOVE).with_continuation();
    write_packet_header(writer, number, bits)
}

/// Reads a packet-shaped record's slot number and flags.
pub fn read_packet_player_header(reader: &mut BitReader<'_>) -> CodecResult<PacketPlayerHeader> {
    let number = reader.read_u8()?;
    let mut raw = u32::from(reader.read_u16()?);
    if raw & PacketPlayerBits::MOREBITS != 0 {
        raw |= u32::from(reader.read_u8()?) << 16;
    }
    Ok(PacketPlayerHeader {
        number,
        bits: PacketPlayerBits::from_raw(raw),
    })
}

/// Decodes the fields announced by `header` on top of `base`.
pub fn read_delta_player_packet(
    reader: &mut BitReader<'_>,
    header: PacketPlayerHeader,
    base: Option<&PlayerState>,
    caps: &Capabilities,
) -> CodecResult<PlayerState> {
    let bits = header.bits;
    let mut unexpected = bits.raw() & !PacketPlayerBits::DEFINED;
    unexpected |= bits.raw() & PacketPlayerBits::REMOVE;
    if !caps.player_extensions {
        unexpected |= bits.raw() & PacketPlayerBits::EXTENDED;
    }
    if unexpected != 0 {
        return Err(CodecError::unexpected_bits(
            FieldKind::PlayerFlags,
            u64::from(unexpected),
        ));
    }

    let float = caps.float_coords;
    let mut to = base.cloned().unwrap_or_default();
    clear_unsupported(&mut to, caps);

    if bits.contains(PacketPlayerBits::M_TYPE) {
        to.pmove.pm_type = reader.read_u8()?;
    }
    if bits.contains(PacketPlayerBits::M_ORIGIN) {
        read_coords(reader, &mut to.pmove.origin, &XY, float)?;
    }
    if bits.contains(PacketPlayerBits::M_ORIGIN_Z) {
        read_coords(reader, &mut to.pmove.origin, &Z, float)?;
    }
    if bits.contains(PacketPlayerBits::VIEWOFFSET) {
        read_offsets(reader, &mut to.view_offset)?;
    }
    if bits.contains(PacketPlayerBits::VIEWANGLES) {
        read_angles(reader, &mut to.view_angles, &XY, float)?;
    }
    if bits.contains(PacketPlayerBits::VIEW_ROLL) {
        read_angles(reader, &mut to.view_angles, &Z, float)?;
    }
    if bits.contains(PacketPlayerBits::KICKANGLES) {
        read_offsets(reader, &mut to.kick_angles)?;
    }
    if bits.contains(PacketPlayerBits::WEAPONINDEX) {
        to.gun_index = read_gun_index(reader, caps)?;
    }
    if bits.contains(PacketPlayerBits::GUN_SKIN) {
        to.gun_skin = reader.read_u8()?;
    }
    if bits.contains(PacketPlayerBits::WEAPONFRAME) {
        to.gun_frame = reader.read_u8()?;
    }
    if bits.contains(PacketPlayerBits::GUN_OFFSET) {
        read_offsets(reader, &mut to.gun_offset)?;
    }
    if bits.contains(PacketPlayerBits::GUN_ANGLES) {
        read_offsets(reader, &mut to.gun_angles)?;
    }
    if bits.contains(PacketPlayerBits::GUN_RATE) {
        to.gun_rate = reader.read_u8()?;
    }
    if bits.contains(PacketPlayerBits::BLEND) {
        let bytes = reader.read_bytes(4)?;
        to.blend.copy_from_slice(bytes);
    }
    if bits.contains(PacketPlayerBits::DAMAGE_BLEND) {
        let bytes = reader.read_bytes(4)?;
        to.damage_blend.copy_from_slice(bytes);
    }
    if bits.contains(PacketPlayerBits::FOV) {
        to.fov = reader.read_u8()?;
    }
    if bits.contains(PacketPlayerBits::RDFLAGS) {
        to.rdflags = reader.read_u8()?;
    }
    if bits.contains(PacketPlayerBits::STATS) {
        read_stats(reader, &mut to.stats, caps.stats)?;
    }

    Ok(to)
}
