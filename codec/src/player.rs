//! Player state delta encoding.
//!
//! Two shapes carry the connected client's own view:
//!
//! - the **default** shape: one 16-bit primary mask, whole vectors per flag,
//!   and a stats mask that is always present;
//! - the **enhanced** shape: the same primary mask with some vectors split
//!   per axis group, plus a secondary mask that the caller transmits
//!   elsewhere (typically in the frame header) and hands back on decode.
//!
//! Which shape applies is decided by [`Capabilities::enhanced_player`].
//! Spectator streams use the packet shape in [`crate::spectator`].

use bitstream::{BitReader, BitWriter};

use crate::error::{CodecError, CodecResult, FieldKind};
use crate::quant::{
    angle16_key, coord_key, offset_to_fixed, read_angle16, read_coord, read_offset, write_angle16,
    write_coord, write_offset,
};
use crate::stats::{clear_unaddressable, read_stats, stats_mask, write_stats};
use crate::types::{PlayerState, Vec3};
use crate::variant::Capabilities;

/// Primary player flag mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlayerBits(u16);

impl PlayerBits {
    pub const M_TYPE: u16 = 1 << 0;
    pub const M_ORIGIN: u16 = 1 << 1;
    pub const M_VELOCITY: u16 = 1 << 2;
    pub const M_TIME: u16 = 1 << 3;
    pub const M_FLAGS: u16 = 1 << 4;
    pub const M_GRAVITY: u16 = 1 << 5;
    pub const M_DELTA_ANGLES: u16 = 1 << 6;
    pub const VIEWOFFSET: u16 = 1 << 7;
    pub const VIEWANGLES: u16 = 1 << 8;
    pub const KICKANGLES: u16 = 1 << 9;
    pub const BLEND: u16 = 1 << 10;
    pub const FOV: u16 = 1 << 11;
    pub const WEAPONINDEX: u16 = 1 << 12;
    pub const WEAPONFRAME: u16 = 1 << 13;
    pub const RDFLAGS: u16 = 1 << 14;

    const DEFINED: u16 = (1 << 15) - 1;

    /// Creates flags from a raw mask.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw mask.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns `true` if any bit of `mask` is set.
    #[must_use]
    pub const fn contains(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    /// Returns `true` if no field is flagged.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn set(&mut self, mask: u16) {
        self.0 |= mask;
    }
}

/// Secondary flag mask of the enhanced shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlayerExtraBits(u16);

impl PlayerExtraBits {
    pub const GUN_OFFSET: u16 = 1 << 0;
    pub const GUN_ANGLES: u16 = 1 << 1;
    pub const M_VELOCITY_Z: u16 = 1 << 2;
    pub const M_ORIGIN_Z: u16 = 1 << 3;
    pub const VIEW_ROLL: u16 = 1 << 4;
    pub const STATS: u16 = 1 << 5;
    pub const DAMAGE_BLEND: u16 = 1 << 6;
    pub const GUN_SKIN: u16 = 1 << 7;
    pub const GUN_RATE: u16 = 1 << 8;

    const BASE: u16 = (1 << 6) - 1;
    const EXTENDED: u16 = Self::DAMAGE_BLEND | Self::GUN_SKIN | Self::GUN_RATE;

    /// Creates flags from a raw mask.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw mask.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns `true` if any bit of `mask` is set.
    #[must_use]
    pub const fn contains(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    /// Returns `true` if no field is flagged.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn set(&mut self, mask: u16) {
        self.0 |= mask;
    }
}

/// Flags produced by one player delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerDelta {
    pub bits: PlayerBits,
    /// Always empty in the default shape.
    pub extra: PlayerExtraBits,
}

/// Field groups whose changes are suppressed.
///
/// A suppressed group keeps the reference value: the encoder copies it into
/// the target so both ends agree on what the client holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerIgnore {
    /// Velocity, pmove time, pmove flags and gravity.
    pub prediction: bool,
    pub delta_angles: bool,
    pub view_angles: bool,
    pub blend: bool,
    /// Gun model, skin, frame, offset, angles and rate.
    pub gun: bool,
}

impl PlayerIgnore {
    /// Nothing suppressed.
    pub const NONE: Self = Self {
        prediction: false,
        delta_angles: false,
        view_angles: false,
        blend: false,
        gun: false,
    };

    /// Suppression used for spectator streams, which never predict.
    #[must_use]
    pub const fn spectator() -> Self {
        Self {
            prediction: true,
            delta_angles: true,
            ..Self::NONE
        }
    }

    /// Copies suppressed groups from `from` into `to`.
    pub fn apply(&self, from: &PlayerState, to: &mut PlayerState) {
        if self.prediction {
            to.pmove.velocity = from.pmove.velocity;
            to.pmove.pm_time = from.pmove.pm_time;
            to.pmove.pm_flags = from.pmove.pm_flags;
            to.pmove.gravity = from.pmove.gravity;
        }
        if self.delta_angles {
            to.pmove.delta_angles = from.pmove.delta_angles;
        }
        if self.view_angles {
            to.view_angles = from.view_angles;
        }
        if self.blend {
            to.blend = from.blend;
            to.damage_blend = from.damage_blend;
        }
        if self.gun {
            to.gun_index = from.gun_index;
            to.gun_skin = from.gun_skin;
            to.gun_frame = from.gun_frame;
            to.gun_offset = from.gun_offset;
            to.gun_angles = from.gun_angles;
            to.gun_rate = from.gun_rate;
        }
    }
}

pub(crate) fn coords_differ(a: &Vec3, b: &Vec3, axes: &[usize], float: bool) -> bool {
    axes.iter()
        .any(|&axis| coord_key(a[axis], float) != coord_key(b[axis], float))
}

pub(crate) fn angles_differ(a: &Vec3, b: &Vec3, axes: &[usize], float: bool) -> bool {
    axes.iter()
        .any(|&axis| angle16_key(a[axis], float) != angle16_key(b[axis], float))
}

pub(crate) fn offsets_differ(a: &Vec3, b: &Vec3) -> bool {
    a.iter()
        .zip(b.iter())
        .any(|(x, y)| offset_to_fixed(*x) != offset_to_fixed(*y))
}

pub(crate) fn write_coords(
    writer: &mut BitWriter,
    value: &Vec3,
    axes: &[usize],
    float: bool,
) -> CodecResult<()> {
    for &axis in axes {
        write_coord(writer, value[axis], float)?;
    }
    Ok(())
}

pub(crate) fn read_coords(
    reader: &mut BitReader<'_>,
    value: &mut Vec3,
    axes: &[usize],
    float: bool,
) -> CodecResult<()> {
    for &axis in axes {
        value[axis] = read_coord(reader, float)?;
    }
    Ok(())
}

pub(crate) fn write_angles(
    writer: &mut BitWriter,
    value: &Vec3,
    axes: &[usize],
    float: bool,
) -> CodecResult<()> {
    for &axis in axes {
        write_angle16(writer, value[axis], float)?;
    }
    Ok(())
}

pub(crate) fn read_angles(
    reader: &mut BitReader<'_>,
    value: &mut Vec3,
    axes: &[usize],
    float: bool,
) -> CodecResult<()> {
    for &axis in axes {
        value[axis] = read_angle16(reader, float)?;
    }
    Ok(())
}

pub(crate) fn write_offsets(writer: &mut BitWriter, value: &Vec3) -> CodecResult<()> {
    for component in value {
        write_offset(writer, *component)?;
    }
    Ok(())
}

pub(crate) fn read_offsets(reader: &mut BitReader<'_>, value: &mut Vec3) -> CodecResult<()> {
    for component in value {
        *component = read_offset(reader)?;
    }
    Ok(())
}

pub(crate) fn write_gun_index(
    writer: &mut BitWriter,
    gun_index: u16,
    caps: &Capabilities,
) -> CodecResult<()> {
    if gun_index >= caps.limits.max_models {
        return Err(CodecError::out_of_range(
            FieldKind::GunIndex,
            i64::from(gun_index),
            0,
            i64::from(caps.limits.max_models) - 1,
        ));
    }
    if caps.extensions {
        writer.write_u16(gun_index)?;
    } else {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u8(gun_index as u8)?;
    }
    Ok(())
}

pub(crate) fn read_gun_index(reader: &mut BitReader<'_>, caps: &Capabilities) -> CodecResult<u16> {
    if caps.extensions {
        Ok(reader.read_u16()?)
    } else {
        Ok(u16::from(reader.read_u8()?))
    }
}

fn write_pm_word(
    writer: &mut BitWriter,
    value: u16,
    field: FieldKind,
    caps: &Capabilities,
) -> CodecResult<()> {
    if caps.player_extensions {
        writer.write_u16(value)?;
        return Ok(());
    }
    let byte = u8::try_from(value)
        .map_err(|_| CodecError::out_of_range(field, i64::from(value), 0, 255))?;
    writer.write_u8(byte)?;
    Ok(())
}

fn read_pm_word(reader: &mut BitReader<'_>, caps: &Capabilities) -> CodecResult<u16> {
    if caps.player_extensions {
        Ok(reader.read_u16()?)
    } else {
        Ok(u16::from(reader.read_u8()?))
    }
}

/// Resets fields the variant cannot carry.
pub(crate) fn clear_unsupported(state: &mut PlayerState, caps: &Capabilities) {
    if !caps.player_extensions {
        state.damage_blend = [0; 4];
        state.gun_skin = 0;
        state.gun_rate = 0;
    }
    clear_unaddressable(&mut state.stats, caps.stats);
}

const XYZ: [usize; 3] = [0, 1, 2];
const XY: [usize; 2] = [0, 1];
const Z: [usize; 1] = [2];

fn primary_bits(from: &PlayerState, to: &PlayerState, split: bool, float: bool) -> PlayerBits {
    let mut bits = PlayerBits::default();
    let planar: &[usize] = if split { &XY } else { &XYZ };

    if to.pmove.pm_type != from.pmove.pm_type {
        bits.set(PlayerBits::M_TYPE);
    }
    if coords_differ(&to.pmove.origin, &from.pmove.origin, planar, float) {
        bits.set(PlayerBits::M_ORIGIN);
    }
    if coords_differ(&to.pmove.velocity, &from.pmove.velocity, planar, float) {
        bits.set(PlayerBits::M_VELOCITY);
    }
    if to.pmove.pm_time != from.pmove.pm_time {
        bits.set(PlayerBits::M_TIME);
    }
    if to.pmove.pm_flags != from.pmove.pm_flags {
        bits.set(PlayerBits::M_FLAGS);
    }
    if to.pmove.gravity != from.pmove.gravity {
        bits.set(PlayerBits::M_GRAVITY);
    }
    if angles_differ(&to.pmove.delta_angles, &from.pmove.delta_angles, &XYZ, float) {
        bits.set(PlayerBits::M_DELTA_ANGLES);
    }
    if offsets_differ(&to.view_offset, &from.view_offset) {
        bits.set(PlayerBits::VIEWOFFSET);
    }
    if angles_differ(&to.view_angles, &from.view_angles, planar, float) {
        bits.set(PlayerBits::VIEWANGLES);
    }
    if offsets_differ(&to.kick_angles, &from.kick_angles) {
        bits.set(PlayerBits::KICKANGLES);
    }
    if to.blend != from.blend {
        bits.set(PlayerBits::BLEND);
    }
    if to.fov != from.fov {
        bits.set(PlayerBits::FOV);
    }
    if to.gun_index != from.gun_index {
        bits.set(PlayerBits::WEAPONINDEX);
    }
    if to.gun_frame != from.gun_frame
        || (!split
            && (offsets_differ(&to.gun_offset, &from.gun_offset)
                || offsets_differ(&to.gun_angles, &from.gun_angles)))
    {
        bits.set(PlayerBits::WEAPONFRAME);
    }
    if to.rdflags != from.rdflags {
        bits.set(PlayerBits::RDFLAGS);
    }
    bits
}

fn extra_bits(from: &PlayerState, to: &PlayerState, caps: &Capabilities) -> PlayerExtraBits {
    let float = caps.float_coords;
    let mut extra = PlayerExtraBits::default();
    if offsets_differ(&to.gun_offset, &from.gun_offset) {
        extra.set(PlayerExtraBits::GUN_OFFSET);
    }
    if offsets_differ(&to.gun_angles, &from.gun_angles) {
        extra.set(PlayerExtraBits::GUN_ANGLES);
    }
    if coords_differ(&to.pmove.velocity, &from.pmove.velocity, &Z, float) {
        extra.set(PlayerExtraBits::M_VELOCITY_Z);
    }
    if coords_differ(&to.pmove.origin, &from.pmove.origin, &Z, float) {
        extra.set(PlayerExtraBits::M_ORIGIN_Z);
    }
    if angles_differ(&to.view_angles, &from.view_angles, &Z, float) {
        extra.set(PlayerExtraBits::VIEW_ROLL);
    }
    if stats_mask(&from.stats, &to.stats, caps.stats) != 0 {
        extra.set(PlayerExtraBits::STATS);
    }
    if caps.player_extensions {
        if to.damage_blend != from.damage_blend {
            extra.set(PlayerExtraBits::DAMAGE_BLEND);
        }
        if to.gun_skin != from.gun_skin {
            extra.set(PlayerExtraBits::GUN_SKIN);
        }
        if to.gun_rate != from.gun_rate {
            extra.set(PlayerExtraBits::GUN_RATE);
        }
    }
    extra
}

/// Computes the flags for `from -> to` under `caps`.
#[must_use]
pub fn player_delta_bits(
    from: &PlayerState,
    to: &PlayerState,
    caps: &Capabilities,
) -> PlayerDelta {
    let split = caps.enhanced_player;
    PlayerDelta {
        bits: primary_bits(from, to, split, caps.float_coords),
        extra: if split {
            extra_bits(from, to, caps)
        } else {
            PlayerExtraBits::default()
        },
    }
}

/// Writes the delta `from -> to` in the shape `caps` selects.
///
/// Suppressed groups in `ignore` are first copied from `from` into `to`.
/// `from = None` encodes against the all-default state. The primary mask
/// is always written; in the enhanced shape the returned secondary mask
/// must reach the decoder separately.
pub fn write_delta_player(
    writer: &mut BitWriter,
    from: Option<&PlayerState>,
    to: &mut PlayerState,
    caps: &Capabilities,
    ignore: PlayerIgnore,
) -> CodecResult<PlayerDelta> {
    let null = PlayerState::default();
    let from = from.unwrap_or(&null);
    ignore.apply(from, to);
    let delta = player_delta_bits(from, to, caps);
    let PlayerDelta { bits, extra } = delta;
    let split = caps.enhanced_player;
    let float = caps.float_coords;
    let planar: &[usize] = if split { &XY } else { &XYZ };

    writer.write_u16(bits.raw())?;

    if bits.contains(PlayerBits::M_TYPE) {
        writer.write_u8(to.pmove.pm_type)?;
    }
    if bits.contains(PlayerBits::M_ORIGIN) {
        write_coords(writer, &to.pmove.origin, planar, float)?;
    }
    if extra.contains(PlayerExtraBits::M_ORIGIN_Z) {
        write_coords(writer, &to.pmove.origin, &Z, float)?;
    }
    if bits.contains(PlayerBits::M_VELOCITY) {
        write_coords(writer, &to.pmove.velocity, planar, float)?;
    }
    if extra.contains(PlayerExtraBits::M_VELOCITY_Z) {
        write_coords(writer, &to.pmove.velocity, &Z, float)?;
    }
    if bits.contains(PlayerBits::M_TIME) {
        write_pm_word(writer, to.pmove.pm_time, FieldKind::PmTime, caps)?;
    }
    if bits.contains(PlayerBits::M_FLAGS) {
        write_pm_word(writer, to.pmove.pm_flags, FieldKind::PmFlags, caps)?;
    }
    if bits.contains(PlayerBits::M_GRAVITY) {
        writer.write_i16(to.pmove.gravity)?;
    }
    if bits.contains(PlayerBits::M_DELTA_ANGLES) {
        write_angles(writer, &to.pmove.delta_angles, &XYZ, float)?;
    }
    if bits.contains(PlayerBits::VIEWOFFSET) {
        write_offsets(writer, &to.view_offset)?;
    }
    if bits.contains(PlayerBits::VIEWANGLES) {
        write_angles(writer, &to.view_angles, planar, float)?;
    }
    if extra.contains(PlayerExtraBits::VIEW_ROLL) {
        write_angles(writer, &to.view_angles, &Z, float)?;
    }
    if bits.contains(PlayerBits::KICKANGLES) {
        write_offsets(writer, &to.kick_angles)?;
    }
    if bits.contains(PlayerBits::WEAPONINDEX) {
        write_gun_index(writer, to.gun_index, caps)?;
    }
    if extra.contains(PlayerExtraBits::GUN_SKIN) {
        writer.write_u8(to.gun_skin)?;
    }
    if bits.contains(PlayerBits::WEAPONFRAME) {
        writer.write_u8(to.gun_frame)?;
        if !split {
            write_offsets(writer, &to.gun_offset)?;
            write_offsets(writer, &to.gun_angles)?;
        }
    }
    if extra.contains(PlayerExtraBits::GUN_OFFSET) {
        write_offsets(writer, &to.gun_offset)?;
    }
    if extra.contains(PlayerExtraBits::GUN_ANGLES) {
        write_offsets(writer, &to.gun_angles)?;
    }
    if extra.contains(PlayerExtraBits::GUN_RATE) {
        writer.write_u8(to.gun_rate)?;
    }
    if bits.contains(PlayerBits::BLEND) {
        writer.write_bytes(&to.blend)?;
    }
    if extra.contains(PlayerExtraBits::DAMAGE_BLEND) {
        writer.write_bytes(&to.damage_blend)?;
    }
    if bits.contains(PlayerBits::FOV) {
        writer.write_u8(to.fov)?;
    }
    if bits.contains(PlayerBits::RDFLAGS) {
        writer.write_u8(to.rdflags)?;
    }

    if !split || extra.contains(PlayerExtraBits::STATS) {
        let mask = stats_mask(&from.stats, &to.stats, caps.stats);
        write_stats(writer, &to.stats, mask, caps.stats)?;
    }

    Ok(delta)
}

fn read_array4(reader: &mut BitReader<'_>) -> CodecResult<[u8; 4]> {
    let bytes = reader.read_bytes(4)?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decodes a player delta on top of `base`.
///
/// `extra` is the secondary mask carried outside the record; it must be
/// empty in the default shape.
pub fn read_delta_player(
    reader: &mut BitReader<'_>,
    base: Option<&PlayerState>,
    extra: PlayerExtraBits,
    caps: &Capabilities,
) -> CodecResult<PlayerState> {
    let split = caps.enhanced_player;
    let allowed = match (split, caps.player_extensions) {
        (false, _) => 0,
        (true, false) => PlayerExtraBits::BASE,
        (true, true) => PlayerExtraBits::BASE | PlayerExtraBits::EXTENDED,
    };
    if extra.raw() & !allowed != 0 {
        return Err(CodecError::unexpected_bits(
            FieldKind::PlayerFlags,
            u64::from(extra.raw() & !allowed),
        ));
    }

    let bits = PlayerBits::from_raw(reader.read_u16()?);
    if bits.raw() & !PlayerBits::DEFINED != 0 {
        return Err(CodecError::unexpected_bits(
            FieldKind::PlayerFlags,
            u64::from(bits.raw() & !PlayerBits::DEFINED),
        ));
    }

    let float = caps.float_coords;
    let planar: &[usize] = if split { &XY } else { &XYZ };
    let mut to = base.cloned().unwrap_or_default();
    clear_unsupported(&mut to, caps);

    if bits.contains(PlayerBits::M_TYPE) {
        to.pmove.pm_type = reader.read_u8()?;
    }
    if bits.contains(PlayerBits::M_ORIGIN) {
        read_coords(reader, &mut to.pmove.origin, planar, float)?;
    }
    if extra.contains(PlayerExtraBits::M_ORIGIN_Z) {
        read_coords(reader, &mut to.pmove.origin, &Z, float)?;
    }
    if bits.contains(PlayerBits::M_VELOCITY) {
        read_coords(reader, &mut to.pmove.velocity, planar, float)?;
    }
    if extra.contains(PlayerExtraBits::M_VELOCITY_Z) {
        read_coords(reader, &mut to.pmove.velocity, &Z, float)?;
    }
    if bits.contains(PlayerBits::M_TIME) {
        to.pmove.pm_time = read_pm_word(reader, caps)?;
    }
    if bits.contains(PlayerBits::M_FLAGS) {
        to.pmove.pm_flags = read_pm_word(reader, caps)?;
    }
    if bits.contains(PlayerBits::M_GRAVITY) {
        to.pmove.gravity = reader.read_i16()?;
    }
    if bits.contains(PlayerBits::M_DELTA_ANGLES) {
        read_angles(reader, &mut to.pmove.delta_angles, &XYZ, float)?;
    }
    if bits.contains(PlayerBits::VIEWOFFSET) {
        read_offsets(reader, &mut to.view_offset)?;
    }
    if bits.contains(PlayerBits::VIEWANGLES) {
        read_angles(reader, &mut to.view_angles, planar, float)?;
    }
    if extra.contains(PlayerExtraBits::VIEW_ROLL) {
        read_angles(reader, &mut to.view_angles, &Z, float)?;
    }
    if bits.contains(PlayerBits::KICKANGLES) {
        read_offsets(reader, &mut to.kick_angles)?;
    }
    if bits.contains(PlayerBits::WEAPONINDEX) {
        to.gun_index = read_gun_index(reader, caps)?;
    }
    if extra.contains(PlayerExtraBits::GUN_SKIN) {
        to.gun_skin = reader.read_u8()?;
    }
    if bits.contains(PlayerBits::WEAPONFRAME) {
        to.gun_frame = reader.read_u8()?;
        if !split {
            read_offsets(reader, &mut to.gun_offset)?;
            read_offsets(reader, &mut to.gun_angles)?;
        }
    }
    if extra.contains(PlayerExtraBits::GUN_OFFSET) {
        read_offsets(reader, &mut to.gun_offset)?;
    }
    if extra.contains(PlayerExtraBits::GUN_ANGLES) {
        read_offsets(reader, &mut to.gun_angles)?;
    }
    if extra.contains(PlayerExtraBits::GUN_RATE) {
        to.gun_rate = reader.read_u8()?;
    }
    if bits.contains(PlayerBits::BLEND) {
        to.blend = read_array4(reader)?;
    }
    if extra.contains(PlayerExtraBits::DAMAGE_BLEND) {
        to.damage_blend = read_array4(reader)?;
    }
    if bits.contains(PlayerBits::FOV) {
        to.fov = reader.read_u8()?;
    }
    if bits.contains(PlayerBits::RDFLAGS) {
        to.rdflags = reader.read_u8()?;
    }

    if !split || extra.contains(PlayerExtraBits::STATS) {
        read_stats(reader, &mut to.stats, caps.stats)?;
    }

    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::ProtocolVariant;

    fn roundtrip(
        from: Option<&PlayerState>,
        to: &PlayerState,
        variant: ProtocolVariant,
    ) -> (PlayerDelta, usize, PlayerState) {
        let caps = variant.capabilities();
        let mut target = to.clone();
        let mut writer = BitWriter::new(1024);
        let delta = write_delta_player(&mut writer, from, &mut target, caps, PlayerIgnore::NONE)
            .unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        let decoded = read_delta_player(&mut reader, from, delta.extra, caps).unwrap();
        assert!(reader.is_empty(), "trailing bytes after player state");
        (delta, bytes.len(), decoded)
    }

    #[test]
    fn fov_only_change_enhanced() {
        let from = PlayerState {
            fov: 90,
            ..PlayerState::default()
        };
        let to = PlayerState {
            fov: 110,
            ..from.clone()
        };
        let (delta, len, decoded) = roundtrip(Some(&from), &to, ProtocolVariant::EnhancedV2);
        assert_eq!(delta.bits.raw(), PlayerBits::FOV);
        assert!(delta.extra.is_empty());
        assert_eq!(len, 3);
        assert_eq!(decoded, to);
    }

    #[test]
    fn identical_states_set_no_flags() {
        let state = PlayerState {
            fov: 90,
            gun_index: 4,
            ..PlayerState::default()
        };
        for variant in ProtocolVariant::ALL {
            let delta = player_delta_bits(&state, &state, variant.capabilities());
            assert!(delta.bits.is_empty(), "{variant:?}");
            assert!(delta.extra.is_empty(), "{variant:?}");
        }
    }

    #[test]
    fn default_shape_always_carries_stats_mask() {
        let state = PlayerState::default();
        let (delta, len, _) = roundtrip(Some(&state), &state, ProtocolVariant::Legacy);
        assert!(delta.bits.is_empty());
        assert_eq!(len, 2 + 4);
    }

    #[test]
    fn enhanced_splits_z_axis() {
        let from = PlayerState::default();
        let mut to = from.clone();
        to.pmove.origin[2] = 24.0;
        to.view_angles[2] = 10.0;
        let (delta, _, decoded) = roundtrip(Some(&from), &to, ProtocolVariant::EnhancedV1);
        assert!(delta.bits.is_empty());
        assert!(delta.extra.contains(PlayerExtraBits::M_ORIGIN_Z));
        assert!(delta.extra.contains(PlayerExtraBits::VIEW_ROLL));
        assert_eq!(decoded.pmove.origin, to.pmove.origin);
    }

    #[test]
    fn stats_travel_in_enhanced_secondary_mask() {
        let from = PlayerState::default();
        let mut to = from.clone();
        to.stats[3] = 42;
        let (delta, _, decoded) = roundtrip(Some(&from), &to, ProtocolVariant::EnhancedV3);
        assert!(delta.extra.contains(PlayerExtraBits::STATS));
        assert_eq!(decoded.stats[3], 42);
    }

    #[test]
    fn full_state_roundtrip_legacy() {
        let mut to = PlayerState::default();
        to.pmove.pm_type = 2;
        to.pmove.origin = [128.0, -64.5, 24.125];
        to.pmove.velocity = [300.0, 0.0, -10.0];
        to.pmove.pm_time = 200;
        to.pmove.pm_flags = 0x21;
        to.pmove.gravity = 800;
        to.pmove.delta_angles = [0.0, 90.0, 0.0];
        to.view_angles = [-45.0, 180.0 - 45.0 / 8192.0, 0.0];
        to.view_offset = [0.0, 0.0, 22.0];
        to.kick_angles = [1.5, -0.25, 0.0];
        to.gun_index = 7;
        to.gun_frame = 12;
        to.gun_offset = [0.25, 0.5, -1.0];
        to.gun_angles = [2.0, 0.0, 0.0];
        to.blend = [255, 0, 0, 64];
        to.fov = 90;
        to.rdflags = 1;
        to.stats[0] = 100;
        to.stats[31] = -1;
        let (_, _, decoded) = roundtrip(None, &to, ProtocolVariant::Legacy);
        assert_eq!(decoded, to);
    }

    #[test]
    fn modern_player_extensions_roundtrip() {
        let mut to = PlayerState::default();
        to.pmove.pm_time = 1000;
        to.pmove.pm_flags = 0x1234;
        to.pmove.origin = [0.3, 1.0e5, -7.7];
        to.damage_blend = [1, 2, 3, 4];
        to.gun_skin = 5;
        to.gun_rate = 20;
        to.gun_index = 600;
        to.stats[63] = 9;
        let (delta, _, decoded) = roundtrip(None, &to, ProtocolVariant::Modern);
        assert!(delta.extra.contains(PlayerExtraBits::DAMAGE_BLEND));
        assert!(delta.extra.contains(PlayerExtraBits::GUN_SKIN));
        assert!(delta.extra.contains(PlayerExtraBits::GUN_RATE));
        assert_eq!(decoded, to);
    }

    #[test]
    fn pm_time_out_of_range_without_extensions() {
        let mut to = PlayerState::default();
        to.pmove.pm_time = 300;
        let mut writer = BitWriter::new(64);
        let err = write_delta_player(
            &mut writer,
            None,
            &mut to,
            ProtocolVariant::Legacy.capabilities(),
            PlayerIgnore::NONE,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedField {
                field: FieldKind::PmTime,
                ..
            }
        ));
    }

    #[test]
    fn ignore_copies_reference_forward() {
        let from = PlayerState {
            blend: [1, 1, 1, 1],
            ..PlayerState::default()
        };
        let mut to = PlayerState {
            blend: [9, 9, 9, 9],
            fov: 100,
            ..PlayerState::default()
        };
        to.pmove.velocity = [50.0, 0.0, 0.0];
        let ignore = PlayerIgnore {
            prediction: true,
            blend: true,
            ..PlayerIgnore::NONE
        };
        let mut writer = BitWriter::new(64);
        let delta = write_delta_player(
            &mut writer,
            Some(&from),
            &mut to,
            ProtocolVariant::Legacy.capabilities(),
            ignore,
        )
        .unwrap();
        assert_eq!(delta.bits.raw(), PlayerBits::FOV);
        assert_eq!(to.blend, from.blend);
        assert_eq!(to.pmove.velocity, from.pmove.velocity);
    }

    #[test]
    fn secondary_bits_rejected_in_default_shape() {
        let mut reader = BitReader::new(&[0, 0, 0, 0, 0, 0]);
        let err = read_delta_player(
            &mut reader,
            None,
            PlayerExtraBits::from_raw(PlayerExtraBits::STATS),
            ProtocolVariant::Legacy.capabilities(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedField {
                field: FieldKind::PlayerFlags,
                ..
            }
        ));
    }

    #[test]
    fn narrower_variant_clears_extended_fields() {
        let base = PlayerState {
            gun_rate: 10,
            damage_blend: [5; 4],
            ..PlayerState::default()
        };
        let mut reader = BitReader::new(&[0, 0]);
        let decoded = read_delta_player(
            &mut reader,
            Some(&base),
            PlayerExtraBits::default(),
            ProtocolVariant::EnhancedV1.capabilities(),
        )
        .unwrap();
        assert_eq!(decoded.gun_rate, 0);
        assert_eq!(decoded.damage_blend, [0; 4]);
    }
}
