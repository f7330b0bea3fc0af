//! Entity delta encoding.
//!
//! An entity update is a flag mask split into up to five bytes, each
//! announcing the next through its top bit, followed by the entity number
//! and the flagged fields in a fixed order:
//!
//! ```text
//! flags        1..5 bytes (MOREBITS1..4 chain)
//! number       u8, or u16 with NUMBER16
//! models       MODEL..MODEL4, u8 or u16 with MODEL16
//! frame        u8 / u16
//! skin         u8 / u16 / u32
//! effects      u8 / u16 / u32
//! renderfx     u8 / u16 / u32
//! origin       per axis
//! angles       per axis, 8-bit / 16-bit / float
//! old_origin   three coordinates
//! sound        u8, or u16 word plus loop volume/attenuation bytes
//! event        u8
//! solid        u16 / u32 packed
//! morefx       u8 / u16 / u32     (extensions)
//! alpha        u8                 (extensions)
//! scale        u8                 (extensions)
//! ```

use bitstream::{BitReader, BitWriter};

use crate::error::{CodecError, CodecResult, FieldKind, FieldReason};
use crate::quant::{
    alpha_to_byte, angle16_key, angle8_key, byte_to_alpha, byte_to_scale, coord_key, read_angle16,
    read_angle8, read_coord, scale_to_byte, write_angle16, write_angle8, write_coord,
};
use crate::types::{EntityState, Solid, Vec3, RF_BEAM, RF_FRAMELERP};
use crate::variant::Capabilities;

/// Flag mask of one entity update.
///
/// A 32-bit width is written as both the 8-bit and the 16-bit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityBits(u64);

impl EntityBits {
    pub const ORIGIN1: u64 = 1 << 0;
    pub const ORIGIN2: u64 = 1 << 1;
    pub const ANGLE2: u64 = 1 << 2;
    pub const ANGLE3: u64 = 1 << 3;
    pub const FRAME8: u64 = 1 << 4;
    pub const EVENT: u64 = 1 << 5;
    pub const REMOVE: u64 = 1 << 6;
    pub const MOREBITS1: u64 = 1 << 7;

    pub const NUMBER16: u64 = 1 << 8;
    pub const ORIGIN3: u64 = 1 << 9;
    pub const ANGLE1: u64 = 1 << 10;
    pub const MODEL: u64 = 1 << 11;
    pub const RENDERFX8: u64 = 1 << 12;
    pub const ANGLE16: u64 = 1 << 13;
    pub const EFFECTS8: u64 = 1 << 14;
    pub const MOREBITS2: u64 = 1 << 15;

    pub const SKIN8: u64 = 1 << 16;
    pub const FRAME16: u64 = 1 << 17;
    pub const RENDERFX16: u64 = 1 << 18;
    pub const EFFECTS16: u64 = 1 << 19;
    pub const MODEL2: u64 = 1 << 20;
    pub const MODEL3: u64 = 1 << 21;
    pub const MODEL4: u64 = 1 << 22;
    pub const MOREBITS3: u64 = 1 << 23;

    pub const OLDORIGIN: u64 = 1 << 24;
    pub const SKIN16: u64 = 1 << 25;
    pub const SOUND: u64 = 1 << 26;
    pub const SOLID: u64 = 1 << 27;
    pub const MODEL16: u64 = 1 << 28;
    pub const MOREFX8: u64 = 1 << 29;
    pub const ALPHA: u64 = 1 << 30;
    pub const MOREBITS4: u64 = 1 << 31;

    pub const SCALE: u64 = 1 << 32;
    pub const MOREFX16: u64 = 1 << 33;

    pub const SKIN32: u64 = Self::SKIN8 | Self::SKIN16;
    pub const EFFECTS32: u64 = Self::EFFECTS8 | Self::EFFECTS16;
    pub const RENDERFX32: u64 = Self::RENDERFX8 | Self::RENDERFX16;
    pub const MOREFX32: u64 = Self::MOREFX8 | Self::MOREFX16;

    const MODELS: u64 = Self::MODEL | Self::MODEL2 | Self::MODEL3 | Self::MODEL4;
    const MOREBITS: u64 = Self::MOREBITS1 | Self::MOREBITS2 | Self::MOREBITS3 | Self::MOREBITS4;
    const EXTENSION: u64 = Self::MODEL16 | Self::MOREFX32 | Self::ALPHA | Self::SCALE;
    const DEFINED: u64 = (1 << 34) - 1;

    /// Creates flags from a raw mask.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw mask.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns `true` if any bit of `mask` is set.
    #[must_use]
    pub const fn contains(self, mask: u64) -> bool {
        self.0 & mask != 0
    }

    /// Returns `true` if every bit of `mask` is set.
    #[must_use]
    pub const fn contains_all(self, mask: u64) -> bool {
        self.0 & mask == mask
    }

    /// Returns `true` if no field is flagged.
    ///
    /// Continuation bits and the number width describe the header, not a
    /// field, and are ignored.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & !(Self::MOREBITS | Self::NUMBER16) == 0
    }

    /// Number of flag bytes this mask occupies on the wire.
    #[must_use]
    pub const fn flag_bytes(self) -> usize {
        let payload = self.0 & !Self::MOREBITS;
        if payload >> 32 != 0 {
            5
        } else if payload >> 24 != 0 {
            4
        } else if payload >> 16 != 0 {
            3
        } else if payload >> 8 != 0 {
            2
        } else {
            1
        }
    }

    /// Returns the mask with exactly the continuation bits it needs.
    #[must_use]
    const fn with_continuations(self) -> Self {
        let payload = self.0 & !Self::MOREBITS;
        let mut raw = payload;
        let bytes = Self(payload).flag_bytes();
        if bytes > 4 {
            raw |= Self::MOREBITS4;
        }
        if bytes > 3 {
            raw |= Self::MOREBITS3;
        }
        if bytes > 2 {
            raw |= Self::MOREBITS2;
        }
        if bytes > 1 {
            raw |= Self::MOREBITS1;
        }
        Self(raw)
    }

    fn set(&mut self, mask: u64) {
        self.0 |= mask;
    }
}

/// Options for one entity delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityDeltaFlags {
    /// Emit the entity even when nothing changed.
    pub force: bool,
    /// The entity is entering the client's view this frame.
    pub new_entity: bool,
    /// The entity is the viewer; origin and angles come from player state.
    pub first_person: bool,
}

impl EntityDeltaFlags {
    /// Flags for an entity entering view.
    #[must_use]
    pub const fn entering() -> Self {
        Self {
            force: true,
            new_entity: true,
            first_person: false,
        }
    }

    /// Flags for a spawn baseline.
    #[must_use]
    pub const fn baseline() -> Self {
        Self {
            force: true,
            new_entity: false,
            first_person: false,
        }
    }
}

/// Flag mask and number leading an entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHeader {
    pub number: u16,
    pub bits: EntityBits,
}

impl EntityHeader {
    /// Returns `true` for the end-of-list marker.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.number == 0 && self.bits.raw() == 0
    }

    /// Returns `true` for a removal record.
    #[must_use]
    pub const fn is_remove(&self) -> bool {
        self.bits.contains(EntityBits::REMOVE)
    }
}

fn value_width(value: u32, width_mask: u32, narrow: u64, medium: u64) -> u64 {
    if value & width_mask != 0 {
        narrow | medium
    } else if value & 0xFF00 != 0 {
        medium
    } else {
        narrow
    }
}

fn vec_changed(a: &Vec3, b: &Vec3, float: bool) -> bool {
    a.iter()
        .zip(b.iter())
        .any(|(x, y)| coord_key(*x, float) != coord_key(*y, float))
}

#[allow(clippy::cast_possible_truncation)]
const fn low_effects(effects: u64) -> u32 {
    effects as u32
}

const fn high_effects(effects: u64) -> u32 {
    (effects >> 32) as u32
}

fn check_number(number: u16, caps: &Capabilities) -> CodecResult<()> {
    if number == 0 {
        return Err(CodecError::MalformedField {
            field: FieldKind::EntityNumber,
            reason: FieldReason::Zero,
        });
    }
    if number >= caps.limits.max_entities {
        return Err(CodecError::out_of_range(
            FieldKind::EntityNumber,
            i64::from(number),
            1,
            i64::from(caps.limits.max_entities) - 1,
        ));
    }
    Ok(())
}

fn check_index(field: FieldKind, value: u16, limit: u16) -> CodecResult<()> {
    if value >= limit {
        return Err(CodecError::out_of_range(
            field,
            i64::from(value),
            0,
            i64::from(limit) - 1,
        ));
    }
    Ok(())
}

/// Computes the flag mask for `from -> to` without writing anything.
///
/// Validates that every flagged field is representable under `caps`.
pub fn entity_delta_bits(
    from: &EntityState,
    to: &EntityState,
    caps: &Capabilities,
    flags: EntityDeltaFlags,
) -> CodecResult<EntityBits> {
    check_number(to.number, caps)?;
    let float = caps.float_coords;
    let width_mask = caps.width_mask();
    let mut bits = EntityBits::default();

    if !flags.first_person {
        for (axis, mask) in [EntityBits::ORIGIN1, EntityBits::ORIGIN2, EntityBits::ORIGIN3]
            .into_iter()
            .enumerate()
        {
            if coord_key(to.origin[axis], float) != coord_key(from.origin[axis], float) {
                bits.set(mask);
            }
        }

        let short = !float && caps.short_angles && to.solid.uses_model_geometry();
        for (axis, mask) in [EntityBits::ANGLE1, EntityBits::ANGLE2, EntityBits::ANGLE3]
            .into_iter()
            .enumerate()
        {
            let changed = if short {
                angle16_key(to.angles[axis], false) != angle16_key(from.angles[axis], false)
            } else {
                angle8_key(to.angles[axis], float) != angle8_key(from.angles[axis], float)
            };
            if changed {
                bits.set(mask);
                if short {
                    bits.set(EntityBits::ANGLE16);
                }
            }
        }

        if flags.new_entity && vec_changed(&to.old_origin, &from.origin, float) {
            bits.set(EntityBits::OLDORIGIN);
        }
    }

    if to.render_fx & RF_FRAMELERP != 0 {
        if vec_changed(&to.old_origin, &from.origin, float) {
            bits.set(EntityBits::OLDORIGIN);
        }
    } else if to.render_fx & RF_BEAM != 0
        && (!caps.beam_origin || vec_changed(&to.old_origin, &from.old_origin, float))
    {
        bits.set(EntityBits::OLDORIGIN);
    }

    if to.skin != from.skin {
        bits.set(value_width(to.skin, width_mask, EntityBits::SKIN8, EntityBits::SKIN16));
    }

    if to.frame != from.frame {
        bits.set(if to.frame & 0xFF00 != 0 {
            EntityBits::FRAME16
        } else {
            EntityBits::FRAME8
        });
    }

    if low_effects(to.effects) != low_effects(from.effects) {
        bits.set(value_width(
            low_effects(to.effects),
            width_mask,
            EntityBits::EFFECTS8,
            EntityBits::EFFECTS16,
        ));
    }

    if to.render_fx != from.render_fx {
        bits.set(value_width(
            to.render_fx,
            width_mask,
            EntityBits::RENDERFX8,
            EntityBits::RENDERFX16,
        ));
    }

    if to.solid.pack(caps.long_solid) != from.solid.pack(caps.long_solid) {
        bits.set(EntityBits::SOLID);
    }

    // Events are one-shot and never compared against the reference.
    if to.event != 0 {
        bits.set(EntityBits::EVENT);
    }

    let masks = [
        EntityBits::MODEL,
        EntityBits::MODEL2,
        EntityBits::MODEL3,
        EntityBits::MODEL4,
    ];
    for ((mask, new), old) in masks.into_iter().zip(to.model_index).zip(from.model_index) {
        if new != old {
            check_index(FieldKind::ModelIndex, new, caps.limits.max_models)?;
            bits.set(mask);
        }
    }
    if caps.extensions
        && bits.contains(EntityBits::MODELS)
        && to.model_index.iter().any(|m| m & 0xFF00 != 0)
    {
        bits.set(EntityBits::MODEL16);
    }

    let sound_changed = to.sound != from.sound
        || (caps.extensions
            && (to.loop_volume != from.loop_volume
                || to.loop_attenuation != from.loop_attenuation));
    if sound_changed {
        check_index(FieldKind::Sound, to.sound, caps.limits.max_sounds)?;
        bits.set(EntityBits::SOUND);
    }

    if caps.extensions {
        if high_effects(to.effects) != high_effects(from.effects) {
            bits.set(value_width(
                high_effects(to.effects),
                width_mask,
                EntityBits::MOREFX8,
                EntityBits::MOREFX16,
            ));
        }
        if alpha_to_byte(to.alpha) != alpha_to_byte(from.alpha) {
            bits.set(EntityBits::ALPHA);
        }
        if scale_to_byte(to.scale) != scale_to_byte(from.scale) {
            bits.set(EntityBits::SCALE);
        }
    }

    if to.number & 0xFF00 != 0 {
        bits.set(EntityBits::NUMBER16);
    }

    Ok(bits.with_continuations())
}

fn write_header(writer: &mut BitWriter, bits: EntityBits, number: u16) -> CodecResult<()> {
    let raw = bits.raw();
    for byte in 0..bits.flag_bytes() {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u8((raw >> (byte * 8)) as u8)?;
    }
    if bits.contains(EntityBits::NUMBER16) {
        writer.write_u16(number)?;
    } else {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u8(number as u8)?;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn write_sized(
    writer: &mut BitWriter,
    value: u32,
    bits: EntityBits,
    narrow: u64,
    medium: u64,
) -> CodecResult<()> {
    if bits.contains_all(narrow | medium) {
        writer.write_u32(value)?;
    } else if bits.contains(narrow) {
        writer.write_u8(value as u8)?;
    } else if bits.contains(medium) {
        writer.write_u16(value as u16)?;
    }
    Ok(())
}

fn read_sized(
    reader: &mut BitReader<'_>,
    current: u32,
    bits: EntityBits,
    narrow: u64,
    medium: u64,
) -> CodecResult<u32> {
    Ok(if bits.contains_all(narrow | medium) {
        reader.read_u32()?
    } else if bits.contains(narrow) {
        u32::from(reader.read_u8()?)
    } else if bits.contains(medium) {
        u32::from(reader.read_u16()?)
    } else {
        current
    })
}

/// Writes the delta `from -> to`, or nothing when it is empty and not forced.
///
/// `from = None` encodes against the all-default state. Returns the flag
/// mask that was written; an empty mask means nothing was emitted.
///
/// On error the writer may hold a partial record; the caller discards the
/// whole message.
pub fn write_delta_entity(
    writer: &mut BitWriter,
    from: Option<&EntityState>,
    to: &EntityState,
    caps: &Capabilities,
    flags: EntityDeltaFlags,
) -> CodecResult<EntityBits> {
    let null = EntityState::default();
    let from = from.unwrap_or(&null);
    let bits = entity_delta_bits(from, to, caps, flags)?;
    if bits.is_empty() && !flags.force {
        return Ok(bits);
    }
    let float = caps.float_coords;

    write_header(writer, bits, to.number)?;

    let masks = [
        EntityBits::MODEL,
        EntityBits::MODEL2,
        EntityBits::MODEL3,
        EntityBits::MODEL4,
    ];
    for (mask, model) in masks.into_iter().zip(to.model_index) {
        if !bits.contains(mask) {
            continue;
        }
        if bits.contains(EntityBits::MODEL16) {
            writer.write_u16(model)?;
        } else {
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u8(model as u8)?;
        }
    }

    if bits.contains(EntityBits::FRAME8) {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u8(to.frame as u8)?;
    } else if bits.contains(EntityBits::FRAME16) {
        writer.write_u16(to.frame)?;
    }

    write_sized(writer, to.skin, bits, EntityBits::SKIN8, EntityBits::SKIN16)?;
    write_sized(
        writer,
        low_effects(to.effects),
        bits,
        EntityBits::EFFECTS8,
        EntityBits::EFFECTS16,
    )?;
    write_sized(
        writer,
        to.render_fx,
        bits,
        EntityBits::RENDERFX8,
        EntityBits::RENDERFX16,
    )?;

    for (axis, mask) in [EntityBits::ORIGIN1, EntityBits::ORIGIN2, EntityBits::ORIGIN3]
        .into_iter()
        .enumerate()
    {
        if bits.contains(mask) {
            write_coord(writer, to.origin[axis], float)?;
        }
    }

    for (axis, mask) in [EntityBits::ANGLE1, EntityBits::ANGLE2, EntityBits::ANGLE3]
        .into_iter()
        .enumerate()
    {
        if !bits.contains(mask) {
            continue;
        }
        if bits.contains(EntityBits::ANGLE16) {
            write_angle16(writer, to.angles[axis], float)?;
        } else {
            write_angle8(writer, to.angles[axis], float)?;
        }
    }

    if bits.contains(EntityBits::OLDORIGIN) {
        for value in to.old_origin {
            write_coord(writer, value, float)?;
        }
    }

    if bits.contains(EntityBits::SOUND) {
        if caps.extensions {
            let mut word = to.sound & 0x3FFF;
            let volume = to.loop_volume != from.loop_volume;
            let attenuation = to.loop_attenuation != from.loop_attenuation;
            if volume {
                word |= 0x4000;
            }
            if attenuation {
                word |= 0x8000;
            }
            writer.write_u16(word)?;
            if volume {
                writer.write_u8(to.loop_volume)?;
            }
            if attenuation {
                writer.write_u8(to.loop_attenuation)?;
            }
        } else {
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u8(to.sound as u8)?;
        }
    }

    if bits.contains(EntityBits::EVENT) {
        writer.write_u8(to.event)?;
    }

    if bits.contains(EntityBits::SOLID) {
        let packed = to.solid.pack(caps.long_solid);
        if caps.long_solid {
            writer.write_u32(packed)?;
        } else {
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u16(packed as u16)?;
        }
    }

    if caps.extensions {
        write_sized(
            writer,
            high_effects(to.effects),
            bits,
            EntityBits::MOREFX8,
            EntityBits::MOREFX16,
        )?;
        if bits.contains(EntityBits::ALPHA) {
            writer.write_u8(alpha_to_byte(to.alpha))?;
        }
        if bits.contains(EntityBits::SCALE) {
            writer.write_u8(scale_to_byte(to.scale))?;
        }
    }

    Ok(bits)
}

/// Writes a removal record for entity `number`.
pub fn write_entity_removal(
    writer: &mut BitWriter,
    number: u16,
    caps: &Capabilities,
) -> CodecResult<()> {
    check_number(number, caps)?;
    let mut bits = EntityBits::from_raw(EntityBits::REMOVE);
    if number & 0xFF00 != 0 {
        bits.set(EntityBits::NUMBER16);
    }
    write_header(writer, bits.with_continuations(), number)
}

/// Writes the two-byte end-of-list marker.
pub fn write_entity_terminator(writer: &mut BitWriter) -> CodecResult<()> {
    writer.write_u8(0)?;
    writer.write_u8(0)?;
    Ok(())
}

/// Reads an entity record's flag mask and number.
///
/// The end-of-list marker decodes as number 0 with no flags; see
/// [`EntityHeader::is_end`].
pub fn read_entity_header(reader: &mut BitReader<'_>) -> CodecResult<EntityHeader> {
    let mut raw = u64::from(reader.read_u8()?);
    for (continuation, shift) in [
        (EntityBits::MOREBITS1, 8),
        (EntityBits::MOREBITS2, 16),
        (EntityBits::MOREBITS3, 24),
        (EntityBits::MOREBITS4, 32),
    ] {
        if raw & continuation == 0 {
            break;
        }
        raw |= u64::from(reader.read_u8()?) << shift;
    }
    let bits = EntityBits::from_raw(raw);
    let number = if bits.contains(EntityBits::NUMBER16) {
        reader.read_u16()?
    } else {
        u16::from(reader.read_u8()?)
    };
    Ok(EntityHeader { number, bits })
}

/// Decodes the fields announced by `header` on top of `base`.
///
/// `base = None` decodes against the all-default state. Unflagged fields
/// keep their `base` value, except `event` which is always cleared and the
/// extension fields, which reset to defaults when `caps` lacks them.
pub fn read_delta_entity(
    reader: &mut BitReader<'_>,
    header: EntityHeader,
    base: Option<&EntityState>,
    caps: &Capabilities,
) -> CodecResult<EntityState> {
    check_number(header.number, caps)?;
    let bits = header.bits;
    let mut unexpected = bits.raw() & !EntityBits::DEFINED;
    if bits.contains(EntityBits::REMOVE) {
        unexpected |= EntityBits::REMOVE;
    }
    if !caps.extensions {
        unexpected |= bits.raw() & EntityBits::EXTENSION;
    }
    if unexpected != 0 {
        return Err(CodecError::unexpected_bits(FieldKind::EntityFlags, unexpected));
    }

    let float = caps.float_coords;
    let mut to = base.cloned().unwrap_or_default();
    to.number = header.number;
    to.event = 0;
    if !caps.extensions {
        to.effects &= 0xFFFF_FFFF;
        to.alpha = 0.0;
        to.scale = 0.0;
        to.loop_volume = 0;
        to.loop_attenuation = 0;
    }

    let masks = [
        EntityBits::MODEL,
        EntityBits::MODEL2,
        EntityBits::MODEL3,
        EntityBits::MODEL4,
    ];
    for (mask, model) in masks.into_iter().zip(to.model_index.iter_mut()) {
        if !bits.contains(mask) {
            continue;
        }
        *model = if bits.contains(EntityBits::MODEL16) {
            reader.read_u16()?
        } else {
            u16::from(reader.read_u8()?)
        };
    }

    if bits.contains(EntityBits::FRAME8) {
        to.frame = u16::from(reader.read_u8()?);
    }
    if bits.contains(EntityBits::FRAME16) {
        to.frame = reader.read_u16()?;
    }

    to.skin = read_sized(reader, to.skin, bits, EntityBits::SKIN8, EntityBits::SKIN16)?;
    let low = read_sized(
        reader,
        low_effects(to.effects),
        bits,
        EntityBits::EFFECTS8,
        EntityBits::EFFECTS16,
    )?;
    to.effects = (to.effects & !0xFFFF_FFFF) | u64::from(low);
    to.render_fx = read_sized(
        reader,
        to.render_fx,
        bits,
        EntityBits::RENDERFX8,
        EntityBits::RENDERFX16,
    )?;

    for (axis, mask) in [EntityBits::ORIGIN1, EntityBits::ORIGIN2, EntityBits::ORIGIN3]
        .into_iter()
        .enumerate()
    {
        if bits.contains(mask) {
            to.origin[axis] = read_coord(reader, float)?;
        }
    }

    for (axis, mask) in [EntityBits::ANGLE1, EntityBits::ANGLE2, EntityBits::ANGLE3]
        .into_iter()
        .enumerate()
    {
        if !bits.contains(mask) {
            continue;
        }
        to.angles[axis] = if bits.contains(EntityBits::ANGLE16) {
            read_angle16(reader, float)?
        } else {
            read_angle8(reader, float)?
        };
    }

    if bits.contains(EntityBits::OLDORIGIN) {
        for value in &mut to.old_origin {
            *value = read_coord(reader, float)?;
        }
    }

    if bits.contains(EntityBits::SOUND) {
        if caps.extensions {
            let word = reader.read_u16()?;
            to.sound = word & 0x3FFF;
            if word & 0x4000 != 0 {
                to.loop_volume = reader.read_u8()?;
            }
            if word & 0x8000 != 0 {
                to.loop_attenuation = reader.read_u8()?;
            }
        } else {
            to.sound = u16::from(reader.read_u8()?);
        }
    }

    if bits.contains(EntityBits::EVENT) {
        to.event = reader.read_u8()?;
    }

    if bits.contains(EntityBits::SOLID) {
        let packed = if caps.long_solid {
            reader.read_u32()?
        } else {
            u32::from(reader.read_u16()?)
        };
        to.solid = Solid::unpack(packed, caps.long_solid);
    }

    if caps.extensions {
        let high = read_sized(
            reader,
            high_effects(to.effects),
            bits,
            EntityBits::MOREFX8,
            EntityBits::MOREFX16,
        )?;
        to.effects = (to.effects & 0xFFFF_FFFF) | (u64::from(high) << 32);
        if bits.contains(EntityBits::ALPHA) {
            to.alpha = byte_to_alpha(reader.read_u8()?);
        }
        if bits.contains(EntityBits::SCALE) {
            to.scale = byte_to_scale(reader.read_u8()?);
        }
    }

    Ok(to)
}
