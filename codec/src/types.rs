//! Core state types for the codec.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Three scalars: a position, velocity or set of Euler angles.
pub type Vec3 = [f32; 3];

/// Size of the player stats array.
pub const MAX_STATS: usize = 64;

/// Render flag: interpolate between `old_origin` and `origin`.
pub const RF_FRAMELERP: u32 = 1 << 6;

/// Render flag: draw a beam from `origin` to `old_origin`.
pub const RF_BEAM: u32 = 1 << 7;

/// A server frame number.
///
/// Frame numbers are monotonically increasing identifiers for simulation
/// states sent to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameNumber(u32);

impl FrameNumber {
    /// Creates a new frame number.
    #[must_use]
    pub const fn new(frame: u32) -> Self {
        Self(frame)
    }

    /// Returns the raw frame number.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` for frame zero, used as "no reference frame".
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for FrameNumber {
    fn from(frame: u32) -> Self {
        Self(frame)
    }
}

impl From<FrameNumber> for u32 {
    fn from(frame: FrameNumber) -> Self {
        frame.0
    }
}

/// Coarse bounding box of a solid entity, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoxExtents {
    /// Half the width along x and y.
    pub half_width: i32,
    /// Distance from origin to the bottom.
    pub down: i32,
    /// Distance from origin to the top.
    pub up: i32,
}

/// Collision shape of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Solid {
    /// Not solid.
    #[default]
    NotSolid,
    /// An axis-aligned box, transmitted in packed form.
    Box(BoxExtents),
    /// Collides against its brush model's own geometry.
    UsesModelGeometry,
}

const PACKED_MODEL_16: u32 = 31;
const PACKED_MODEL_32: u32 = 255;

impl Solid {
    /// Packs the solid into its 16-bit or 32-bit wire form.
    ///
    /// Box extents are clamped into the packable range and rounded down to
    /// the packing granularity, so every box packs to a value distinct from
    /// both zero and the model-geometry sentinel.
    #[must_use]
    pub fn pack(self, long: bool) -> u32 {
        match self {
            Self::NotSolid => 0,
            Self::UsesModelGeometry if long => PACKED_MODEL_32,
            Self::UsesModelGeometry => PACKED_MODEL_16,
            Self::Box(extents) if long => {
                let x = clamp_unsigned(extents.half_width, 255);
                let zd = clamp_unsigned(extents.down, 255);
                let zu = clamp_unsigned(extents.up.saturating_add(32_768), 65_535);
                (zu << 16) | (zd << 8) | x
            }
            Self::Box(extents) => {
                let x = clamp_unsigned(extents.half_width / 8, 31);
                let zd = clamp_unsigned(extents.down / 8, 31);
                let zu = clamp_unsigned(extents.up.saturating_add(32) / 8, 63);
                (zu << 10) | (zd << 5) | x
            }
        }
    }

    /// Unpacks a wire value produced by [`pack`](Self::pack).
    #[must_use]
    pub fn unpack(raw: u32, long: bool) -> Self {
        match (raw, long) {
            (0, _) => Self::NotSolid,
            (PACKED_MODEL_32, true) | (PACKED_MODEL_16, false) => Self::UsesModelGeometry,
            #[allow(clippy::cast_possible_wrap)]
            (_, true) => Self::Box(BoxExtents {
                half_width: (raw & 0xFF) as i32,
                down: ((raw >> 8) & 0xFF) as i32,
                up: ((raw >> 16) & 0xFFFF) as i32 - 32_768,
            }),
            #[allow(clippy::cast_possible_wrap)]
            (_, false) => Self::Box(BoxExtents {
                half_width: 8 * (raw & 31) as i32,
                down: 8 * ((raw >> 5) & 31) as i32,
                up: 8 * ((raw >> 10) & 63) as i32 - 32,
            }),
        }
    }

    /// Returns `true` for brush-model entities.
    #[must_use]
    pub const fn uses_model_geometry(self) -> bool {
        matches!(self, Self::UsesModelGeometry)
    }
}

#[allow(clippy::cast_sign_loss)]
fn clamp_unsigned(value: i32, max: i32) -> u32 {
    value.clamp(1, max) as u32
}

/// Replicated state of one entity slot.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityState {
    /// Slot number, `1..max_entities`. Zero is never a valid entity.
    pub number: u16,
    pub origin: Vec3,
    pub angles: Vec3,
    /// Previous origin, used for interpolation and as a beam's far end.
    pub old_origin: Vec3,
    /// Primary model and three attachment models.
    pub model_index: [u16; 4],
    /// Skin number, also used as a palette selector.
    pub skin: u32,
    /// Effect flags; the upper 32 bits need protocol extensions.
    pub effects: u64,
    pub render_fx: u32,
    pub frame: u16,
    pub sound: u16,
    /// Looping sound volume; zero means the implicit default.
    pub loop_volume: u8,
    /// Looping sound attenuation; zero means the implicit default.
    pub loop_attenuation: u8,
    /// One-shot event, cleared on every decode unless sent this frame.
    pub event: u8,
    pub solid: Solid,
    /// Translucency in `0..=1`; zero means the implicit default.
    pub alpha: f32,
    /// Model scale; zero means the implicit default.
    pub scale: f32,
}

impl EntityState {
    /// Creates an otherwise default state for slot `number`.
    #[must_use]
    pub fn new(number: u16) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }
}

/// Player movement state shared with client-side prediction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PmoveState {
    pub pm_type: u8,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub pm_flags: u16,
    pub pm_time: u16,
    pub gravity: i16,
    /// Offset added to input angles to produce view angles.
    pub delta_angles: Vec3,
}

/// Replicated state of one player's view.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub pmove: PmoveState,
    pub view_angles: Vec3,
    pub view_offset: Vec3,
    /// Transient view shake.
    pub kick_angles: Vec3,
    pub gun_index: u16,
    pub gun_skin: u8,
    pub gun_frame: u8,
    pub gun_offset: Vec3,
    pub gun_angles: Vec3,
    pub gun_rate: u8,
    /// Full-screen tint, RGBA.
    pub blend: [u8; 4],
    /// Damage tint, RGBA.
    pub damage_blend: [u8; 4],
    pub fov: u8,
    pub rdflags: u8,
    pub stats: [i16; MAX_STATS],
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            pmove: PmoveState::default(),
            view_angles: [0.0; 3],
            view_offset: [0.0; 3],
            kick_angles: [0.0; 3],
            gun_index: 0,
            gun_skin: 0,
            gun_frame: 0,
            gun_offset: [0.0; 3],
            gun_angles: [0.0; 3],
            gun_rate: 0,
            blend: [0; 4],
            damage_blend: [0; 4],
            fov: 0,
            rdflags: 0,
            stats: [0; MAX_STATS],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_number_conversions() {
        let frame = FrameNumber::from(42);
        assert_eq!(frame.raw(), 42);
        assert_eq!(u32::from(frame), 42);
        assert!(!frame.is_zero());
        assert!(FrameNumber::default().is_zero());
        assert!(FrameNumber::new(1) < FrameNumber::new(2));
    }

    #[test]
    fn solid_sentinels() {
        assert_eq!(Solid::NotSolid.pack(false), 0);
        assert_eq!(Solid::UsesModelGeometry.pack(false), 31);
        assert_eq!(Solid::UsesModelGeometry.pack(true), 255);
        assert_eq!(Solid::unpack(31, false), Solid::UsesModelGeometry);
        assert_eq!(Solid::unpack(255, true), Solid::UsesModelGeometry);
        assert_eq!(Solid::unpack(0, true), Solid::NotSolid);
    }

    #[test]
    fn player_box_packs_16_bit() {
        let player = Solid::Box(BoxExtents {
            half_width: 16,
            down: 24,
            up: 32,
        });
        let packed = player.pack(false);
        assert_eq!(packed, (8 << 10) | (3 << 5) | 2);
        assert_eq!(Solid::unpack(packed, false), player);
    }

    #[test]
    fn box_packs_32_bit_exactly() {
        let solid = Solid::Box(BoxExtents {
            half_width: 17,
            down: 3,
            up: -5,
        });
        assert_eq!(Solid::unpack(solid.pack(true), true), solid);
    }

    #[test]
    fn degenerate_box_never_collides_with_sentinel() {
        let flat = Solid::Box(BoxExtents {
            half_width: 248,
            down: 0,
            up: -32,
        });
        assert_ne!(flat.pack(false), 31);
        assert_ne!(flat.pack(false), 0);
        let tiny = Solid::Box(BoxExtents {
            half_width: 255,
            down: 0,
            up: -32_768,
        });
        assert_ne!(tiny.pack(true), 255);
        assert!(matches!(Solid::unpack(flat.pack(false), false), Solid::Box(_)));
    }

    #[test]
    fn entity_state_new() {
        let state = EntityState::new(7);
        assert_eq!(state.number, 7);
        assert_eq!(state.solid, Solid::NotSolid);
        assert_eq!(state.event, 0);
    }

    #[test]
    fn player_state_default_is_zeroed() {
        let state = PlayerState::default();
        assert!(state.stats.iter().all(|&s| s == 0));
        assert_eq!(state.pmove, PmoveState::default());
    }
}
