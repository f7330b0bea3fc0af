//! Protocol variants and their capability table.
//!
//! Every behavioral difference between protocol generations is a field of
//! [`Capabilities`]. Encoders and decoders consult the table and never match
//! on the variant directly, so adding a generation means adding a row.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use netchan::{ChannelConfig, NetSource, QportMode, MAX_MSGLEN, MAX_PACKETLEN, MAX_PACKETLEN_LARGE};

/// Original protocol number.
pub const PROTOCOL_LEGACY: u16 = 34;
/// Protocol number of the enhanced generations.
pub const PROTOCOL_ENHANCED: u16 = 35;
/// Protocol number of the fragmenting, extensible generations.
pub const PROTOCOL_EXTENDED: u16 = 36;

/// First enhanced minor version with short angles and long solids.
pub const ENHANCED_MINOR_SHORT_ANGLES: u16 = 1904;
/// First extended minor version with raised limits and extension fields.
pub const EXTENDED_MINOR_LIMITS: u16 = 1024;
/// First extended minor version with float coordinates.
pub const EXTENDED_MINOR_MODERN: u16 = 1025;

/// A protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProtocolVariant {
    #[default]
    Legacy,
    EnhancedV1,
    EnhancedV2,
    EnhancedV3,
    Extended,
    Modern,
}

impl ProtocolVariant {
    /// Every variant, oldest first.
    pub const ALL: [Self; 6] = [
        Self::Legacy,
        Self::EnhancedV1,
        Self::EnhancedV2,
        Self::EnhancedV3,
        Self::Extended,
        Self::Modern,
    ];

    /// Picks the variant for a protocol and minor version pair.
    ///
    /// Returns `None` for unknown protocol numbers.
    #[must_use]
    pub const fn negotiate(protocol: u16, minor: u16) -> Option<Self> {
        match protocol {
            PROTOCOL_LEGACY => Some(Self::Legacy),
            PROTOCOL_ENHANCED if minor < ENHANCED_MINOR_SHORT_ANGLES => Some(Self::EnhancedV1),
            PROTOCOL_ENHANCED => Some(Self::EnhancedV2),
            PROTOCOL_EXTENDED if minor < EXTENDED_MINOR_LIMITS => Some(Self::EnhancedV3),
            PROTOCOL_EXTENDED if minor < EXTENDED_MINOR_MODERN => Some(Self::Extended),
            PROTOCOL_EXTENDED => Some(Self::Modern),
            _ => None,
        }
    }

    /// Canonical protocol and minor version announcing this variant.
    #[must_use]
    pub const fn version(self) -> (u16, u16) {
        match self {
            Self::Legacy => (PROTOCOL_LEGACY, 0),
            Self::EnhancedV1 => (PROTOCOL_ENHANCED, 1903),
            Self::EnhancedV2 => (PROTOCOL_ENHANCED, ENHANCED_MINOR_SHORT_ANGLES),
            Self::EnhancedV3 => (PROTOCOL_EXTENDED, 1023),
            Self::Extended => (PROTOCOL_EXTENDED, EXTENDED_MINOR_LIMITS),
            Self::Modern => (PROTOCOL_EXTENDED, EXTENDED_MINOR_MODERN),
        }
    }

    /// Returns this variant's capability row.
    #[must_use]
    pub const fn capabilities(self) -> &'static Capabilities {
        match self {
            Self::Legacy => &LEGACY,
            Self::EnhancedV1 => &ENHANCED_V1,
            Self::EnhancedV2 => &ENHANCED_V2,
            Self::EnhancedV3 => &ENHANCED_V3,
            Self::Extended => &EXTENDED,
            Self::Modern => &MODERN,
        }
    }
}

/// Wire form of the player stats mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsEncoding {
    /// 32-bit mask, 32 stats.
    Fixed32,
    /// 64-bit mask, 64 stats.
    Fixed64,
    /// Variable-length mask, 64 stats.
    Varint,
}

impl StatsEncoding {
    /// Number of stats this encoding can address.
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Fixed32 => 32,
            Self::Fixed64 | Self::Varint => 64,
        }
    }
}

/// Index limits of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantLimits {
    /// Entity numbers are `1..max_entities`.
    pub max_entities: u16,
    /// Model indices are `0..max_models`.
    pub max_models: u16,
    /// Sound indices are `0..max_sounds`.
    pub max_sounds: u16,
}

/// Channel settings implied by a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCaps {
    pub qport: QportMode,
    pub max_packet_len: usize,
    pub fragmentation: bool,
}

/// Everything the codec needs to know about a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub variant: ProtocolVariant,
    /// Value-width threshold mask `0xFFFF_0000` instead of `0xFFFF_8000`.
    pub wide_mask: bool,
    /// 16-bit angles for brush-model entities.
    pub short_angles: bool,
    /// 32-bit packed solids.
    pub long_solid: bool,
    /// Beams send `old_origin` only when it changed.
    pub beam_origin: bool,
    /// Split player flags with a caller-carried secondary mask.
    pub enhanced_player: bool,
    /// 16-bit models, high effect bits, alpha, scale and loop sound fields.
    pub extensions: bool,
    /// Raw 32-bit floats for coordinates and angles.
    pub float_coords: bool,
    /// Damage blend, gun skin, gun rate and 16-bit pmove time and flags.
    pub player_extensions: bool,
    pub stats: StatsEncoding,
    pub limits: VariantLimits,
    pub channel: ChannelCaps,
}

impl Capabilities {
    /// Builds the channel configuration this variant runs over.
    #[must_use]
    pub const fn channel_config(&self, role: NetSource) -> ChannelConfig {
        ChannelConfig {
            role,
            qport: self.channel.qport,
            max_packet_len: self.channel.max_packet_len,
            max_message_len: if self.channel.fragmentation {
                MAX_MSGLEN
            } else {
                self.channel.max_packet_len
            },
            fragmentation: self.channel.fragmentation,
        }
    }

    /// Threshold above which a skin, effect or render value needs 32 bits.
    #[must_use]
    pub const fn width_mask(&self) -> u32 {
        if self.wide_mask {
            0xFFFF_0000
        } else {
            0xFFFF_8000
        }
    }
}

const LEGACY_LIMITS: VariantLimits = VariantLimits {
    max_entities: 1024,
    max_models: 256,
    max_sounds: 256,
};

const EXTENDED_LIMITS: VariantLimits = VariantLimits {
    max_entities: 8192,
    max_models: 8192,
    max_sounds: 0x4000,
};

const LEGACY: Capabilities = Capabilities {
    variant: ProtocolVariant::Legacy,
    wide_mask: false,
    short_angles: false,
    long_solid: false,
    beam_origin: false,
    enhanced_player: false,
    extensions: false,
    float_coords: false,
    player_extensions: false,
    stats: StatsEncoding::Fixed32,
    limits: LEGACY_LIMITS,
    channel: ChannelCaps {
        qport: QportMode::Word,
        max_packet_len: MAX_PACKETLEN,
        fragmentation: false,
    },
};

const ENHANCED_V1: Capabilities = Capabilities {
    variant: ProtocolVariant::EnhancedV1,
    wide_mask: true,
    enhanced_player: true,
    channel: ChannelCaps {
        qport: QportMode::Byte,
        max_packet_len: MAX_PACKETLEN_LARGE,
        fragmentation: false,
    },
    ..LEGACY
};

const ENHANCED_V2: Capabilities = Capabilities {
    variant: ProtocolVariant::EnhancedV2,
    short_angles: true,
    long_solid: true,
    ..ENHANCED_V1
};

const ENHANCED_V3: Capabilities = Capabilities {
    variant: ProtocolVariant::EnhancedV3,
    beam_origin: true,
    channel: ChannelCaps {
        qport: QportMode::Byte,
        max_packet_len: MAX_PACKETLEN,
        fragmentation: true,
    },
    ..ENHANCED_V2
};

const EXTENDED: Capabilities = Capabilities {
    variant: ProtocolVariant::Extended,
    extensions: true,
    stats: StatsEncoding::Fixed64,
    limits: EXTENDED_LIMITS,
    ..ENHANCED_V3
};

const MODERN: Capabilities = Capabilities {
    variant: ProtocolVariant::Modern,
    float_coords: true,
    player_extensions: true,
    stats: StatsEncoding::Varint,
    ..EXTENDED
};
