use geist_blocks::BlockDefinition;
use geist_world::Face;

pub const LIGHT_MIN: u8 = 0;
pub const LIGHT_MAX: u8 = 15;
/// Levels at or below the horizon count as darkness and never spread.
pub const LIGHT_HORIZON: u8 = 1;

const CHANNEL_BITS: usize = 4;
const CHANNEL_MASK: u16 = 0xF;

/// One independent light field. `Sun` is sky light; the rest are emitted by blocks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LightChannel {
    Sun = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
}

impl LightChannel {
    pub const COUNT: usize = 4;
    pub const ALL: [LightChannel; Self::COUNT] = [
        LightChannel::Sun,
        LightChannel::Red,
        LightChannel::Green,
        LightChannel::Blue,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            LightChannel::Sun => "sun",
            LightChannel::Red => "red",
            LightChannel::Green => "green",
            LightChannel::Blue => "blue",
        }
    }

    /// Level a block of this definition starts at on this channel when placed.
    #[inline]
    pub fn emission(self, def: &BlockDefinition) -> u8 {
        match self {
            LightChannel::Sun => 0,
            LightChannel::Red => def.emission[0],
            LightChannel::Green => def.emission[1],
            LightChannel::Blue => def.emission[2],
        }
    }

    /// Level light at `level` arrives with after stepping across `face` into a voxel
    /// with the given absorption.
    ///
    /// Every step costs one level plus the absorption of the voxel entered, except that
    /// full-strength sky light falling straight down pays only the absorption. That keeps an
    /// open sky column at 15 all the way down, so the incremental engine reproduces what the
    /// column sweep writes, and retraction can match a sky voxel against the one above it
    /// exactly.
    #[inline]
    pub fn attenuate(self, level: u8, face: Face, absorption: u8) -> u8 {
        let absorbed = level.saturating_sub(absorption);
        if self == LightChannel::Sun && level == LIGHT_MAX && face == Face::NegY {
            absorbed
        } else {
            absorbed.saturating_sub(1)
        }
    }
}

/// Four 4-bit light levels packed into a `u16`, one nibble per [`LightChannel`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LightVector(u16);

impl LightVector {
    pub const DARK: LightVector = LightVector(0);

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self, channel: LightChannel) -> u8 {
        ((self.0 >> (channel.index() * CHANNEL_BITS)) & CHANNEL_MASK) as u8
    }

    #[inline]
    pub fn set(&mut self, channel: LightChannel, level: u8) {
        debug_assert!(level <= LIGHT_MAX, "light level {level} out of range");
        let shift = channel.index() * CHANNEL_BITS;
        self.0 = (self.0 & !(CHANNEL_MASK << shift)) | ((u16::from(level) & CHANNEL_MASK) << shift);
    }

    #[inline]
    pub fn with(mut self, channel: LightChannel, level: u8) -> Self {
        self.set(channel, level);
        self
    }
}
