//! Terrain vertex colors written back to the host world.

use serde::{Deserialize, Serialize};

/// Vertex tint of the terrain mesh, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VertexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl VertexColor {
    /// Fully burnt ground.
    pub const BLACK: Self = Self::grey(0);

    /// Untouched ground (no tint).
    pub const WHITE: Self = Self::grey(255);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// All channels set to `value`.
    #[must_use]
    pub const fn grey(value: u8) -> Self {
        Self::new(value, value, value)
    }

    /// True if any channel is brighter than `value`.
    ///
    /// Scorch colors are only ever written when this holds, so a vertex never
    /// gets lighter while it heats or burns.
    #[inline]
    pub fn any_channel_above(&self, value: u8) -> bool {
        self.r > value || self.g > value || self.b > value
    }

    #[inline]
    pub fn is_black(&self) -> bool {
        *self == Self::BLACK
    }

    /// Every channel reduced by `amount`, saturating at zero.
    #[must_use]
    pub fn darkened(&self, amount: u8) -> Self {
        Self::new(
            self.r.saturating_sub(amount),
            self.g.saturating_sub(amount),
            self.b.saturating_sub(amount),
        )
    }
}
