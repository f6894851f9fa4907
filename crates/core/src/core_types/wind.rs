//! Wind as reported by the host weather system.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Wind sample taken from the environment at diffusion time.
///
/// Both fields use the host's byte encoding: `speed` in `0..=255` and
/// `direction` as a fraction of a full turn (`256` steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindSample {
    pub speed: u8,
    pub direction: u8,
}

impl WindSample {
    /// Calm air.
    pub const CALM: Self = Self { speed: 0, direction: 0 };

    #[must_use]
    pub const fn new(speed: u8, direction: u8) -> Self {
        Self { speed, direction }
    }

    /// Direction in radians (`direction / 256 * 2π`).
    #[inline]
    pub fn angle(&self) -> f32 {
        f32::from(self.direction) / 256.0 * TAU
    }

    /// Unit vector the wind blows towards, in grid axes.
    #[inline]
    pub fn unit_vector(&self) -> (f32, f32) {
        let angle = self.angle();
        (angle.cos(), angle.sin())
    }

    /// Speed normalized to `[0, 1]`.
    #[inline]
    pub fn speed_normalized(&self) -> f32 {
        f32::from(self.speed) / 255.0
    }
}
