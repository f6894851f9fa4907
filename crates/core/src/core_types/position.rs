//! World-space position type and terrain grid dimensions.

use nalgebra::Vector3;

/// 3D vector type for world positions.
///
/// Alias for `nalgebra::Vector3<f32>`. `x`/`y` span the horizontal plane,
/// `z` is terrain height.
pub type Vec3 = Vector3<f32>;

/// Side length of one terrain cell in world units.
pub const CELL_SPAN: f32 = 4096.0;

/// Side length of one quadrant (half a cell) in world units.
pub const QUADRANT_SPAN: f32 = 2048.0;

/// Distance between two adjacent vertices of a quadrant grid.
pub const VERTEX_SPACING: f32 = 128.0;

/// Vertices along one side of a quadrant grid.
pub const VERTS_PER_SIDE: usize = 17;

/// Vertices per quadrant (17 x 17).
pub const VERTS_PER_QUADRANT: usize = VERTS_PER_SIDE * VERTS_PER_SIDE;

/// Quadrants along one side of a cell.
pub const QUADRANTS_PER_SIDE: usize = 2;

/// Quadrants per cell (2 x 2).
pub const QUADRANTS_PER_CELL: usize = QUADRANTS_PER_SIDE * QUADRANTS_PER_SIDE;

/// Distance between `a` and `b` in world units.
#[inline]
pub fn distance(a: &Vec3, b: &Vec3) -> f32 {
    (a - b).norm()
}
