//! Simulation unit addressing: cells and the vertices they contain.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::{QUADRANTS_PER_CELL, QUADRANTS_PER_SIDE, VERTS_PER_QUADRANT, VERTS_PER_SIDE};

/// Opaque identity of a terrain cell, assigned by the host world.
///
/// The simulation never interprets the value; it only hashes and compares it
/// and hands it back to the world collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{:X}", self.0)
    }
}

/// One simulation unit: a vertex of a quadrant grid inside a cell.
///
/// Quadrants are laid out as
///
/// ```text
///  0 | 1
/// ---+---
///  2 | 3
/// ```
///
/// and vertices in a quadrant are stored row-major: `vertex = y * 17 + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FireVertex {
    pub cell: CellId,
    /// Quadrant index, `0..4`
    pub quadrant: u8,
    /// Vertex index within the quadrant, `0..289`
    pub vertex: u16,
}

impl FireVertex {
    /// Create a vertex address.
    ///
    /// # Panics
    ///
    /// Panics if `quadrant` or `vertex` is out of range. Addresses are always
    /// built from clamped coordinates, so this indicates a programming error.
    #[must_use]
    pub fn new(cell: CellId, quadrant: usize, vertex: usize) -> Self {
        assert!(quadrant < QUADRANTS_PER_CELL, "quadrant {quadrant} out of range");
        assert!(vertex < VERTS_PER_QUADRANT, "vertex {vertex} out of range");
        Self {
            cell,
            quadrant: quadrant as u8,
            vertex: vertex as u16,
        }
    }

    /// Build from quadrant-grid coordinates (`qx`, `qy` in `0..2`, `x`, `y` in `0..17`).
    #[must_use]
    pub fn from_grid(cell: CellId, qx: usize, qy: usize, x: usize, y: usize) -> Self {
        assert!(x < VERTS_PER_SIDE && y < VERTS_PER_SIDE, "vertex ({x}, {y}) out of range");
        Self::new(cell, qy * QUADRANTS_PER_SIDE + qx, y * VERTS_PER_SIDE + x)
    }

    #[inline]
    pub fn quadrant_index(&self) -> usize {
        self.quadrant as usize
    }

    #[inline]
    pub fn vertex_index(&self) -> usize {
        self.vertex as usize
    }

    /// Quadrant column and row `(qx, qy)`.
    #[inline]
    pub fn quadrant_xy(&self) -> (usize, usize) {
        let q = self.quadrant_index();
        (q % QUADRANTS_PER_SIDE, q / QUADRANTS_PER_SIDE)
    }

    /// Vertex column and row `(x, y)` within the quadrant.
    #[inline]
    pub fn vertex_xy(&self) -> (usize, usize) {
        let v = self.vertex_index();
        (v % VERTS_PER_SIDE, v / VERTS_PER_SIDE)
    }
}

impl fmt::Display for FireVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.vertex_xy();
        write!(f, "{}[q{} ({x},{y})]", self.cell, self.quadrant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_round_trip_of_indices() {
        let v = FireVertex::from_grid(CellId(7), 1, 1, 16, 3);
        assert_eq!(v.quadrant, 3);
        assert_eq!(v.vertex, 3 * 17 + 16);
        assert_eq!(v.quadrant_xy(), (1, 1));
        assert_eq!(v.vertex_xy(), (16, 3));
    }

    #[test]
    #[should_panic(expected = "vertex 289 out of range")]
    fn test_vertex_out_of_range_panics() {
        let _ = FireVertex::new(CellId(1), 0, 289);
    }

    #[test]
    #[should_panic(expected = "quadrant 4 out of range")]
    fn test_quadrant_out_of_range_panics() {
        let _ = FireVertex::new(CellId(1), 4, 0);
    }
}
