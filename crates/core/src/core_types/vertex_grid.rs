//! Per-vertex storage for one cell
//!
//! Every per-vertex quantity of a cell (heat, fuel, flags, colors) lives in a
//! `VertexGrid`: a single owned buffer of `4 x 289` values indexed by
//! `(quadrant, vertex)`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use super::position::{QUADRANTS_PER_CELL, VERTS_PER_QUADRANT};
use super::vertex::FireVertex;

/// Values per cell.
pub const VERTS_PER_CELL: usize = QUADRANTS_PER_CELL * VERTS_PER_QUADRANT;

/// Owned `(quadrant, vertex)` array with bounds-checked accessors.
///
/// Stored flat in quadrant-major order (`quadrant * 289 + vertex`), which is
/// also the raster order the spread pass walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexGrid<T> {
    data: Vec<T>,
}

impl<T: Clone> VertexGrid<T> {
    /// Grid with every vertex set to `value`.
    #[must_use]
    pub fn filled(value: T) -> Self {
        Self {
            data: vec![value; VERTS_PER_CELL],
        }
    }
}

impl<T> VertexGrid<T> {
    /// Grid built by calling `f(quadrant, vertex)` for every vertex in raster order.
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(VERTS_PER_CELL);
        for q in 0..QUADRANTS_PER_CELL {
            for v in 0..VERTS_PER_QUADRANT {
                data.push(f(q, v));
            }
        }
        Self { data }
    }

    #[inline]
    fn offset(quadrant: usize, vertex: usize) -> usize {
        assert!(
            quadrant < QUADRANTS_PER_CELL && vertex < VERTS_PER_QUADRANT,
            "vertex ({quadrant}, {vertex}) out of bounds"
        );
        quadrant * VERTS_PER_QUADRANT + vertex
    }

    /// Value at `(quadrant, vertex)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn get(&self, quadrant: usize, vertex: usize) -> &T {
        &self.data[Self::offset(quadrant, vertex)]
    }

    /// Mutable value at `(quadrant, vertex)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[inline]
    pub fn get_mut(&mut self, quadrant: usize, vertex: usize) -> &mut T {
        &mut self.data[Self::offset(quadrant, vertex)]
    }

    /// Values in raster order `(q, v)`.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Values paired with their `(quadrant, vertex)` index.
    pub fn indexed(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, value)| ((i / VERTS_PER_QUADRANT, i % VERTS_PER_QUADRANT), value))
    }
}

impl<T> Index<(usize, usize)> for VertexGrid<T> {
    type Output = T;

    #[inline]
    fn index(&self, (quadrant, vertex): (usize, usize)) -> &T {
        self.get(quadrant, vertex)
    }
}

impl<T> IndexMut<(usize, usize)> for VertexGrid<T> {
    #[inline]
    fn index_mut(&mut self, (quadrant, vertex): (usize, usize)) -> &mut T {
        self.get_mut(quadrant, vertex)
    }
}

impl<T> Index<FireVertex> for VertexGrid<T> {
    type Output = T;

    #[inline]
    fn index(&self, vertex: FireVertex) -> &T {
        self.get(vertex.quadrant_index(), vertex.vertex_index())
    }
}

impl<T> IndexMut<FireVertex> for VertexGrid<T> {
    #[inline]
    fn index_mut(&mut self, vertex: FireVertex) -> &mut T {
        self.get_mut(vertex.quadrant_index(), vertex.vertex_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_raster_order() {
        let grid = VertexGrid::from_fn(|q, v| q * 1000 + v);
        assert_eq!(grid[(0, 0)], 0);
        assert_eq!(grid[(2, 17)], 2017);
        assert_eq!(*grid.get(3, 288), 3288);
        let indexed: Vec<_> = grid.indexed().take(2).map(|(idx, _)| idx).collect();
        assert_eq!(indexed, vec![(0, 0), (0, 1)]);
        assert_eq!(grid.iter().count(), VERTS_PER_CELL);
    }

    #[test]
    fn test_set_via_index_mut() {
        let mut grid = VertexGrid::filled(0.0_f32);
        grid[(1, 5)] = 4.5;
        assert_eq!(*grid.get(1, 5), 4.5);
        assert_eq!(*grid.get(1, 4), 0.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_bounds_access_panics() {
        let grid = VertexGrid::filled(false);
        let _ = grid.get(0, VERTS_PER_QUADRANT);
    }
}
