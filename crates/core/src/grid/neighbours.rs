//! 8-connected vertex neighbourhood with quadrant and cell stitching
//!
//! Stepping off a quadrant grid wraps in three stages:
//! 1. the vertex column/row wraps `0 <-> 16`,
//! 2. the quadrant column/row flips `0 <-> 1`,
//! 3. if the quadrant flipped off the cell, the cell coordinate moves by one.
//!
//! [`step`] performs the wrap as a pure coordinate transform; [`neighbours`]
//! resolves the resulting cell through the host world.

use crate::core_types::{FireVertex, QUADRANTS_PER_SIDE, VERTS_PER_SIDE};
use crate::world::WorldQuery;

/// Grid offsets of the 8 neighbours in scan order: NW, N, NE, W, E, SW, S, SE.
///
/// Grid "north" is decreasing `y`.
pub const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Result of stepping one vertex in some direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStep {
    /// Cell coordinate change, each in `-1..=1`
    pub cell_dx: i32,
    pub cell_dy: i32,
    pub quadrant: usize,
    pub vertex: usize,
}

/// A neighbour and the grid offset it was reached by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbour {
    pub vertex: FireVertex,
    pub offset: (i32, i32),
}

/// Wrap a single coordinate into `0..len`, carrying into the next level.
#[inline]
fn wrap(value: i32, len: usize) -> (i32, i32) {
    let len = len as i32;
    if value < 0 {
        (len - 1, -1)
    } else if value >= len {
        (0, 1)
    } else {
        (value, 0)
    }
}

/// Step from `(quadrant, vertex)` by `(dx, dy)` grid positions (each in `-1..=1`).
#[must_use]
pub fn step(quadrant: usize, vertex: usize, dx: i32, dy: i32) -> GridStep {
    debug_assert!((-1..=1).contains(&dx) && (-1..=1).contains(&dy));
    let x = (vertex % VERTS_PER_SIDE) as i32;
    let y = (vertex / VERTS_PER_SIDE) as i32;
    let qx = (quadrant % QUADRANTS_PER_SIDE) as i32;
    let qy = (quadrant / QUADRANTS_PER_SIDE) as i32;

    let (nx, carry_x) = wrap(x + dx, VERTS_PER_SIDE);
    let (ny, carry_y) = wrap(y + dy, VERTS_PER_SIDE);
    let (nqx, cell_dx) = wrap(qx + carry_x, QUADRANTS_PER_SIDE);
    let (nqy, cell_dy) = wrap(qy + carry_y, QUADRANTS_PER_SIDE);

    GridStep {
        cell_dx,
        cell_dy,
        quadrant: (nqy as usize) * QUADRANTS_PER_SIDE + nqx as usize,
        vertex: (ny as usize) * VERTS_PER_SIDE + nx as usize,
    }
}

/// Grid-adjacent vertices of `vertex`.
///
/// Neighbours in cells the world does not have loaded are dropped, so the
/// result may hold fewer than 8 entries near the edge of the loaded area.
pub fn neighbours(world: &dyn WorldQuery, vertex: &FireVertex) -> Vec<Neighbour> {
    let mut result = Vec::with_capacity(NEIGHBOUR_OFFSETS.len());
    let mut cell_coords = None;

    for offset in NEIGHBOUR_OFFSETS {
        let s = step(vertex.quadrant_index(), vertex.vertex_index(), offset.0, offset.1);

        let cell = if s.cell_dx == 0 && s.cell_dy == 0 {
            vertex.cell
        } else {
            let (cell_x, cell_y) = *cell_coords.get_or_insert_with(|| world.coordinates(vertex.cell));
            match world.cell_at_coords(cell_x + s.cell_dx, cell_y + s.cell_dy) {
                Some(cell) => cell,
                None => continue,
            }
        };

        result.push(Neighbour {
            vertex: FireVertex::new(cell, s.quadrant, s.vertex),
            offset,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::FlatWorld;

    fn idx(x: usize, y: usize) -> usize {
        y * VERTS_PER_SIDE + x
    }

    #[test]
    fn test_interior_step() {
        let s = step(0, idx(5, 5), 1, -1);
        assert_eq!(
            s,
            GridStep {
                cell_dx: 0,
                cell_dy: 0,
                quadrant: 0,
                vertex: idx(6, 4)
            }
        );
    }

    #[test]
    fn test_vertex_wraps_into_next_quadrant() {
        // Quadrant 0 right edge -> quadrant 1 left edge
        let s = step(0, idx(16, 3), 1, 0);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, 0, 1, idx(0, 3)));

        // Quadrant 1 left edge -> quadrant 0 right edge
        let s = step(1, idx(0, 3), -1, 0);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, 0, 0, idx(16, 3)));

        // Quadrant 0 bottom edge -> quadrant 2 top edge
        let s = step(0, idx(7, 16), 0, 1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, 0, 2, idx(7, 0)));

        // Quadrant 3 top edge -> quadrant 1 bottom edge
        let s = step(3, idx(7, 0), 0, -1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, 0, 1, idx(7, 16)));
    }

    #[test]
    fn test_quadrant_wraps_into_next_cell() {
        // West edge of quadrant 0 -> east column of quadrant 1 in the cell to the west
        let s = step(0, idx(0, 8), -1, 0);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (-1, 0, 1, idx(16, 8)));

        // East edge of quadrant 3 -> quadrant 2 of the cell to the east
        let s = step(3, idx(16, 8), 1, 0);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (1, 0, 2, idx(0, 8)));

        // North edge of quadrant 1 -> quadrant 3 of the cell to the north
        let s = step(1, idx(4, 0), 0, -1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, -1, 3, idx(4, 16)));

        // South edge of quadrant 2 -> quadrant 0 of the cell to the south
        let s = step(2, idx(4, 16), 0, 1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, 1, 0, idx(4, 0)));
    }

    #[test]
    fn test_corner_diagonals_cross_both_axes() {
        // NW corner of the cell -> SE corner vertex of quadrant 3 of the diagonal cell
        let s = step(0, idx(0, 0), -1, -1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (-1, -1, 3, idx(16, 16)));

        // SE corner of the cell -> quadrant 0 of the diagonal cell
        let s = step(3, idx(16, 16), 1, 1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (1, 1, 0, idx(0, 0)));

        // Inner corner of quadrant 0 -> quadrant 3, same cell
        let s = step(0, idx(16, 16), 1, 1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, 0, 3, idx(0, 0)));

        // NE corner of quadrant 2: x wraps into quadrant 3, y into quadrant 0 -> quadrant 1
        let s = step(2, idx(16, 0), 1, -1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (0, 0, 1, idx(0, 16)));

        // NE corner of quadrant 1: x leaves the cell east, y stays within quadrant row 0 -> north cell
        let s = step(1, idx(16, 0), 1, -1);
        assert_eq!((s.cell_dx, s.cell_dy, s.quadrant, s.vertex), (1, -1, 2, idx(0, 16)));
    }

    #[test]
    fn test_every_step_stays_in_range() {
        for q in 0..4 {
            for v in 0..289 {
                for (dx, dy) in NEIGHBOUR_OFFSETS {
                    let s = step(q, v, dx, dy);
                    assert!(s.quadrant < 4 && s.vertex < 289);
                    assert!((-1..=1).contains(&s.cell_dx) && (-1..=1).contains(&s.cell_dy));
                }
            }
        }
    }

    #[test]
    fn test_interior_vertex_has_eight_neighbours_in_scan_order() {
        let world = FlatWorld::single_cell();
        let cell = FlatWorld::cell_id(0, 0);
        let v = FireVertex::from_grid(cell, 0, 0, 5, 5);
        let result = neighbours(&world, &v);
        assert_eq!(result.len(), 8);
        let offsets: Vec<_> = result.iter().map(|n| n.offset).collect();
        assert_eq!(offsets, NEIGHBOUR_OFFSETS.to_vec());
        assert!(result.iter().all(|n| n.vertex.cell == cell));
    }

    #[test]
    fn test_neighbours_in_unloaded_cells_are_dropped() {
        let world = FlatWorld::single_cell();
        let cell = FlatWorld::cell_id(0, 0);
        // NW corner of the only loaded cell: W, NW, N, NE, SW step outside
        let v = FireVertex::from_grid(cell, 0, 0, 0, 0);
        let result = neighbours(&world, &v);
        let offsets: Vec<_> = result.iter().map(|n| n.offset).collect();
        assert_eq!(offsets, vec![(1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_neighbours_resolve_adjacent_cell() {
        let world = FlatWorld::new((0, 0), (1, 0));
        let west = FlatWorld::cell_id(0, 0);
        let east = FlatWorld::cell_id(1, 0);
        let v = FireVertex::from_grid(west, 1, 0, 16, 8);
        let result = neighbours(&world, &v);
        assert_eq!(result.len(), 8);
        let e = result.iter().find(|n| n.offset == (1, 0)).expect("east neighbour");
        assert_eq!(e.vertex, FireVertex::from_grid(east, 0, 0, 0, 8));
    }
}
