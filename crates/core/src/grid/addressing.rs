//! World position <-> vertex address conversion
//!
//! A cell spans 4096 units and is split at its 2048 midlines into four
//! quadrants. Each quadrant carries a 17 x 17 vertex grid with 128-unit
//! spacing, so the outer row and column of one quadrant sit on the same world
//! line as the first row and column of the next.

use tracing::debug;

use crate::core_types::{
    FireVertex, Vec3, CELL_SPAN, QUADRANT_SPAN, VERTEX_SPACING, VERTS_PER_SIDE,
};
use crate::world::WorldQuery;

/// Quadrant and vertex grid coordinates of a cell-local position.
///
/// Returns `(qx, qy, x, y)`: the quadrant column/row chosen against the 2048
/// midline and the nearest vertex, clamped to `0..=16` on each axis.
#[must_use]
pub fn snap_local(local_x: f32, local_y: f32) -> (usize, usize, usize, usize) {
    let qx = usize::from(local_x >= QUADRANT_SPAN);
    let qy = usize::from(local_y >= QUADRANT_SPAN);

    let quad_x = local_x - qx as f32 * QUADRANT_SPAN;
    let quad_y = local_y - qy as f32 * QUADRANT_SPAN;

    let max = (VERTS_PER_SIDE - 1) as f32;
    let x = (quad_x / VERTEX_SPACING).round().clamp(0.0, max) as usize;
    let y = (quad_y / VERTEX_SPACING).round().clamp(0.0, max) as usize;

    (qx, qy, x, y)
}

/// Horizontal world position of a vertex in the cell at `cell_coords`.
#[must_use]
pub fn vertex_planar_position(cell_coords: (i32, i32), vertex: &FireVertex) -> (f32, f32) {
    let (qx, qy) = vertex.quadrant_xy();
    let (x, y) = vertex.vertex_xy();
    (
        cell_coords.0 as f32 * CELL_SPAN + qx as f32 * QUADRANT_SPAN + x as f32 * VERTEX_SPACING,
        cell_coords.1 as f32 * CELL_SPAN + qy as f32 * QUADRANT_SPAN + y as f32 * VERTEX_SPACING,
    )
}

/// Nearest vertex to a world position.
///
/// Returns `None` when no loaded cell contains `pos`.
pub fn world_to_vertex(world: &dyn WorldQuery, pos: &Vec3) -> Option<FireVertex> {
    let Some(cell) = world.cell_at(pos) else {
        debug!("No cell at ({:.1}, {:.1})", pos.x, pos.y);
        return None;
    };
    let (cell_x, cell_y) = world.coordinates(cell);

    let local_x = pos.x - cell_x as f32 * CELL_SPAN;
    let local_y = pos.y - cell_y as f32 * CELL_SPAN;
    let (qx, qy, x, y) = snap_local(local_x, local_y);

    Some(FireVertex::from_grid(cell, qx, qy, x, y))
}

/// World position of a vertex, with terrain height from the host.
///
/// Returns `None` when the host has no land data under the vertex.
pub fn vertex_to_world(world: &dyn WorldQuery, vertex: &FireVertex) -> Option<Vec3> {
    let (x, y) = vertex_planar_position(world.coordinates(vertex.cell), vertex);
    let mut pos = Vec3::new(x, y, 0.0);
    match world.land_height(&pos) {
        Some(z) => {
            pos.z = z;
            Some(pos)
        }
        None => {
            debug!("No land data under {vertex}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::FlatWorld;
    use approx::assert_relative_eq;

    #[test]
    fn test_snap_quadrant_selection() {
        assert_eq!(snap_local(0.0, 0.0), (0, 0, 0, 0));
        assert_eq!(snap_local(2047.0, 0.0), (0, 0, 16, 0));
        assert_eq!(snap_local(2048.0, 0.0), (1, 0, 0, 0));
        assert_eq!(snap_local(100.0, 3000.0), (0, 1, 1, 7));
        assert_eq!(snap_local(4095.0, 4095.0), (1, 1, 16, 16));
    }

    #[test]
    fn test_snap_rounds_to_nearest() {
        assert_eq!(snap_local(63.9, 64.0), (0, 0, 0, 1));
        assert_eq!(snap_local(191.0, 193.0), (0, 0, 1, 2));
    }

    #[test]
    fn test_world_to_vertex_negative_cell() {
        let world = FlatWorld::new((-1, -1), (0, 0));
        let v = world_to_vertex(&world, &Vec3::new(-4096.0 + 2048.0 + 256.0, -10.0, 0.0))
            .expect("cell is loaded");
        assert_eq!(v.cell, FlatWorld::cell_id(-1, -1));
        assert_eq!(v.quadrant_xy(), (1, 1));
        assert_eq!(v.vertex_xy(), (2, 16));
    }

    #[test]
    fn test_world_to_vertex_outside_world() {
        let world = FlatWorld::single_cell();
        assert!(world_to_vertex(&world, &Vec3::new(-1.0, 5.0, 0.0)).is_none());
    }

    #[test]
    fn test_vertex_to_world_inverse() {
        let world = FlatWorld::new((0, 0), (2, 2)).with_height(35.0);
        let cell = FlatWorld::cell_id(1, 2);
        let v = FireVertex::from_grid(cell, 1, 0, 3, 9);
        let pos = vertex_to_world(&world, &v).expect("land loaded");
        assert_relative_eq!(pos.x, 4096.0 + 2048.0 + 3.0 * 128.0);
        assert_relative_eq!(pos.y, 2.0 * 4096.0 + 9.0 * 128.0);
        assert_relative_eq!(pos.z, 35.0);
        assert_eq!(world_to_vertex(&world, &pos), Some(v));
    }

    #[test]
    fn test_round_trip_every_vertex() {
        let world = FlatWorld::single_cell();
        let cell = FlatWorld::cell_id(0, 0);
        for q in 0..4 {
            for v in 0..289 {
                let vertex = FireVertex::new(cell, q, v);
                let (x, y) = vertex.vertex_xy();
                // Shared edge vertices resolve to the quadrant on the far side
                if x == 16 || y == 16 {
                    continue;
                }
                let pos = vertex_to_world(&world, &vertex).expect("loaded");
                assert_eq!(world_to_vertex(&world, &pos), Some(vertex));
            }
        }
    }
}
