//! External damage and cooling events
//!
//! An impact is a world position, a radius and a signed magnitude: positive
//! values heat vertices, negative values cool them. Small impacts hit the
//! single nearest vertex; larger ones hit every vertex within the radius
//! across the 3 x 3 block of cells around the impact, with linear falloff.

use tracing::debug;

use super::spread::{cool_vertex, damage_vertex, CoolOutcome, DamageOutcome, SpreadContext};
use crate::core_types::{
    distance, FireVertex, Vec3, QUADRANTS_PER_CELL, VERTEX_SPACING, VERTS_PER_QUADRANT,
};
use crate::grid::{vertex_to_world, world_to_vertex};
use crate::state::{CellStateStore, FireCellState};

/// Radius at or below which an event targets a single vertex.
pub const POINT_EVENT_RADIUS: f32 = VERTEX_SPACING;

/// Heat or cool one vertex by a signed amount. Returns true if it changed.
fn apply_signed(
    ctx: SpreadContext<'_>,
    state: &mut FireCellState,
    vertex: FireVertex,
    magnitude: f32,
) -> bool {
    if magnitude > 0.0 {
        damage_vertex(ctx, state, vertex, magnitude, false) != DamageOutcome::Ignored
    } else {
        cool_vertex(state, vertex, -magnitude) != CoolOutcome::Ignored
    }
}

/// Apply an impact of `magnitude` at `pos`.
///
/// Returns the number of vertices whose state or tint changed. Impacts
/// outside loaded cells, or whose nearest vertex lies more than one vertex
/// spacing away (for example far above the terrain), are dropped.
pub fn add_fire_event(
    ctx: SpreadContext<'_>,
    store: &CellStateStore,
    pos: &Vec3,
    radius: f32,
    magnitude: f32,
) -> usize {
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 0;
    }
    let Some(centre) = world_to_vertex(ctx.world, pos) else {
        return 0;
    };

    if radius <= POINT_EVENT_RADIUS {
        point_event(ctx, store, pos, centre, magnitude)
    } else {
        area_event(ctx, store, pos, centre, radius, magnitude)
    }
}

fn point_event(
    ctx: SpreadContext<'_>,
    store: &CellStateStore,
    pos: &Vec3,
    vertex: FireVertex,
    magnitude: f32,
) -> usize {
    let Some(vertex_pos) = vertex_to_world(ctx.world, &vertex) else {
        return 0;
    };
    let dist = distance(pos, &vertex_pos);
    if dist > POINT_EVENT_RADIUS {
        debug!("Impact {dist:.1} units from nearest vertex {vertex}, ignored");
        return 0;
    }

    let changed = store.with_cell(vertex.cell, ctx.world, ctx.settings, |state| {
        apply_signed(ctx, state, vertex, magnitude)
    });
    usize::from(changed)
}

fn area_event(
    ctx: SpreadContext<'_>,
    store: &CellStateStore,
    pos: &Vec3,
    centre: FireVertex,
    radius: f32,
    magnitude: f32,
) -> usize {
    let (cell_x, cell_y) = ctx.world.coordinates(centre.cell);
    let mut changed = 0;

    for dy in -1..=1 {
        for dx in -1..=1 {
            let Some(cell) = ctx.world.cell_at_coords(cell_x + dx, cell_y + dy) else {
                continue;
            };

            // Positions first, so the cell lock is not held across height queries
            let mut hits = Vec::new();
            for q in 0..QUADRANTS_PER_CELL {
                for v in 0..VERTS_PER_QUADRANT {
                    let vertex = FireVertex::new(cell, q, v);
                    let Some(vertex_pos) = vertex_to_world(ctx.world, &vertex) else {
                        continue;
                    };
                    let dist = distance(pos, &vertex_pos);
                    if dist < radius {
                        hits.push((vertex, magnitude * (1.0 - dist / radius)));
                    }
                }
            }
            if hits.is_empty() {
                continue;
            }

            changed += store.with_cell(cell, ctx.world, ctx.settings, |state| {
                hits.into_iter()
                    .filter(|(vertex, amount)| apply_signed(ctx, state, *vertex, *amount))
                    .count()
            });
        }
    }

    debug!("Impact at ({:.0}, {:.0}) r={radius:.0} changed {changed} vertices", pos.x, pos.y);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{CellId, VERTS_PER_SIDE};
    use crate::settings::FireSettings;
    use crate::world::{Flammability, FlatWorld};
    use approx::assert_relative_eq;

    fn grass_block() -> (FlatWorld, FireSettings) {
        let settings = FireSettings::default();
        let world = FlatWorld::new((-1, -1), (1, 1));
        for cell in world.cells().collect::<Vec<_>>() {
            world.plant_cell(cell, Flammability::from_defaults(&settings, true));
        }
        (world, settings)
    }

    fn ctx<'a>(world: &'a FlatWorld, settings: &'a FireSettings) -> SpreadContext<'a> {
        SpreadContext {
            world,
            hazards: world,
            settings,
        }
    }

    fn heated(store: &CellStateStore) -> Vec<(FireVertex, f32)> {
        let mut result = Vec::new();
        for (cell, state) in store.snapshot() {
            for ((q, v), heat) in state.heat().indexed() {
                if *heat > 0.0 {
                    result.push((FireVertex::new(cell, q, v), *heat));
                }
            }
        }
        result
    }

    #[test]
    fn test_point_event_hits_one_vertex() {
        let (world, settings) = grass_block();
        let store = CellStateStore::new();
        let pos = Vec3::new(1000.0, 1000.0, 0.0);

        let changed = add_fire_event(ctx(&world, &settings), &store, &pos, 50.0, 10.0);
        assert_eq!(changed, 1);

        let hits = heated(&store);
        assert_eq!(hits.len(), 1);
        let (vertex, heat) = hits[0];
        assert_eq!(vertex.cell, FlatWorld::cell_id(0, 0));
        assert_eq!(vertex.quadrant_index(), 0);
        // round(1000 / 128) = 8
        assert_eq!(vertex.vertex_index(), 8 * VERTS_PER_SIDE + 8);
        assert_eq!(heat, 10.0);
    }

    #[test]
    fn test_point_event_far_above_ground_is_rejected() {
        let (world, settings) = grass_block();
        let store = CellStateStore::new();
        let pos = Vec3::new(1000.0, 1000.0, 400.0);
        assert_eq!(add_fire_event(ctx(&world, &settings), &store, &pos, 10.0, 10.0), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_event_outside_world_is_dropped() {
        let (world, settings) = grass_block();
        let store = CellStateStore::new();
        let pos = Vec3::new(90_000.0, 0.0, 0.0);
        assert_eq!(add_fire_event(ctx(&world, &settings), &store, &pos, 1000.0, 10.0), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_negative_point_event_cools() {
        let (world, settings) = grass_block();
        let store = CellStateStore::new();
        let pos = Vec3::new(300.0, 300.0, 0.0);
        let c = ctx(&world, &settings);

        add_fire_event(c, &store, &pos, 0.0, 30.0);
        let (vertex, _) = heated(&store)[0];
        assert!(store.snapshot()[&vertex.cell].vertex(0, vertex.vertex_index()).is_burning);

        add_fire_event(c, &store, &pos, 0.0, -50.0);
        let state = store.snapshot()[&vertex.cell].vertex(0, vertex.vertex_index());
        assert_eq!(state.heat, 0.0);
        assert!(!state.is_burning);
    }

    #[test]
    fn test_area_event_scales_with_distance() {
        let (world, settings) = grass_block();
        let store = CellStateStore::new();
        // Near a cell corner so the radius reaches into neighbouring cells
        let pos = Vec3::new(100.0, 150.0, 0.0);
        let radius = 600.0;
        let magnitude = 20.0;

        let changed = add_fire_event(ctx(&world, &settings), &store, &pos, radius, magnitude);
        let hits = heated(&store);
        assert_eq!(changed, hits.len());
        assert!(hits.len() > 1);

        let cells: Vec<CellId> = store.cell_ids();
        assert!(cells.len() >= 3, "expected spill into neighbour cells, got {cells:?}");

        for (vertex, heat) in hits {
            let vertex_pos = vertex_to_world(&world, &vertex).expect("loaded");
            let dist = distance(&pos, &vertex_pos);
            assert!(dist < radius);
            assert_relative_eq!(heat, magnitude * (1.0 - dist / radius), epsilon = 1e-4);
        }
    }

    #[test]
    fn test_area_event_skips_unloaded_cells() {
        let settings = FireSettings::default();
        let world = FlatWorld::single_cell();
        let cell = FlatWorld::cell_id(0, 0);
        world.plant_cell(cell, Flammability::from_defaults(&settings, true));
        let store = CellStateStore::new();

        let pos = Vec3::new(64.0, 64.0, 0.0);
        let changed = add_fire_event(ctx(&world, &settings), &store, &pos, 400.0, 5.0);
        assert!(changed > 0);
        assert_eq!(store.cell_ids(), vec![cell]);
    }

    #[test]
    fn test_zero_magnitude_does_nothing() {
        let (world, settings) = grass_block();
        let store = CellStateStore::new();
        let pos = Vec3::new(100.0, 100.0, 0.0);
        assert_eq!(add_fire_event(ctx(&world, &settings), &store, &pos, 1000.0, 0.0), 0);
        assert!(store.is_empty());
    }
}
