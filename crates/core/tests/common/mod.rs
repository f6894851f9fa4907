//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wildfire_core::core_types::VERTS_PER_SIDE;
use wildfire_core::{
    CellId, Collaborators, FireEngine, FireSettings, FireVertex, Flammability, FlatWorld,
    TickSummary,
};

pub const WAIT: Duration = Duration::from_secs(10);

/// Index of the vertex at grid position `(x, y)` in a quadrant.
pub const fn vertex_at(x: usize, y: usize) -> usize {
    y * VERTS_PER_SIDE + x
}

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Settings under which a fire keeps itself alive and spreads within a few ticks.
pub fn lively_settings() -> FireSettings {
    FireSettings {
        fuel_to_heat_rate: 10.0,
        wind_speed_factor: 1.0,
        ..FireSettings::default()
    }
}

/// Grass that ignites easily.
pub fn dry_grass() -> Flammability {
    Flammability {
        can_burn: true,
        fuel: 50.0,
        min_burn_heat: 5.0,
    }
}

/// World of cells `min..=max`, every vertex covered in `grass`.
pub fn grass_world(min: (i32, i32), max: (i32, i32), grass: Flammability) -> Arc<FlatWorld> {
    let world = Arc::new(FlatWorld::new(min, max));
    for cell in world.cells().collect::<Vec<_>>() {
        world.plant_cell(cell, grass);
    }
    world
}

pub fn engine_over(world: &Arc<FlatWorld>, settings: FireSettings) -> FireEngine {
    FireEngine::new(Collaborators::from_host(world), settings).expect("valid settings")
}

/// Run one tick and wait for its tasks.
pub fn settle(engine: &FireEngine, delta: f32) -> TickSummary {
    let summary = engine.tick(delta);
    assert!(engine.wait_idle(WAIT), "cell tasks did not finish");
    summary
}

/// Every vertex that is burning or has burnt out.
pub fn fire_footprint(engine: &FireEngine) -> Vec<FireVertex> {
    let mut result = Vec::new();
    for (cell, state) in engine.snapshot() {
        for ((q, v), burning) in state.is_burning().indexed() {
            if *burning || state.is_charred()[(q, v)] {
                result.push(FireVertex::new(cell, q, v));
            }
        }
    }
    result
}

pub fn cell(x: i32, y: i32) -> CellId {
    FlatWorld::cell_id(x, y)
}
