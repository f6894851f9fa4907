//! Scheduler, eviction and lifecycle behaviour of the engine

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use common::{cell, dry_grass, engine_over, grass_world, settle, vertex_at, WAIT};
use wildfire_core::{
    Collaborators, Environment, FireEngine, FireSettings, FireVertex, Flammability, FlatWorld,
    VertexColor, WindSample, WorldQuery,
};

/// Environment whose wind query blocks until the gate opens
#[derive(Default)]
struct GatedEnvironment {
    open: Mutex<bool>,
    opened: Condvar,
    waiting: AtomicUsize,
    max_waiting: AtomicUsize,
}

impl GatedEnvironment {
    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    fn wait_for_waiters(&self, count: usize) {
        let start = Instant::now();
        while self.waiting.load(Ordering::SeqCst) < count {
            assert!(start.elapsed() < WAIT, "tasks never reached the environment");
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Environment for GatedEnvironment {
    fn current_wind(&self) -> WindSample {
        let now = self.waiting.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_waiting.fetch_max(now, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        WindSample::CALM
    }

    fn is_raining(&self) -> bool {
        false
    }
}

fn gated_engine(settings: FireSettings) -> (Arc<FlatWorld>, Arc<GatedEnvironment>, FireEngine) {
    let world = grass_world((0, 0), (0, 0), dry_grass());
    let environment = Arc::new(GatedEnvironment::default());
    let collaborators = Collaborators::new(
        world.clone(),
        environment.clone(),
        world.clone(),
        world.clone(),
    );
    let engine = FireEngine::new(collaborators, settings).unwrap();
    (world, environment, engine)
}

#[test]
fn slow_cell_is_skipped_not_queued() {
    let settings = FireSettings {
        task_deadline_secs: 60.0,
        ..FireSettings::default()
    };
    let (_world, environment, engine) = gated_engine(settings);
    engine.damage_vertex(FireVertex::new(cell(0, 0), 0, vertex_at(5, 5)), 30.0);

    let first = engine.tick(1.0);
    assert_eq!(first.spawned, 1);
    environment.wait_for_waiters(1);

    for _ in 0..4 {
        let summary = engine.tick(1.0);
        assert_eq!(summary.spawned, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.reaped, 0);
        assert_eq!(engine.in_flight_tasks(), 1);
    }

    environment.open();
    assert!(engine.wait_idle(WAIT));
    assert_eq!(engine.in_flight_tasks(), 0);
    assert_eq!(environment.max_waiting.load(Ordering::SeqCst), 1);

    // Exactly one burn step ran
    let state = engine
        .vertex_state(FireVertex::new(cell(0, 0), 0, vertex_at(5, 5)))
        .unwrap();
    assert_eq!(state.fuel, 47.0);
}

#[test]
fn overdue_task_is_abandoned_and_cell_rescheduled() {
    let settings = FireSettings {
        task_deadline_secs: 0.05,
        ..FireSettings::default()
    };
    let (_world, environment, engine) = gated_engine(settings);
    engine.is_cell_altered(cell(0, 0));

    assert_eq!(engine.tick(1.0).spawned, 1);
    environment.wait_for_waiters(1);
    std::thread::sleep(Duration::from_millis(120));

    let summary = engine.tick(1.0);
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.spawned, 1);
    environment.wait_for_waiters(2);
    assert_eq!(engine.in_flight_tasks(), 1);

    environment.open();
    assert!(engine.wait_idle(WAIT));
    assert_eq!(engine.in_flight_tasks(), 0);
}

#[test]
fn wait_idle_times_out_while_tasks_block() {
    let (_world, environment, engine) = gated_engine(FireSettings::default());
    engine.is_cell_altered(cell(0, 0));
    engine.tick(1.0);
    environment.wait_for_waiters(1);

    assert!(!engine.wait_idle(Duration::from_millis(30)));
    environment.open();
    assert!(engine.wait_idle(WAIT));
}

#[test]
fn idle_cells_beyond_budget_are_evicted_oldest_first() {
    let settings = FireSettings {
        cell_budget: 2,
        ..FireSettings::default()
    };
    let world = grass_world((0, 0), (3, 0), Flammability::from_defaults(&settings, true));
    let engine = engine_over(&world, settings);

    engine.is_cell_altered(cell(0, 0));
    engine.is_cell_altered(cell(1, 0));
    assert_eq!(settle(&engine, 1.0).evicted, 0);

    engine.is_cell_altered(cell(2, 0));
    engine.is_cell_altered(cell(3, 0));
    assert_eq!(engine.tracked_cells(), 4);

    let summary = settle(&engine, 1.0);
    assert_eq!(summary.evicted, 2);
    let tracked: Vec<_> = engine.snapshot().into_keys().collect();
    assert!(tracked.contains(&cell(2, 0)));
    assert!(tracked.contains(&cell(3, 0)));
}

#[test]
fn burning_cells_are_never_evicted() {
    let settings = FireSettings {
        cell_budget: 1,
        ..FireSettings::default()
    };
    let world = grass_world((0, 0), (2, 0), Flammability::from_defaults(&settings, true));
    let engine = engine_over(&world, settings);

    let burning = FireVertex::new(cell(0, 0), 3, vertex_at(6, 6));
    engine.damage_vertex(burning, 30.0);
    settle(&engine, 1.0);
    engine.is_cell_altered(cell(1, 0));
    engine.is_cell_altered(cell(2, 0));

    settle(&engine, 1.0);
    assert_eq!(engine.tracked_cells(), 1);
    assert!(engine.vertex_state(burning).unwrap().is_burning);
}

#[test]
fn reset_restores_appearance_and_state() {
    let world = grass_world((0, 0), (1, 0), dry_grass());
    let engine = engine_over(&world, common::lively_settings());
    let west = cell(0, 0);
    let east = cell(1, 0);

    engine.damage_vertex(FireVertex::new(west, 1, vertex_at(14, 8)), 30.0);
    engine.damage_vertex(FireVertex::new(east, 2, vertex_at(8, 8)), 30.0);
    for _ in 0..5 {
        settle(&engine, 1.0);
    }
    assert!(engine.is_cell_altered(west));
    assert!(world
        .colors_of(west)
        .unwrap()
        .iter()
        .any(|c| *c != VertexColor::WHITE));

    assert!(engine.reset_cell(west));
    assert!(world
        .colors_of(west)
        .unwrap()
        .iter()
        .all(|c| *c == VertexColor::WHITE));
    assert!(!engine.is_cell_altered(west));
    let fresh = engine.vertex_state(FireVertex::new(west, 1, vertex_at(14, 8))).unwrap();
    assert_eq!(fresh.heat, 0.0);
    assert_eq!(fresh.fuel, 50.0);
    assert!(!fresh.is_burning && !fresh.is_charred);

    let reset = engine.reset_all();
    assert!(reset >= 1);
    assert_eq!(engine.tracked_cells(), 0);
    assert_eq!(engine.dirty_len(), 0);
    for c in [west, east] {
        for q in 0..4 {
            for v in 0..289 {
                assert_eq!(world.color(c, q, v), Some(VertexColor::WHITE));
            }
        }
    }
}

#[test]
fn regeneration_is_rate_limited_per_frame() {
    let settings = FireSettings {
        grass_generation_cells_per_frame_limit: 2,
        periodic_update_time: 1.0,
        ..FireSettings::default()
    };
    let world = grass_world((0, 0), (4, 0), Flammability::from_defaults(&settings, true));
    let engine = engine_over(&world, settings);

    for x in 0..5 {
        engine.damage_vertex(FireVertex::new(cell(x, 0), 0, vertex_at(2, 2)), 10.0);
    }
    settle(&engine, 0.0);
    assert_eq!(engine.dirty_len(), 5);

    // Frames too short to tick still drain the queue
    assert!(engine.update(0.01).is_none());
    assert_eq!(world.regenerated().len(), 2);
    engine.update(0.01);
    assert_eq!(world.regenerated().len(), 4);
    engine.update(0.01);
    assert_eq!(world.regenerated().len(), 5);
    assert_eq!(engine.dirty_len(), 0);
}

#[test]
fn charred_vertex_stays_charred_across_eviction() {
    let settings = FireSettings {
        cell_budget: 1,
        ..FireSettings::default()
    };
    let world = Arc::new(FlatWorld::new((0, 0), (1, 0)));
    let vertex = FireVertex::new(cell(0, 0), 1, vertex_at(9, 9));
    world.plant(
        vertex,
        Flammability {
            can_burn: true,
            fuel: 6.0,
            min_burn_heat: 5.0,
        },
    );
    let engine = engine_over(&world, settings);

    engine.damage_vertex(vertex, 30.0);
    for _ in 0..10 {
        settle(&engine, 1.0);
        if engine.vertex_state(vertex).unwrap().is_charred {
            break;
        }
    }
    assert!(engine.vertex_state(vertex).unwrap().is_charred);

    // Let the burnt cell age, then make it the oldest of two
    settle(&engine, 1.0);
    engine.is_cell_altered(cell(1, 0));
    assert_eq!(settle(&engine, 1.0).evicted, 1);
    assert!(engine.vertex_state(vertex).is_none());

    assert_eq!(
        engine.damage_vertex(vertex, 30.0),
        wildfire_core::simulation::DamageOutcome::Ignored
    );
    let state = engine.vertex_state(vertex).unwrap();
    assert!(state.is_charred);
    assert!(!state.is_burning);
    assert_eq!(state.fuel, 0.0);
    assert_eq!(state.original_color, VertexColor::WHITE);
}

#[test]
fn reset_during_running_task_leaves_cell_clean() {
    let settings = FireSettings {
        task_deadline_secs: 60.0,
        ..FireSettings::default()
    };
    let (world, environment, engine) = gated_engine(settings);
    let vertex = FireVertex::new(cell(0, 0), 0, vertex_at(5, 5));
    engine.damage_vertex(vertex, 30.0);

    assert_eq!(engine.tick(1.0).spawned, 1);
    environment.wait_for_waiters(1);

    assert!(engine.reset_cell(cell(0, 0)));
    environment.open();
    assert!(engine.wait_idle(WAIT));

    assert_eq!(engine.tracked_cells(), 0);
    assert!(world
        .colors_of(cell(0, 0))
        .unwrap()
        .iter()
        .all(|c| *c == VertexColor::WHITE));
    assert!(engine.vertex_state(vertex).is_none());
}

#[test]
fn shutdown_waits_for_abandoned_tasks() {
    let settings = FireSettings {
        task_deadline_secs: 0.05,
        ..FireSettings::default()
    };
    let (_world, environment, engine) = gated_engine(settings);
    engine.is_cell_altered(cell(0, 0));

    assert_eq!(engine.tick(1.0).spawned, 1);
    environment.wait_for_waiters(1);
    std::thread::sleep(Duration::from_millis(120));

    // Nothing left to reschedule once the cell is gone
    assert!(engine.reset_cell(cell(0, 0)));
    let summary = engine.tick(1.0);
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.spawned, 0);
    assert_eq!(engine.in_flight_tasks(), 0);

    assert!(!engine.shutdown(Duration::from_millis(30)));
    environment.open();
    assert!(engine.shutdown(WAIT));
    assert_eq!(environment.waiting.load(Ordering::SeqCst), 0);
}
