//! Fire engine: the service object hosts construct and drive
//!
//! `FireEngine` ties together the cell state store, the per-cell scheduler,
//! the dirty queue and the active settings. Hosts call [`FireEngine::update`]
//! once per frame (or [`FireEngine::tick`] directly on their own schedule),
//! feed impacts through [`FireEngine::add_fire_event`], and receive
//! ignitions and regeneration requests through their collaborator traits.

pub mod dirty_queue;
pub mod events;
pub mod impact;
pub mod scheduler;
pub mod spread;

pub use dirty_queue::DirtyQueue;
pub use events::{add_fire_event, POINT_EVENT_RADIUS};
pub use impact::{parse_pattern_lines, signed_damage, ImpactClassifier, ImpactKind};
pub use scheduler::{Scheduler, TaskDone, TaskOutcome};
pub use spread::{
    apply_spread_damage, burn_cell, cool_vertex, damage_vertex, BurnReport, CoolOutcome,
    DamageOutcome, SpreadContext, SpreadDamage, WeatherSample,
};

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core_types::{CellId, FireVertex, Vec3};
use crate::error::WildfireError;
use crate::settings::FireSettings;
use crate::state::{CellStateStore, FireCellState, VertexState};
use crate::world::Collaborators;

/// What one [`FireEngine::tick`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Activity clock value of this tick
    pub tick: u64,
    /// Tasks that finished since the previous tick
    pub reaped: usize,
    /// Tasks abandoned past their deadline
    pub expired: usize,
    /// Cells moved to the dirty queue
    pub queued_dirty: usize,
    pub spawned: usize,
    /// Cells skipped because their previous task is still running
    pub skipped: usize,
    pub evicted: usize,
    /// Ignitions reported by reaped tasks
    pub ignited: usize,
}

/// State reachable from worker threads
struct Shared {
    collaborators: Collaborators,
    store: CellStateStore,
}

impl Shared {
    fn context<'a>(&'a self, settings: &'a FireSettings) -> SpreadContext<'a> {
        SpreadContext {
            world: self.collaborators.world.as_ref(),
            hazards: self.collaborators.hazards.as_ref(),
            settings,
        }
    }

    fn with_cell<R>(
        &self,
        cell: CellId,
        settings: &FireSettings,
        f: impl FnOnce(&mut FireCellState) -> R,
    ) -> R {
        self.store
            .with_cell(cell, self.collaborators.world.as_ref(), settings, f)
    }
}

/// Body of one cell task.
fn run_cell_task(
    shared: &Shared,
    cell: CellId,
    settings: &FireSettings,
    delta: f32,
    cancel: &AtomicBool,
) -> TaskOutcome {
    let gone = TaskOutcome {
        skipped: true,
        ..TaskOutcome::default()
    };
    // Reset or evicted since the tick that spawned us
    let Some(slot) = shared.store.get(cell) else {
        return gone;
    };

    let environment = &shared.collaborators.environment;
    let weather = WeatherSample {
        wind: environment.current_wind(),
        raining: environment.is_raining(),
    };
    let ctx = shared.context(settings);

    let report = {
        // Blocks behind events and behind an abandoned task, which stops at
        // its next vertex once cancelled
        let mut state = slot.lock();
        if slot.is_retired() {
            return gone;
        }
        if cancel.load(Ordering::Relaxed) {
            return TaskOutcome {
                cancelled: true,
                ..TaskOutcome::default()
            };
        }
        burn_cell(ctx, cell, &mut state, delta, weather, cancel)
    };

    if report.burning > 0 || report.charred > 0 {
        shared.store.touch(&slot);
    }

    let mut outcome = TaskOutcome {
        burning: report.burning,
        ignited: report.ignited,
        charred: report.charred,
        skipped: false,
        cancelled: report.cancelled,
    };
    if !report.cancelled && !report.spread.is_empty() {
        outcome.ignited += apply_spread_damage(ctx, &shared.store, report.spread);
    }
    outcome
}

/// The wildfire simulation service
///
/// All methods take `&self`; the engine can be shared between the host's
/// main thread and its event handlers.
pub struct FireEngine {
    shared: Arc<Shared>,
    settings: RwLock<FireSettings>,
    scheduler: Mutex<Scheduler>,
    dirty: DirtyQueue,
    classifier: RwLock<ImpactClassifier>,
    /// Host time accumulated towards the next periodic tick
    pending_time: Mutex<f32>,
}

impl std::fmt::Debug for FireEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FireEngine")
            .field("tracked_cells", &self.tracked_cells())
            .field("in_flight", &self.in_flight_tasks())
            .field("dirty", &self.dirty_len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FireEngine {
    /// Create an engine over the given host collaborators.
    ///
    /// # Errors
    ///
    /// Returns `WildfireError::InvalidSetting` if `settings` fail validation,
    /// or `WildfireError::ThreadPool` if the worker pool cannot start.
    pub fn new(collaborators: Collaborators, settings: FireSettings) -> Result<Self, WildfireError> {
        settings.validate()?;
        let scheduler = Scheduler::new(settings.worker_threads)?;
        info!(
            "Wildfire engine started: {} workers, tick every {:.2}s, cell budget {}",
            scheduler.worker_threads(),
            settings.periodic_update_time,
            settings.cell_budget
        );

        Ok(Self {
            shared: Arc::new(Shared {
                collaborators,
                store: CellStateStore::new(),
            }),
            settings: RwLock::new(settings),
            scheduler: Mutex::new(scheduler),
            dirty: DirtyQueue::new(),
            classifier: RwLock::new(ImpactClassifier::default()),
            pending_time: Mutex::new(0.0),
        })
    }

    /// Copy of the active settings.
    pub fn settings(&self) -> FireSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the active settings. Running tasks keep their old copy; the
    /// next tick uses the new values.
    ///
    /// # Errors
    ///
    /// Returns `WildfireError::InvalidSetting` and keeps the old settings if
    /// `settings` fail validation.
    pub fn set_settings(&self, settings: FireSettings) -> Result<(), WildfireError> {
        settings.validate()?;
        let mut active = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if settings.worker_threads != active.worker_threads {
            warn!("worker_threads changes only apply to newly created engines");
        }
        *active = settings;
        info!("Wildfire settings reloaded");
        Ok(())
    }

    /// Replace the impact source patterns used by [`FireEngine::add_impact`].
    pub fn set_impact_classifier(&self, classifier: ImpactClassifier) {
        let (fire, cold, water) = classifier.counts();
        info!("Loaded impact patterns: {fire} fire, {cold} cold, {water} water");
        *self.classifier.write().unwrap_or_else(PoisonError::into_inner) = classifier;
    }

    /// Classify an impact source by name.
    pub fn classify_impact(&self, source: &str) -> ImpactKind {
        self.classifier
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .classify(source)
    }

    /// Apply a signed impact at `pos`.
    ///
    /// Positive `magnitude` heats, negative cools. Returns the number of
    /// vertices that changed.
    pub fn add_fire_event(&self, pos: &Vec3, radius: f32, magnitude: f32) -> usize {
        let settings = self.settings();
        add_fire_event(
            self.shared.context(&settings),
            &self.shared.store,
            pos,
            radius,
            magnitude,
        )
    }

    /// Apply an impact named by its source, signed by the impact classifier.
    ///
    /// Sources matching no pattern are ignored.
    pub fn add_impact(&self, source: &str, pos: &Vec3, radius: f32, magnitude: f32) -> usize {
        match self.classify_impact(source) {
            ImpactKind::Unknown => 0,
            kind => self.add_fire_event(pos, radius, signed_damage(kind, magnitude)),
        }
    }

    /// Heat a single vertex directly.
    pub fn damage_vertex(&self, vertex: FireVertex, amount: f32) -> DamageOutcome {
        let settings = self.settings();
        let ctx = self.shared.context(&settings);
        self.shared.with_cell(vertex.cell, &settings, |state| {
            damage_vertex(ctx, state, vertex, amount, false)
        })
    }

    /// Cool a single vertex directly.
    pub fn cool_vertex(&self, vertex: FireVertex, amount: f32) -> CoolOutcome {
        let settings = self.settings();
        self.shared
            .with_cell(vertex.cell, &settings, |state| cool_vertex(state, vertex, amount))
    }

    /// Run one simulation step of `delta` seconds.
    ///
    /// Reaps finished tasks, abandons overdue ones, queues altered cells for
    /// regeneration, evicts idle cells beyond the cell budget, then starts a
    /// task for every remaining tracked cell without one.
    pub fn tick(&self, delta: f32) -> TickSummary {
        let settings = self.settings();
        let mut scheduler = lock(&self.scheduler);
        let store = &self.shared.store;
        let mut summary = TickSummary {
            tick: store.advance_clock(),
            ..TickSummary::default()
        };

        for done in scheduler.reap() {
            summary.reaped += 1;
            summary.ignited += done.outcome.ignited;
        }

        let deadline = Duration::from_secs_f32(settings.task_deadline_secs);
        summary.expired = scheduler.expire(deadline).len();

        let slots = store.slots();
        for (cell, slot) in &slots {
            // A locked cell is being worked on; its flag is picked up next tick
            let Some(mut state) = slot.try_lock() else {
                continue;
            };
            if state.take_altered() && self.dirty.push(*cell) {
                summary.queued_dirty += 1;
            }
        }

        if settings.cell_budget > 0 {
            summary.evicted = store
                .evict_idle(settings.cell_budget, |cell| scheduler.is_in_flight(cell))
                .len();
        }

        for cell in store.cell_ids() {
            let shared = self.shared.clone();
            let task_settings = settings.clone();
            let spawned = scheduler.spawn(cell, move |cancel| {
                run_cell_task(&shared, cell, &task_settings, delta, cancel)
            });
            if spawned {
                summary.spawned += 1;
            } else {
                summary.skipped += 1;
            }
        }

        debug!(
            "Tick {}: reaped {}, expired {}, spawned {}, skipped {}, dirty +{}, evicted {}",
            summary.tick,
            summary.reaped,
            summary.expired,
            summary.spawned,
            summary.skipped,
            summary.queued_dirty,
            summary.evicted
        );
        summary
    }

    /// Per-frame driver.
    ///
    /// Accumulates host frame time and runs one tick of
    /// `periodic_update_time` seconds once enough has elapsed; time beyond
    /// one further period is dropped rather than replayed. Dirty cells are
    /// handed to the regeneration sink every call. Does nothing while the
    /// simulation is disabled.
    pub fn update(&self, frame_delta: f32) -> Option<TickSummary> {
        let settings = self.settings();
        if !settings.enabled {
            return None;
        }

        let period = settings.periodic_update_time;
        let due = {
            let mut pending = lock(&self.pending_time);
            *pending += frame_delta.max(0.0);
            if *pending >= period {
                *pending = (*pending - period).min(period);
                true
            } else {
                false
            }
        };

        let summary = due.then(|| self.tick(period));
        self.regenerate_dirty();
        summary
    }

    /// Hand at most `grass_generation_cells_per_frame_limit` dirty cells to
    /// the regeneration sink. Returns the cells handed over.
    pub fn regenerate_dirty(&self) -> Vec<CellId> {
        let limit = self.settings().grass_generation_cells_per_frame_limit;
        let cells = self.dirty.drain(limit);
        if !cells.is_empty() {
            debug!("Regenerating {} cells, {} still queued", cells.len(), self.dirty.len());
            self.shared.collaborators.regeneration.regenerate(&cells);
        }
        cells
    }

    /// Block until every in-flight task has finished or `timeout` passes.
    ///
    /// Returns true if the scheduler is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let mut finished = Vec::new();
        lock(&self.scheduler).wait_idle(timeout, &mut finished)
    }

    /// Cancel every in-flight task and wait up to `timeout` for them to stop.
    ///
    /// Tasks abandoned past their deadline were cancelled when they expired
    /// and are waited for too. Returns true once no task body is running, after
    /// which no collaborator is called until the next tick.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        let mut scheduler = lock(&self.scheduler);
        scheduler.signal_cancel();
        let mut finished = Vec::new();
        let idle = scheduler.wait_idle(timeout, &mut finished)
            && scheduler.wait_exited(timeout.saturating_sub(start.elapsed()));
        if idle {
            debug!("Fire engine shut down, {} tasks cancelled", finished.len());
        } else {
            warn!(
                "{} cell tasks still running after {timeout:?}",
                scheduler.running_tasks()
            );
        }
        idle
    }

    /// True if the cell's appearance changed and it has not been regenerated
    /// yet. Starts tracking the cell if it was not tracked.
    pub fn is_cell_altered(&self, cell: CellId) -> bool {
        let settings = self.settings();
        let altered = self.shared.with_cell(cell, &settings, |state| state.altered());
        altered || self.dirty.contains(cell)
    }

    /// State of one vertex, if its cell is tracked.
    pub fn vertex_state(&self, vertex: FireVertex) -> Option<VertexState> {
        let slot = self.shared.store.get(vertex.cell)?;
        let state = slot.lock().vertex(vertex.quadrant_index(), vertex.vertex_index());
        Some(state)
    }

    /// Deep copy of every tracked cell, for diagnostics.
    pub fn snapshot(&self) -> FxHashMap<CellId, FireCellState> {
        self.shared.store.snapshot()
    }

    /// Restore a cell's original colors and stop tracking it.
    pub fn reset_cell(&self, cell: CellId) -> bool {
        self.dirty.remove(cell);
        self.shared
            .store
            .reset(cell, self.shared.collaborators.world.as_ref())
    }

    /// Reset every tracked cell.
    pub fn reset_all(&self) -> usize {
        self.dirty.clear();
        self.shared
            .store
            .reset_all(self.shared.collaborators.world.as_ref())
    }

    pub fn in_flight_tasks(&self) -> usize {
        lock(&self.scheduler).in_flight()
    }

    pub fn tracked_cells(&self) -> usize {
        self.shared.store.len()
    }

    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }
}
