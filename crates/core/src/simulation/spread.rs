//! Per-vertex fire physics
//!
//! Three mutations exist: [`damage_vertex`] adds heat (and may ignite),
//! [`cool_vertex`] removes heat (and may extinguish), and [`burn_cell`]
//! advances every vertex of one cell by one tick. All of them work on a cell
//! state the caller has already locked. Heat that a burning vertex sheds
//! into a different cell is never applied in place: `burn_cell` returns it
//! and the caller hands it to [`apply_spread_damage`] once the own cell's
//! lock is released, so a task only ever holds one cell lock at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

use crate::core_types::{
    CellId, FireVertex, VertexColor, WindSample, QUADRANTS_PER_CELL, VERTS_PER_QUADRANT,
};
use crate::grid::weighted_neighbours;
use crate::settings::FireSettings;
use crate::state::{CellStateStore, FireCellState};
use crate::world::{HazardSink, WorldQuery};

/// Channel step used to scorch non-flammable ground next to a fire.
const SCORCH_STEP: u8 = 15;

/// Collaborators and tunables shared by every mutation in one task
#[derive(Clone, Copy)]
pub struct SpreadContext<'a> {
    pub world: &'a dyn WorldQuery,
    pub hazards: &'a dyn HazardSink,
    pub settings: &'a FireSettings,
}

/// Weather sampled once at the start of a cell task
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub wind: WindSample,
    pub raining: bool,
}

impl WeatherSample {
    pub const CALM_DRY: Self = Self {
        wind: WindSample::CALM,
        raining: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Nothing changed
    Ignored,
    /// Non-flammable ground was darkened
    Scorched,
    /// Heat rose without reaching ignition
    Heated,
    /// The vertex caught fire
    Ignited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoolOutcome {
    Ignored,
    Cooled,
    /// A burning vertex lost all its heat and went out
    Extinguished,
}

/// Heat destined for a vertex in another cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadDamage {
    pub vertex: FireVertex,
    pub amount: f32,
}

/// What one [`burn_cell`] pass did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BurnReport {
    /// Vertices still burning at the end of the pass
    pub burning: usize,
    pub ignited: usize,
    pub charred: usize,
    /// Heat for neighbours outside the cell, to be applied after unlocking
    pub spread: Vec<SpreadDamage>,
    /// True if the pass stopped early on cancellation
    pub cancelled: bool,
}

/// Recolor a vertex if `recolor` returns a new tint. Returns true on change.
fn retint(
    world: &dyn WorldQuery,
    vertex: FireVertex,
    recolor: impl FnOnce(VertexColor) -> Option<VertexColor>,
) -> bool {
    let (q, v) = (vertex.quadrant_index(), vertex.vertex_index());
    let Some(current) = world.color(vertex.cell, q, v) else {
        return false;
    };
    match recolor(current) {
        Some(next) if next != current => {
            world.set_color(vertex.cell, q, v, next);
            true
        }
        _ => false,
    }
}

/// Saturating conversion of a tint level to a channel value.
#[inline]
fn grey_level(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Lower the tint to `grey(level)` if any channel is brighter.
fn dim_to(world: &dyn WorldQuery, vertex: FireVertex, level: u8) -> bool {
    retint(world, vertex, |c| {
        c.any_channel_above(level).then_some(VertexColor::grey(level))
    })
}

/// Add `amount` heat to `vertex`.
///
/// A flammable vertex heats up and ignites once its heat reaches the
/// ignition threshold; the hazard sink is told how long it can burn.
/// Non-flammable, exhausted or charred vertices take no heat, but when the
/// heat comes from a neighbouring fire (`from_spread`) their tint darkens.
pub fn damage_vertex(
    ctx: SpreadContext<'_>,
    state: &mut FireCellState,
    vertex: FireVertex,
    amount: f32,
    from_spread: bool,
) -> DamageOutcome {
    if amount <= 0.0 {
        return DamageOutcome::Ignored;
    }

    if !state.can_burn[vertex] || state.fuel[vertex] <= 0.0 || state.is_charred[vertex] {
        if !from_spread {
            return DamageOutcome::Ignored;
        }
        let scorched = retint(ctx.world, vertex, |c| {
            if c.any_channel_above(SCORCH_STEP) {
                Some(c.darkened(SCORCH_STEP))
            } else if c.is_black() {
                None
            } else {
                Some(VertexColor::BLACK)
            }
        });
        if !scorched {
            return DamageOutcome::Ignored;
        }
        state.altered = true;
        return DamageOutcome::Scorched;
    }

    state.heat[vertex] += amount;
    let heat_ratio = state.heat[vertex] / state.min_burn_heat[vertex];

    if state.is_burning[vertex] {
        return DamageOutcome::Heated;
    }

    if heat_ratio >= 1.0 {
        state.is_burning[vertex] = true;
        let lifetime = ctx.settings.burn_lifetime(state.fuel[vertex]);
        trace!("{vertex} ignited, lifetime {lifetime:.2}s");
        ctx.hazards.on_ignite(vertex, lifetime);
        return DamageOutcome::Ignited;
    }

    let level = grey_level(128.0 + 128.0 * (1.0 - heat_ratio));
    if dim_to(ctx.world, vertex, level) {
        state.altered = true;
    }
    DamageOutcome::Heated
}

/// Remove `amount` heat from `vertex`, extinguishing it if it was burning and
/// has no heat left.
pub fn cool_vertex(state: &mut FireCellState, vertex: FireVertex, amount: f32) -> CoolOutcome {
    if amount <= 0.0
        || !state.can_burn[vertex]
        || state.fuel[vertex] <= 0.0
        || state.is_charred[vertex]
        || state.heat[vertex] <= 0.0
    {
        return CoolOutcome::Ignored;
    }

    let heat = (state.heat[vertex] - amount).max(0.0);
    state.heat[vertex] = heat;

    if state.is_burning[vertex] && heat <= 0.0 {
        state.is_burning[vertex] = false;
        trace!("{vertex} extinguished");
        return CoolOutcome::Extinguished;
    }
    CoolOutcome::Cooled
}

/// Advance every vertex of `cell` by `delta` seconds.
///
/// Vertices are visited quadrant by quadrant in raster order. A burning
/// vertex shares `heat / heat_distribution_factor * delta` with each
/// neighbour (scaled by its wind weight and by rain), loses that much heat
/// per neighbour, consumes fuel and gains heat from it, and chars once its
/// fuel runs out. Non-burning vertices with heat cool passively.
///
/// `cancel` is polled before every vertex; a cancelled pass leaves the
/// remaining vertices untouched.
pub fn burn_cell(
    ctx: SpreadContext<'_>,
    cell: CellId,
    state: &mut FireCellState,
    delta: f32,
    weather: WeatherSample,
    cancel: &AtomicBool,
) -> BurnReport {
    let settings = ctx.settings;
    let rain = if weather.raining {
        settings.raining_factor
    } else {
        1.0
    };
    let mut report = BurnReport::default();

    'scan: for q in 0..QUADRANTS_PER_CELL {
        for v in 0..VERTS_PER_QUADRANT {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break 'scan;
            }

            let vertex = FireVertex::new(cell, q, v);

            if !state.is_burning[vertex] {
                if state.heat[vertex] > 0.0 {
                    state.heat[vertex] = (state.heat[vertex] - settings.self_heat_loss * delta).max(0.0);
                }
                continue;
            }

            let share = state.heat[vertex] / settings.heat_distribution_factor * delta;
            let targets =
                weighted_neighbours(ctx.world, &vertex, weather.wind, settings.wind_speed_factor);

            for target in &targets {
                let amount = share * rain * target.weight;
                if target.vertex.cell == cell {
                    if damage_vertex(ctx, state, target.vertex, amount, true) == DamageOutcome::Ignited {
                        report.ignited += 1;
                    }
                } else {
                    report.spread.push(SpreadDamage {
                        vertex: target.vertex,
                        amount,
                    });
                }
            }

            state.heat[vertex] = (state.heat[vertex] - targets.len() as f32 * share).max(0.0);
            state.fuel[vertex] = (state.fuel[vertex] - settings.fuel_consumption_rate * delta).max(0.0);
            state.heat[vertex] += settings.fuel_consumption_rate * settings.fuel_to_heat_rate * delta;

            if state.fuel[vertex] <= 0.0 {
                state.is_burning[vertex] = false;
                state.is_charred[vertex] = true;
                retint(ctx.world, vertex, |_| Some(VertexColor::BLACK));
                state.altered = true;
                report.charred += 1;
                trace!("{vertex} charred");
            } else {
                let level =
                    grey_level(128.0 * state.fuel[vertex] / settings.default_initial_fuel_amount);
                if dim_to(ctx.world, vertex, level) {
                    state.altered = true;
                }
            }
        }
    }

    report.burning = state.burning_count();
    report
}

/// Apply heat that crossed a cell boundary.
///
/// Target cells are created on demand and locked one at a time. Returns the
/// number of vertices ignited.
pub fn apply_spread_damage(
    ctx: SpreadContext<'_>,
    store: &CellStateStore,
    mut spread: Vec<SpreadDamage>,
) -> usize {
    // Stable sort keeps the diffusion order within each target cell
    spread.sort_by_key(|d| d.vertex.cell);

    let mut ignited = 0;
    for group in spread.chunk_by(|a, b| a.vertex.cell == b.vertex.cell) {
        let cell = group[0].vertex.cell;
        ignited += store.with_cell(cell, ctx.world, ctx.settings, |state| {
            group
                .iter()
                .filter(|damage| {
                    damage_vertex(ctx, state, damage.vertex, damage.amount, true)
                        == DamageOutcome::Ignited
                })
                .count()
        });
    }
    ignited
}
