//! Per-cell fire state and the store that owns it

pub mod store;

pub use store::{CellSlot, CellStateStore};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_types::{CellId, VertexColor, VertexGrid, QUADRANTS_PER_CELL, VERTS_PER_QUADRANT};
use crate::settings::FireSettings;
use crate::world::{blend_vertex_flammability, WorldQuery};

/// Where a vertex is in its fire lifecycle
///
/// ```text
/// Unburnt -> PreIgnition -> Burning -> Charred
///    ^            |            |
///    +------------+------------+   (cooling)
/// ```
///
/// `Inert` vertices have nothing to burn and never leave that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexPhase {
    Inert,
    Unburnt,
    PreIgnition,
    Burning,
    Charred,
}

/// Read-only view of one vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexState {
    pub heat: f32,
    pub fuel: f32,
    pub min_burn_heat: f32,
    pub can_burn: bool,
    pub is_burning: bool,
    pub is_charred: bool,
    pub original_color: VertexColor,
}

impl VertexState {
    pub fn phase(&self) -> VertexPhase {
        if !self.can_burn {
            VertexPhase::Inert
        } else if self.is_charred {
            VertexPhase::Charred
        } else if self.is_burning {
            VertexPhase::Burning
        } else if self.heat > 0.0 {
            VertexPhase::PreIgnition
        } else {
            VertexPhase::Unburnt
        }
    }
}

/// Fire state of every vertex in one cell
///
/// Created lazily the first time a cell is referenced and owned by the
/// [`CellStateStore`]. Mutated only by the cell's scheduler task and by event
/// ingestion, both while holding the cell's lock.
///
/// Invariants, per vertex:
/// - `is_charred` implies `!is_burning` and `fuel <= 0`
/// - `!can_burn` vertices keep their initial heat, fuel and flags forever
/// - `fuel` only decreases while `is_burning`
/// - `heat` and `fuel` never drop below zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireCellState {
    pub(crate) heat: VertexGrid<f32>,
    pub(crate) fuel: VertexGrid<f32>,
    pub(crate) min_burn_heat: VertexGrid<f32>,
    pub(crate) can_burn: VertexGrid<bool>,
    pub(crate) is_burning: VertexGrid<bool>,
    pub(crate) is_charred: VertexGrid<bool>,
    pub(crate) original_color: VertexGrid<VertexColor>,
    pub(crate) altered: bool,
}

impl FireCellState {
    /// Build the state of `cell` from the host's texture coverage and colors.
    pub fn from_world(cell: CellId, world: &dyn WorldQuery, settings: &FireSettings) -> Self {
        let flammability =
            VertexGrid::from_fn(|q, v| blend_vertex_flammability(&world.vertex_textures(cell, q, v), settings));
        let original_color =
            VertexGrid::from_fn(|q, v| world.color(cell, q, v).unwrap_or(VertexColor::WHITE));

        let state = Self {
            heat: VertexGrid::filled(0.0),
            fuel: VertexGrid::from_fn(|q, v| flammability[(q, v)].fuel),
            min_burn_heat: VertexGrid::from_fn(|q, v| flammability[(q, v)].min_burn_heat),
            can_burn: VertexGrid::from_fn(|q, v| flammability[(q, v)].can_burn),
            is_burning: VertexGrid::filled(false),
            is_charred: VertexGrid::filled(false),
            original_color,
            altered: false,
        };

        debug!(
            "Created fire state for {cell}: {} burnable vertices",
            state.can_burn.iter().filter(|b| **b).count()
        );
        state
    }

    /// State of one vertex.
    pub fn vertex(&self, quadrant: usize, vertex: usize) -> VertexState {
        VertexState {
            heat: self.heat[(quadrant, vertex)],
            fuel: self.fuel[(quadrant, vertex)],
            min_burn_heat: self.min_burn_heat[(quadrant, vertex)],
            can_burn: self.can_burn[(quadrant, vertex)],
            is_burning: self.is_burning[(quadrant, vertex)],
            is_charred: self.is_charred[(quadrant, vertex)],
            original_color: self.original_color[(quadrant, vertex)],
        }
    }

    pub fn heat(&self) -> &VertexGrid<f32> {
        &self.heat
    }

    pub fn fuel(&self) -> &VertexGrid<f32> {
        &self.fuel
    }

    pub fn min_burn_heat(&self) -> &VertexGrid<f32> {
        &self.min_burn_heat
    }

    pub fn can_burn(&self) -> &VertexGrid<bool> {
        &self.can_burn
    }

    pub fn is_burning(&self) -> &VertexGrid<bool> {
        &self.is_burning
    }

    pub fn is_charred(&self) -> &VertexGrid<bool> {
        &self.is_charred
    }

    pub fn original_color(&self) -> &VertexGrid<VertexColor> {
        &self.original_color
    }

    /// True once the cell's appearance changed and has not been queued since.
    pub fn altered(&self) -> bool {
        self.altered
    }

    /// Take and clear the altered flag.
    pub(crate) fn take_altered(&mut self) -> bool {
        std::mem::take(&mut self.altered)
    }

    pub fn burning_count(&self) -> usize {
        self.is_burning.iter().filter(|b| **b).count()
    }

    /// True while any vertex burns or still holds heat.
    pub fn is_active(&self) -> bool {
        self.is_burning.iter().any(|b| *b) || self.heat.iter().any(|h| *h > 0.0)
    }

    /// Write the snapshot colors back to the world.
    pub(crate) fn restore_colors(&self, cell: CellId, world: &dyn WorldQuery) {
        write_colors(cell, world, &self.original_color);
    }

    /// What must outlive eviction, or `None` if nothing has charred.
    pub(crate) fn scar(&self) -> Option<CharredScar> {
        self.is_charred.iter().any(|c| *c).then(|| CharredScar {
            is_charred: self.is_charred.clone(),
            original_color: self.original_color.clone(),
        })
    }

    /// Re-apply a scar to state freshly built from the world.
    pub(crate) fn apply_scar(&mut self, scar: &CharredScar) {
        for ((q, v), charred) in scar.is_charred.indexed() {
            if *charred {
                self.is_charred[(q, v)] = true;
                self.is_burning[(q, v)] = false;
                self.fuel[(q, v)] = 0.0;
                self.heat[(q, v)] = 0.0;
            }
        }
        self.original_color = scar.original_color.clone();
    }
}

/// Burnt-out vertices and pre-fire colors of an evicted cell
///
/// Charring is terminal, but an evicted cell is rebuilt from the world's
/// vegetation, which still carries fuel. The store keeps this record so the
/// rebuilt state stays burnt and a reset still restores the pre-fire tint.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CharredScar {
    is_charred: VertexGrid<bool>,
    original_color: VertexGrid<VertexColor>,
}

impl CharredScar {
    pub(crate) fn restore_colors(&self, cell: CellId, world: &dyn WorldQuery) {
        write_colors(cell, world, &self.original_color);
    }
}

fn write_colors(cell: CellId, world: &dyn WorldQuery, colors: &VertexGrid<VertexColor>) {
    for q in 0..QUADRANTS_PER_CELL {
        for v in 0..VERTS_PER_QUADRANT {
            world.set_color(cell, q, v, colors[(q, v)]);
        }
    }
}
