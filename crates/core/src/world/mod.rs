//! Host collaborator boundary
//!
//! The simulation never talks to a game engine directly. Everything it needs
//! from the outside world (cell lookup, terrain height, texture coverage,
//! vertex colors, weather) and everything it reports back (ignitions, cells
//! needing regeneration) goes through the traits in this module. Hosts
//! implement them as thin adapters; [`FlatWorld`] is an in-memory
//! implementation used by tests and headless tools.

pub mod flammability;
pub mod flat;

pub use flammability::{
    blend_vertex_flammability, Flammability, FlammabilityTable, GrassFireConfig, TextureLayer,
    VertexTextures,
};
pub use flat::FlatWorld;

use std::sync::Arc;

use crate::core_types::{CellId, FireVertex, Vec3, VertexColor, WindSample};

/// Terrain and cell queries answered by the host world.
///
/// Implementations are called from worker threads and must be cheap: the
/// spread pass calls `set_color` for every vertex whose tint changes.
pub trait WorldQuery: Send + Sync {
    /// Loaded cell containing the world position, if any.
    fn cell_at(&self, pos: &Vec3) -> Option<CellId>;

    /// Grid coordinates `(cell_x, cell_y)` of a cell.
    fn coordinates(&self, cell: CellId) -> (i32, i32);

    /// Loaded cell at grid coordinates, if any.
    fn cell_at_coords(&self, cell_x: i32, cell_y: i32) -> Option<CellId>;

    /// Terrain height at a world position, `None` where no land data is loaded.
    fn land_height(&self, pos: &Vec3) -> Option<f32>;

    /// Texture coverage of one vertex, with each texture's flammability resolved.
    fn vertex_textures(&self, cell: CellId, quadrant: usize, vertex: usize) -> VertexTextures;

    /// Current terrain tint of a vertex, `None` if the cell has no color data.
    fn color(&self, cell: CellId, quadrant: usize, vertex: usize) -> Option<VertexColor>;

    /// Overwrite the terrain tint of a vertex.
    fn set_color(&self, cell: CellId, quadrant: usize, vertex: usize, color: VertexColor);
}

/// Current weather, sampled once per cell task.
pub trait Environment: Send + Sync {
    fn current_wind(&self) -> WindSample;

    /// True for rain and snow.
    fn is_raining(&self) -> bool;
}

/// Receives a notification each time a vertex ignites.
///
/// Called while the vertex's cell is locked; implementations must not call
/// back into the engine.
pub trait HazardSink: Send + Sync {
    /// `lifetime` is the number of seconds the vertex can burn on its fuel.
    fn on_ignite(&self, vertex: FireVertex, lifetime: f32);
}

/// Rebuilds vegetation for cells whose appearance changed.
pub trait RegenerationSink: Send + Sync {
    fn regenerate(&self, cells: &[CellId]);
}

/// Sink that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl HazardSink for NoopSink {
    fn on_ignite(&self, _vertex: FireVertex, _lifetime: f32) {}
}

impl RegenerationSink for NoopSink {
    fn regenerate(&self, _cells: &[CellId]) {}
}

/// Handles to every host collaborator the engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub world: Arc<dyn WorldQuery>,
    pub environment: Arc<dyn Environment>,
    pub hazards: Arc<dyn HazardSink>,
    pub regeneration: Arc<dyn RegenerationSink>,
}

impl Collaborators {
    #[must_use]
    pub fn new(
        world: Arc<dyn WorldQuery>,
        environment: Arc<dyn Environment>,
        hazards: Arc<dyn HazardSink>,
        regeneration: Arc<dyn RegenerationSink>,
    ) -> Self {
        Self {
            world,
            environment,
            hazards,
            regeneration,
        }
    }

    /// Use one object for every role.
    #[must_use]
    pub fn from_host<H>(host: &Arc<H>) -> Self
    where
        H: WorldQuery + Environment + HazardSink + RegenerationSink + 'static,
    {
        Self {
            world: host.clone(),
            environment: host.clone(),
            hazards: host.clone(),
            regeneration: host.clone(),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
