//! Wildfire Simulation Core Library
//!
//! Fire spread over a vertex-grid terrain. The world is tiled into cells of
//! 4096 x 4096 units; each cell splits into four quadrants carrying a 17 x 17
//! grid of vertices, and every vertex holds heat, fuel and a burn state.
//! Burning vertices share heat with their eight neighbours (biased by wind,
//! damped by rain), consume fuel and eventually char. External impacts heat
//! or cool vertices around a point.
//!
//! ## Layout
//!
//! - [`core_types`]: cell and vertex identities, per-vertex grids, colors, wind
//! - [`grid`]: position/vertex addressing, neighbour stitching, wind weights
//! - [`state`]: per-cell fire state and its concurrent store
//! - [`simulation`]: spread physics, impacts, scheduler and the [`FireEngine`]
//! - [`world`]: the host collaborator traits and an in-memory world
//!
//! The engine never talks to a game directly. Hosts implement
//! [`WorldQuery`], [`Environment`], [`HazardSink`] and [`RegenerationSink`]
//! and hand them to [`FireEngine::new`].

pub mod core_types;
pub mod error;
pub mod grid;
pub mod settings;
pub mod simulation;
pub mod state;
pub mod world;

pub use core_types::{CellId, FireVertex, Vec3, VertexColor, VertexGrid, WindSample};
pub use error::WildfireError;
pub use settings::FireSettings;
pub use simulation::{FireEngine, ImpactClassifier, ImpactKind, TickSummary};
pub use state::{FireCellState, VertexPhase, VertexState};
pub use world::{
    Collaborators, Environment, Flammability, FlammabilityTable, FlatWorld, HazardSink,
    RegenerationSink, VertexTextures, WorldQuery,
};
