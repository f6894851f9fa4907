//! C ABI for the wildfire simulation.
//!
//! A host creates an instance with `wildfire_new`, passing a table of
//! callbacks through which the simulation reads terrain, textures, colors and
//! weather, and reports ignitions and cells to regenerate. Every function
//! returns a `WildfireErrorCode`; details of the last failure on the calling
//! thread are available from `wildfire_get_last_error`.

mod error;
mod helpers;
mod host;
mod instance;
mod queries;
mod settings;
mod simulation;

pub use error::{wildfire_get_last_error, wildfire_get_last_error_code, WildfireErrorCode};
pub use host::{
    WildfireColor, WildfireFlammability, WildfireHostCallbacks, WildfireTextureLayer,
    WildfireVertexTextures, WILDFIRE_MAX_TEXTURE_LAYERS,
};
pub use instance::{wildfire_destroy, wildfire_new, WildfireInstance};
pub use queries::{
    wildfire_get_vertex_state, wildfire_is_cell_altered, WildfirePhase, WildfireVertexState,
};
pub use settings::{
    wildfire_default_settings, wildfire_get_settings, wildfire_set_settings, WildfireSettings,
};
pub use simulation::{
    wildfire_add_fire_event, wildfire_add_impact, wildfire_regenerate_dirty, wildfire_reset_all,
    wildfire_reset_cell, wildfire_set_impact_patterns, wildfire_tick, wildfire_update,
    WildfireTickSummary,
};
