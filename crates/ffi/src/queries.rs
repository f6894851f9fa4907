use wildfire_core::core_types::{QUADRANTS_PER_CELL, VERTS_PER_QUADRANT};
use wildfire_core::{CellId, FireVertex, VertexPhase, VertexState};

use crate::error::{DefaultWildfireError, WildfireErrorCode};
use crate::helpers::{track_error, with_instance};
use crate::host::WildfireColor;
use crate::instance::WildfireInstance;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildfirePhase {
    /// Nothing to burn
    Inert = 0,
    Unburnt = 1,
    /// Heated but not yet burning
    PreIgnition = 2,
    Burning = 3,
    Charred = 4,
}

impl From<VertexPhase> for WildfirePhase {
    fn from(phase: VertexPhase) -> Self {
        match phase {
            VertexPhase::Inert => Self::Inert,
            VertexPhase::Unburnt => Self::Unburnt,
            VertexPhase::PreIgnition => Self::PreIgnition,
            VertexPhase::Burning => Self::Burning,
            VertexPhase::Charred => Self::Charred,
        }
    }
}

/// FFI snapshot of one vertex. Keep this layout stable for C/C++/C# consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WildfireVertexState {
    pub heat: f32,
    pub fuel: f32,
    pub min_burn_heat: f32,
    pub can_burn: bool,
    pub is_burning: bool,
    pub is_charred: bool,
    pub phase: WildfirePhase,
    /// Tint the vertex had before the fire touched it
    pub original_color: WildfireColor,
}

impl From<VertexState> for WildfireVertexState {
    fn from(state: VertexState) -> Self {
        Self {
            heat: state.heat,
            fuel: state.fuel,
            min_burn_heat: state.min_burn_heat,
            can_burn: state.can_burn,
            is_burning: state.is_burning,
            is_charred: state.is_charred,
            phase: state.phase().into(),
            original_color: state.original_color.into(),
        }
    }
}

/// Whether a cell's appearance changed since it was last regenerated.
///
/// Starts tracking the cell if it was not tracked.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_altered` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_is_cell_altered(
    ptr: *const WildfireInstance,
    cell: u64,
    out_altered: *mut bool,
) -> WildfireErrorCode {
    if out_altered.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("out_altered"));
    }
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            out_altered.write(instance.engine.is_cell_altered(CellId(cell)));
            Ok(())
        })
    }
}

/// Read one vertex's fire state.
///
/// `out_found` receives false, and `out_state` is left untouched, when the
/// cell is not tracked. `quadrant` must be below 4 and `vertex` below 289.
///
/// # Safety
/// `ptr` must be null or a live instance; `out_state` and `out_found` must be
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wildfire_get_vertex_state(
    ptr: *const WildfireInstance,
    cell: u64,
    quadrant: u32,
    vertex: u32,
    out_state: *mut WildfireVertexState,
    out_found: *mut bool,
) -> WildfireErrorCode {
    if out_state.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("out_state"));
    }
    if out_found.is_null() {
        return track_error(&DefaultWildfireError::null_pointer("out_found"));
    }
    let (quadrant, vertex) = (quadrant as usize, vertex as usize);
    if quadrant >= QUADRANTS_PER_CELL || vertex >= VERTS_PER_QUADRANT {
        return track_error(&DefaultWildfireError::invalid_parameter(format!(
            "vertex ({quadrant}, {vertex}) out of range"
        )));
    }

    let address = FireVertex::new(CellId(cell), quadrant, vertex);
    // SAFETY: forwarded caller contract.
    unsafe {
        with_instance(ptr, |instance| {
            let state = instance.engine.vertex_state(address);
            out_found.write(state.is_some());
            if let Some(state) = state {
                out_state.write(state.into());
            }
            Ok(())
        })
    }
}
