//! Host callback table and its adapter onto the core collaborator traits.

use std::ffi::c_void;

use tracing::warn;
use wildfire_core::{
    CellId, Environment, FireVertex, Flammability, HazardSink, RegenerationSink, Vec3, VertexColor,
    VertexTextures, WindSample, WorldQuery,
};
use wildfire_core::world::TextureLayer;

use crate::error::DefaultWildfireError;

/// Texture layers a host can report for one vertex.
pub const WILDFIRE_MAX_TEXTURE_LAYERS: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WildfireColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<VertexColor> for WildfireColor {
    fn from(color: VertexColor) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

impl From<WildfireColor> for VertexColor {
    fn from(color: WildfireColor) -> Self {
        VertexColor::new(color.r, color.g, color.b)
    }
}

/// Fire properties of one texture.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WildfireFlammability {
    pub can_burn: bool,
    pub fuel: f32,
    pub min_burn_heat: f32,
}

impl From<WildfireFlammability> for Flammability {
    fn from(value: WildfireFlammability) -> Self {
        Flammability {
            can_burn: value.can_burn,
            fuel: value.fuel,
            min_burn_heat: value.min_burn_heat,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WildfireTextureLayer {
    /// Share of the vertex covered, in percent
    pub coverage_percent: f32,
    /// False when the texture has no flammability entry
    pub has_flammability: bool,
    pub flammability: WildfireFlammability,
}

/// Textures painted on one vertex, filled in by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WildfireVertexTextures {
    pub layers: [WildfireTextureLayer; WILDFIRE_MAX_TEXTURE_LAYERS],
    /// Number of valid entries in `layers`
    pub layer_count: u32,
    pub has_default_texture: bool,
    pub default_texture: WildfireFlammability,
}

impl From<&WildfireVertexTextures> for VertexTextures {
    fn from(raw: &WildfireVertexTextures) -> Self {
        let count = (raw.layer_count as usize).min(WILDFIRE_MAX_TEXTURE_LAYERS);
        VertexTextures {
            layers: raw.layers[..count]
                .iter()
                .map(|layer| TextureLayer {
                    coverage_percent: layer.coverage_percent,
                    flammability: layer.has_flammability.then_some(layer.flammability.into()),
                })
                .collect(),
            default_texture: raw.has_default_texture.then_some(raw.default_texture.into()),
        }
    }
}

/// Callbacks into the host world.
///
/// Every callback receives `user_data` unchanged as its first argument.
/// The world callbacks (`cell_at` through `set_color`) are required; the
/// weather and notification callbacks may be null, in which case the
/// simulation sees calm dry weather and notifications are dropped.
///
/// Callbacks are invoked from the simulation's worker threads, concurrently
/// and for different cells at the same time. They must not call back into
/// the `wildfire_*` API.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct WildfireHostCallbacks {
    pub user_data: *mut c_void,

    /// Loaded cell containing a world position. Returns false if none.
    pub cell_at: Option<
        unsafe extern "C" fn(user_data: *mut c_void, x: f32, y: f32, z: f32, out_cell: *mut u64) -> bool,
    >,
    /// Grid coordinates of a cell.
    pub coordinates: Option<
        unsafe extern "C" fn(user_data: *mut c_void, cell: u64, out_x: *mut i32, out_y: *mut i32),
    >,
    /// Loaded cell at grid coordinates. Returns false if none.
    pub cell_at_coords: Option<
        unsafe extern "C" fn(user_data: *mut c_void, cell_x: i32, cell_y: i32, out_cell: *mut u64) -> bool,
    >,
    /// Terrain height at a world position. Returns false where no land is loaded.
    pub land_height: Option<
        unsafe extern "C" fn(user_data: *mut c_void, x: f32, y: f32, z: f32, out_height: *mut f32) -> bool,
    >,
    /// Texture coverage of one vertex. `out` arrives zeroed.
    pub vertex_textures: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            cell: u64,
            quadrant: u32,
            vertex: u32,
            out: *mut WildfireVertexTextures,
        ),
    >,
    /// Current tint of a vertex. Returns false if the cell has no color data.
    pub get_color: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            cell: u64,
            quadrant: u32,
            vertex: u32,
            out_color: *mut WildfireColor,
        ) -> bool,
    >,
    pub set_color: Option<
        unsafe extern "C" fn(user_data: *mut c_void, cell: u64, quadrant: u32, vertex: u32, color: WildfireColor),
    >,

    /// Wind speed (`0..=255`) and direction (256 steps per turn).
    pub current_wind: Option<
        unsafe extern "C" fn(user_data: *mut c_void, out_speed: *mut u8, out_direction: *mut u8),
    >,
    pub is_raining: Option<unsafe extern "C" fn(user_data: *mut c_void) -> bool>,
    /// A vertex ignited and can burn for `lifetime` seconds.
    pub on_ignite: Option<
        unsafe extern "C" fn(user_data: *mut c_void, cell: u64, quadrant: u32, vertex: u32, lifetime: f32),
    >,
    /// Cells whose vegetation should be rebuilt.
    pub regenerate: Option<unsafe extern "C" fn(user_data: *mut c_void, cells: *const u64, count: usize)>,
}

type CellAtFn = unsafe extern "C" fn(*mut c_void, f32, f32, f32, *mut u64) -> bool;
type CoordinatesFn = unsafe extern "C" fn(*mut c_void, u64, *mut i32, *mut i32);
type CellAtCoordsFn = unsafe extern "C" fn(*mut c_void, i32, i32, *mut u64) -> bool;
type LandHeightFn = unsafe extern "C" fn(*mut c_void, f32, f32, f32, *mut f32) -> bool;
type VertexTexturesFn = unsafe extern "C" fn(*mut c_void, u64, u32, u32, *mut WildfireVertexTextures);
type GetColorFn = unsafe extern "C" fn(*mut c_void, u64, u32, u32, *mut WildfireColor) -> bool;
type SetColorFn = unsafe extern "C" fn(*mut c_void, u64, u32, u32, WildfireColor);

/// [`WildfireHostCallbacks`] with the required callbacks checked present.
pub(crate) struct HostAdapter {
    user_data: *mut c_void,
    cell_at: CellAtFn,
    coordinates: CoordinatesFn,
    cell_at_coords: CellAtCoordsFn,
    land_height: LandHeightFn,
    vertex_textures: VertexTexturesFn,
    get_color: GetColorFn,
    set_color: SetColorFn,
    optional: WildfireHostCallbacks,
}

// SAFETY: the host promises in `wildfire_new`'s contract that `user_data` and every
// callback may be used from any thread concurrently. The adapter never dereferences
// `user_data` itself.
unsafe impl Send for HostAdapter {}
// SAFETY: see `Send`; all access goes through the host's thread-safe callbacks.
unsafe impl Sync for HostAdapter {}

impl HostAdapter {
    pub(crate) fn new(callbacks: &WildfireHostCallbacks) -> Result<Self, DefaultWildfireError> {
        fn required<T>(callback: Option<T>, name: &str) -> Result<T, DefaultWildfireError> {
            callback.ok_or_else(|| DefaultWildfireError::missing_callback(name))
        }

        Ok(Self {
            user_data: callbacks.user_data,
            cell_at: required(callbacks.cell_at, "cell_at")?,
            coordinates: required(callbacks.coordinates, "coordinates")?,
            cell_at_coords: required(callbacks.cell_at_coords, "cell_at_coords")?,
            land_height: required(callbacks.land_height, "land_height")?,
            vertex_textures: required(callbacks.vertex_textures, "vertex_textures")?,
            get_color: required(callbacks.get_color, "get_color")?,
            set_color: required(callbacks.set_color, "set_color")?,
            optional: *callbacks,
        })
    }
}

impl WorldQuery for HostAdapter {
    fn cell_at(&self, pos: &Vec3) -> Option<CellId> {
        let mut cell = 0;
        // SAFETY: host callback contract; `cell` is a valid local.
        unsafe { (self.cell_at)(self.user_data, pos.x, pos.y, pos.z, &mut cell) }.then_some(CellId(cell))
    }

    fn coordinates(&self, cell: CellId) -> (i32, i32) {
        let (mut x, mut y) = (0, 0);
        // SAFETY: host callback contract; outputs are valid locals.
        unsafe { (self.coordinates)(self.user_data, cell.0, &mut x, &mut y) };
        (x, y)
    }

    fn cell_at_coords(&self, cell_x: i32, cell_y: i32) -> Option<CellId> {
        let mut cell = 0;
        // SAFETY: host callback contract; `cell` is a valid local.
        unsafe { (self.cell_at_coords)(self.user_data, cell_x, cell_y, &mut cell) }.then_some(CellId(cell))
    }

    fn land_height(&self, pos: &Vec3) -> Option<f32> {
        let mut height = 0.0;
        // SAFETY: host callback contract; `height` is a valid local.
        unsafe { (self.land_height)(self.user_data, pos.x, pos.y, pos.z, &mut height) }.then_some(height)
    }

    fn vertex_textures(&self, cell: CellId, quadrant: usize, vertex: usize) -> VertexTextures {
        let mut raw = WildfireVertexTextures::default();
        // SAFETY: host callback contract; `raw` is a valid local.
        unsafe { (self.vertex_textures)(self.user_data, cell.0, quadrant as u32, vertex as u32, &mut raw) };
        if raw.layer_count as usize > WILDFIRE_MAX_TEXTURE_LAYERS {
            warn!(
                "{cell} reported {} texture layers, only {WILDFIRE_MAX_TEXTURE_LAYERS} are read",
                raw.layer_count
            );
        }
        VertexTextures::from(&raw)
    }

    fn color(&self, cell: CellId, quadrant: usize, vertex: usize) -> Option<VertexColor> {
        let mut color = WildfireColor::default();
        // SAFETY: host callback contract; `color` is a valid local.
        unsafe { (self.get_color)(self.user_data, cell.0, quadrant as u32, vertex as u32, &mut color) }
            .then_some(color.into())
    }

    fn set_color(&self, cell: CellId, quadrant: usize, vertex: usize, color: VertexColor) {
        // SAFETY: host callback contract.
        unsafe { (self.set_color)(self.user_data, cell.0, quadrant as u32, vertex as u32, color.into()) };
    }
}

impl Environment for HostAdapter {
    fn current_wind(&self) -> WindSample {
        let Some(callback) = self.optional.current_wind else {
            return WindSample::CALM;
        };
        let (mut speed, mut direction) = (0, 0);
        // SAFETY: host callback contract; outputs are valid locals.
        unsafe { callback(self.user_data, &mut speed, &mut direction) };
        WindSample::new(speed, direction)
    }

    fn is_raining(&self) -> bool {
        // SAFETY: host callback contract.
        self.optional
            .is_raining
            .is_some_and(|callback| unsafe { callback(self.user_data) })
    }
}

impl HazardSink for HostAdapter {
    fn on_ignite(&self, vertex: FireVertex, lifetime: f32) {
        if let Some(callback) = self.optional.on_ignite {
            // SAFETY: host callback contract.
            unsafe {
                callback(
                    self.user_data,
                    vertex.cell.0,
                    u32::from(vertex.quadrant),
                    u32::from(vertex.vertex),
                    lifetime,
                );
            }
        }
    }
}

impl RegenerationSink for HostAdapter {
    fn regenerate(&self, cells: &[CellId]) {
        if let Some(callback) = self.optional.regenerate {
            let raw: Vec<u64> = cells.iter().map(|cell| cell.0).collect();
            // SAFETY: host callback contract; `raw` outlives the call.
            unsafe { callback(self.user_data, raw.as_ptr(), raw.len()) };
        }
    }
}
