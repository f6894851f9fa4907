//! In-memory host world
//!
//! `FlatWorld` implements every collaborator trait over a rectangular block of
//! loaded cells with constant terrain height. Vegetation is painted per vertex
//! (or scattered with a seeded RNG), weather is set directly, and ignition
//! and regeneration notifications are recorded for inspection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use super::{
    Environment, Flammability, HazardSink, RegenerationSink, VertexTextures, WorldQuery,
};
use crate::core_types::{
    CellId, FireVertex, Vec3, VertexColor, VertexGrid, WindSample, CELL_SPAN, QUADRANTS_PER_CELL,
    VERTS_PER_QUADRANT,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rectangular block of loaded cells on flat ground
pub struct FlatWorld {
    min_cell: (i32, i32),
    max_cell: (i32, i32),
    height: f32,
    base_color: VertexColor,
    ground: VertexTextures,
    vegetation: RwLock<FxHashMap<FireVertex, VertexTextures>>,
    colors: Mutex<FxHashMap<CellId, VertexGrid<VertexColor>>>,
    wind: Mutex<WindSample>,
    raining: AtomicBool,
    ignitions: Mutex<Vec<(FireVertex, f32)>>,
    regenerated: Mutex<Vec<CellId>>,
}

impl FlatWorld {
    /// World with cells `min_cell..=max_cell` loaded, bare ground, calm and dry.
    #[must_use]
    pub fn new(min_cell: (i32, i32), max_cell: (i32, i32)) -> Self {
        assert!(
            min_cell.0 <= max_cell.0 && min_cell.1 <= max_cell.1,
            "empty cell range"
        );
        Self {
            min_cell,
            max_cell,
            height: 0.0,
            base_color: VertexColor::WHITE,
            ground: VertexTextures::default(),
            vegetation: RwLock::new(FxHashMap::default()),
            colors: Mutex::new(FxHashMap::default()),
            wind: Mutex::new(WindSample::CALM),
            raining: AtomicBool::new(false),
            ignitions: Mutex::new(Vec::new()),
            regenerated: Mutex::new(Vec::new()),
        }
    }

    /// Single loaded cell at `(0, 0)`.
    #[must_use]
    pub fn single_cell() -> Self {
        Self::new((0, 0), (0, 0))
    }

    #[must_use]
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_base_color(mut self, color: VertexColor) -> Self {
        self.base_color = color;
        self
    }

    /// Textures of every vertex without explicit vegetation.
    #[must_use]
    pub fn with_ground(mut self, ground: VertexTextures) -> Self {
        self.ground = ground;
        self
    }

    /// Identity of the cell at grid coordinates (whether loaded or not).
    #[must_use]
    pub fn cell_id(cell_x: i32, cell_y: i32) -> CellId {
        CellId((u64::from(cell_x as u32) << 32) | u64::from(cell_y as u32))
    }

    fn decode(cell: CellId) -> (i32, i32) {
        ((cell.0 >> 32) as u32 as i32, cell.0 as u32 as i32)
    }

    fn is_loaded(&self, (cell_x, cell_y): (i32, i32)) -> bool {
        (self.min_cell.0..=self.max_cell.0).contains(&cell_x)
            && (self.min_cell.1..=self.max_cell.1).contains(&cell_y)
    }

    /// Every loaded cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        (self.min_cell.1..=self.max_cell.1).flat_map(move |y| {
            (self.min_cell.0..=self.max_cell.0).map(move |x| Self::cell_id(x, y))
        })
    }

    /// Paint explicit textures on one vertex.
    pub fn set_vegetation(&self, vertex: FireVertex, textures: VertexTextures) {
        self.vegetation
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(vertex, textures);
    }

    /// Cover one vertex entirely with a single flammable texture.
    pub fn plant(&self, vertex: FireVertex, flammability: Flammability) {
        self.set_vegetation(vertex, VertexTextures::single(flammability));
    }

    /// Cover every vertex of a cell with a single texture.
    pub fn plant_cell(&self, cell: CellId, flammability: Flammability) {
        let mut vegetation = self.vegetation.write().unwrap_or_else(PoisonError::into_inner);
        for q in 0..QUADRANTS_PER_CELL {
            for v in 0..VERTS_PER_QUADRANT {
                vegetation.insert(FireVertex::new(cell, q, v), VertexTextures::single(flammability));
            }
        }
    }

    /// Plant `flammability` on a random share `density` of all loaded vertices.
    ///
    /// The layout depends only on `seed`. Returns the number of planted vertices.
    pub fn scatter_vegetation(&self, seed: u64, density: f32, flammability: Flammability) -> usize {
        let mut rng = StdRng::seed_from_u64(seed);
        let density = f64::from(density.clamp(0.0, 1.0));
        let cells: Vec<CellId> = self.cells().collect();
        let mut vegetation = self.vegetation.write().unwrap_or_else(PoisonError::into_inner);
        let mut planted = 0;

        for cell in cells {
            for q in 0..QUADRANTS_PER_CELL {
                for v in 0..VERTS_PER_QUADRANT {
                    if rng.random_bool(density) {
                        vegetation
                            .insert(FireVertex::new(cell, q, v), VertexTextures::single(flammability));
                        planted += 1;
                    }
                }
            }
        }
        planted
    }

    pub fn set_wind(&self, wind: WindSample) {
        *lock(&self.wind) = wind;
    }

    pub fn set_raining(&self, raining: bool) {
        self.raining.store(raining, Ordering::Relaxed);
    }

    /// Ignitions reported so far, in notification order.
    #[must_use]
    pub fn ignitions(&self) -> Vec<(FireVertex, f32)> {
        lock(&self.ignitions).clone()
    }

    /// Cells handed over for regeneration so far.
    #[must_use]
    pub fn regenerated(&self) -> Vec<CellId> {
        lock(&self.regenerated).clone()
    }

    /// Copy of the current vertex colors of a loaded cell.
    #[must_use]
    pub fn colors_of(&self, cell: CellId) -> Option<VertexGrid<VertexColor>> {
        if !self.is_loaded(Self::decode(cell)) {
            return None;
        }
        Some(
            lock(&self.colors)
                .get(&cell)
                .cloned()
                .unwrap_or_else(|| VertexGrid::filled(self.base_color)),
        )
    }
}

impl WorldQuery for FlatWorld {
    fn cell_at(&self, pos: &Vec3) -> Option<CellId> {
        let coords = (
            (pos.x / CELL_SPAN).floor() as i32,
            (pos.y / CELL_SPAN).floor() as i32,
        );
        self.is_loaded(coords).then(|| Self::cell_id(coords.0, coords.1))
    }

    fn coordinates(&self, cell: CellId) -> (i32, i32) {
        Self::decode(cell)
    }

    fn cell_at_coords(&self, cell_x: i32, cell_y: i32) -> Option<CellId> {
        self.is_loaded((cell_x, cell_y))
            .then(|| Self::cell_id(cell_x, cell_y))
    }

    fn land_height(&self, pos: &Vec3) -> Option<f32> {
        self.cell_at(pos).map(|_| self.height)
    }

    fn vertex_textures(&self, cell: CellId, quadrant: usize, vertex: usize) -> VertexTextures {
        let key = FireVertex::new(cell, quadrant, vertex);
        self.vegetation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.ground.clone())
    }

    fn color(&self, cell: CellId, quadrant: usize, vertex: usize) -> Option<VertexColor> {
        if !self.is_loaded(Self::decode(cell)) {
            return None;
        }
        Some(
            lock(&self.colors)
                .get(&cell)
                .map_or(self.base_color, |grid| *grid.get(quadrant, vertex)),
        )
    }

    fn set_color(&self, cell: CellId, quadrant: usize, vertex: usize, color: VertexColor) {
        if !self.is_loaded(Self::decode(cell)) {
            return;
        }
        let base = self.base_color;
        *lock(&self.colors)
            .entry(cell)
            .or_insert_with(|| VertexGrid::filled(base))
            .get_mut(quadrant, vertex) = color;
    }
}

impl Environment for FlatWorld {
    fn current_wind(&self) -> WindSample {
        *lock(&self.wind)
    }

    fn is_raining(&self) -> bool {
        self.raining.load(Ordering::Relaxed)
    }
}

impl HazardSink for FlatWorld {
    fn on_ignite(&self, vertex: FireVertex, lifetime: f32) {
        lock(&self.ignitions).push((vertex, lifetime));
    }
}

impl RegenerationSink for FlatWorld {
    fn regenerate(&self, cells: &[CellId]) {
        lock(&self.regenerated).extend_from_slice(cells);
    }
}
