//! Concurrent owner of every tracked cell's fire state
//!
//! The map itself sits behind a reader/writer lock; each cell sits behind its
//! own mutex so cell tasks running on different workers never contend. Lookups
//! take the reader lock; creating or removing an entry takes the writer lock
//! briefly. A cell's state is built from the world outside of any map lock.
//!
//! A slot removed from the map (reset or evicted) is marked retired while its
//! lock is held. Anyone who fetched the slot earlier sees the mark once they
//! lock it and must not touch the state or the world through it.
//!
//! Lock order: map, then scars, then a cell. A cell lock is only taken
//! without blocking while the map lock is held.

use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::{CharredScar, FireCellState};
use crate::core_types::CellId;
use crate::settings::FireSettings;
use crate::world::WorldQuery;

/// One tracked cell: its state plus LRU bookkeeping
#[derive(Debug)]
pub struct CellSlot {
    state: Mutex<FireCellState>,
    last_active: AtomicU64,
    retired: AtomicBool,
}

impl CellSlot {
    fn new(state: FireCellState, tick: u64) -> Self {
        Self {
            state: Mutex::new(state),
            last_active: AtomicU64::new(tick),
            retired: AtomicBool::new(false),
        }
    }

    /// Lock the cell's state.
    ///
    /// A worker that panicked mid-update leaves the state usable (every field
    /// is valid on its own), so poisoning is logged and ignored.
    pub fn lock(&self) -> MutexGuard<'_, FireCellState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Cell state lock poisoned, continuing with inner state");
            poisoned.into_inner()
        })
    }

    /// Lock the cell's state only if no one else holds it.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, FireCellState>> {
        match self.state.try_lock() {
            Ok(guard) => Some(guard),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(std::sync::TryLockError::WouldBlock) => None,
        }
    }

    /// True once the slot left the store. Stable once observed under the lock.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Call with the slot's lock held.
    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// Tick of the last burn or damage on this cell.
    pub fn last_active(&self) -> u64 {
        self.last_active.load(Ordering::Relaxed)
    }

    fn touch(&self, tick: u64) {
        self.last_active.fetch_max(tick, Ordering::Relaxed);
    }
}

/// Map from cell identity to shared cell state
#[derive(Debug, Default)]
pub struct CellStateStore {
    cells: RwLock<FxHashMap<CellId, Arc<CellSlot>>>,
    /// Charred vertices of evicted cells, re-applied when they come back
    scars: Mutex<FxHashMap<CellId, CharredScar>>,
    clock: AtomicU64,
}

impl CellStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<CellId, Arc<CellSlot>>> {
        self.cells.read().unwrap_or_else(|poisoned| {
            warn!("Cell map lock poisoned, continuing with inner map");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<CellId, Arc<CellSlot>>> {
        self.cells.write().unwrap_or_else(|poisoned| {
            warn!("Cell map lock poisoned, continuing with inner map");
            poisoned.into_inner()
        })
    }

    fn scars(&self) -> MutexGuard<'_, FxHashMap<CellId, CharredScar>> {
        self.scars.lock().unwrap_or_else(|poisoned| {
            warn!("Scar map lock poisoned, continuing with inner map");
            poisoned.into_inner()
        })
    }

    /// Advance the activity clock by one scheduler tick and return the new value.
    pub fn advance_clock(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn clock(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Mark a cell as active at the current clock value.
    pub fn touch(&self, slot: &CellSlot) {
        slot.touch(self.clock());
    }

    /// Shared state of a tracked cell.
    pub fn get(&self, cell: CellId) -> Option<Arc<CellSlot>> {
        self.read().get(&cell).cloned()
    }

    /// Shared state of `cell`, creating it from the world on first reference.
    ///
    /// Concurrent creators of the same cell race benignly: the first insert
    /// wins and later builders drop their copy. A cell evicted with charred
    /// vertices comes back with them still charred.
    pub fn get_or_create(
        &self,
        cell: CellId,
        world: &dyn WorldQuery,
        settings: &FireSettings,
    ) -> Arc<CellSlot> {
        if let Some(slot) = self.get(cell) {
            return slot;
        }

        let mut built = FireCellState::from_world(cell, world, settings);
        let tick = self.clock();
        let mut map = self.write();
        match map.entry(cell) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                if let Some(scar) = self.scars().remove(&cell) {
                    built.apply_scar(&scar);
                    debug!("Restored charred vertices of {cell}");
                }
                entry.insert(Arc::new(CellSlot::new(built, tick))).clone()
            }
        }
    }

    /// Run `f` on `cell`'s locked state, creating the cell if needed.
    ///
    /// Retries if the slot is reset or evicted between lookup and locking, so
    /// `f` always sees the live state. Marks the cell active afterwards.
    pub fn with_cell<R>(
        &self,
        cell: CellId,
        world: &dyn WorldQuery,
        settings: &FireSettings,
        f: impl FnOnce(&mut FireCellState) -> R,
    ) -> R {
        loop {
            let slot = self.get_or_create(cell, world, settings);
            let mut state = slot.lock();
            if slot.is_retired() {
                continue;
            }
            let result = f(&mut state);
            drop(state);
            self.touch(&slot);
            return result;
        }
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.read().contains_key(&cell)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Evicted cells whose charred vertices are remembered.
    pub fn scarred_len(&self) -> usize {
        self.scars().len()
    }

    /// Identities of every tracked cell, in no particular order.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.read().keys().copied().collect()
    }

    /// Every tracked cell with its shared state.
    pub fn slots(&self) -> Vec<(CellId, Arc<CellSlot>)> {
        self.read()
            .iter()
            .map(|(cell, slot)| (*cell, slot.clone()))
            .collect()
    }

    /// Deep copy of every tracked cell's state.
    ///
    /// Cells are locked one at a time, so the copy is consistent per cell but
    /// not across cells.
    pub fn snapshot(&self) -> FxHashMap<CellId, FireCellState> {
        self.slots()
            .into_iter()
            .map(|(cell, slot)| {
                let state = slot.lock().clone();
                (cell, state)
            })
            .collect()
    }

    /// Restore `cell`'s original colors to the world and forget its fire
    /// state, including charring remembered across eviction.
    ///
    /// Returns false if the cell had no state.
    pub fn reset(&self, cell: CellId, world: &dyn WorldQuery) -> bool {
        let (slot, scar) = {
            let mut map = self.write();
            (map.remove(&cell), self.scars().remove(&cell))
        };

        if let Some(slot) = slot {
            let state = slot.lock();
            slot.retire();
            state.restore_colors(cell, world);
        } else if let Some(scar) = scar {
            scar.restore_colors(cell, world);
        } else {
            return false;
        }
        debug!("Reset fire state of {cell}");
        true
    }

    /// Reset every tracked or remembered cell.
    pub fn reset_all(&self, world: &dyn WorldQuery) -> usize {
        let (drained, scars): (Vec<(CellId, Arc<CellSlot>)>, Vec<(CellId, CharredScar)>) = {
            let mut map = self.write();
            (map.drain().collect(), self.scars().drain().collect())
        };
        for (cell, slot) in &drained {
            let state = slot.lock();
            slot.retire();
            state.restore_colors(*cell, world);
        }
        for (cell, scar) in &scars {
            scar.restore_colors(*cell, world);
        }
        let count = drained.len() + scars.len();
        info!("Reset fire state of {count} cells");
        count
    }

    /// Drop least-recently-active cells until at most `budget` remain.
    ///
    /// Cells that are `protected`, still burning, or currently locked by
    /// someone else are never evicted. Evicted cells keep whatever colors they
    /// left in the world; their charred vertices are remembered. Returns the
    /// evicted cells, oldest first.
    pub fn evict_idle(&self, budget: usize, protected: impl Fn(CellId) -> bool) -> Vec<CellId> {
        let slots = self.slots();
        if slots.len() <= budget {
            return Vec::new();
        }

        let mut candidates: Vec<(u64, CellId)> = slots
            .iter()
            .filter(|(cell, _)| !protected(*cell))
            .map(|(cell, slot)| (slot.last_active(), *cell))
            .collect();
        candidates.sort_unstable();

        let mut map = self.write();
        let mut evicted = Vec::new();
        for (_, cell) in candidates {
            if map.len() <= budget {
                break;
            }
            let Some(slot) = map.get(&cell).cloned() else {
                continue;
            };
            let Some(state) = slot.try_lock() else {
                continue;
            };
            if state.burning_count() > 0 {
                continue;
            }
            if let Some(scar) = state.scar() {
                self.scars().insert(cell, scar);
            }
            slot.retire();
            drop(state);
            map.remove(&cell);
            evicted.push(cell);
        }
        let remaining = map.len();
        drop(map);

        if !evicted.is_empty() {
            debug!(
                "Evicted {} idle cells ({remaining} tracked, budget {budget})",
                evicted.len()
            );
        }
        evicted
    }
}
