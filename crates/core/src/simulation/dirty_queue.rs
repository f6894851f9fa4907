//! Rate-limited queue of cells awaiting vegetation regeneration
//!
//! Cells whose appearance changed are queued once, in the order they were
//! first marked, and drained a few at a time so rebuilding grass never costs
//! more than a bounded amount of work per frame.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core_types::CellId;

#[derive(Debug, Default)]
struct Inner {
    order: VecDeque<CellId>,
    queued: FxHashSet<CellId>,
}

/// FIFO of dirty cells with duplicate suppression
#[derive(Debug, Default)]
pub struct DirtyQueue {
    inner: Mutex<Inner>,
}

impl DirtyQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a cell. Returns false if it was already queued.
    pub fn push(&self, cell: CellId) -> bool {
        let mut inner = self.lock();
        if !inner.queued.insert(cell) {
            return false;
        }
        inner.order.push_back(cell);
        true
    }

    /// Take up to `max` cells, oldest first.
    pub fn drain(&self, max: usize) -> Vec<CellId> {
        let mut inner = self.lock();
        let count = max.min(inner.order.len());
        let taken: Vec<CellId> = inner.order.drain(..count).collect();
        for cell in &taken {
            inner.queued.remove(cell);
        }
        taken
    }

    /// Forget a queued cell (used when its state is reset).
    pub fn remove(&self, cell: CellId) -> bool {
        let mut inner = self.lock();
        if !inner.queued.remove(&cell) {
            return false;
        }
        inner.order.retain(|c| *c != cell);
        true
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.lock().queued.contains(&cell)
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.order.clear();
        inner.queued.clear();
    }
}
