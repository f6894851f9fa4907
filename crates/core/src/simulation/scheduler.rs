//! Per-cell task scheduling
//!
//! Every tick the engine asks the scheduler to run one task per tracked cell.
//! A cell that still has a task in flight is skipped rather than queued, so
//! at most one task per cell exists at any time. Finished tasks report over a
//! channel and are reaped without blocking. A task that outlives its deadline
//! is abandoned: its handle is dropped (freeing the cell for the next tick)
//! and its cancellation flag is raised so it stops at the next vertex.
//! Abandoned tasks still count as running until their body returns, so a
//! shutdown can wait for them.

use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core_types::CellId;
use crate::error::WildfireError;

/// Result of one cell task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Vertices burning when the task finished
    pub burning: usize,
    /// Ignitions caused by the task, in its own cell and across boundaries
    pub ignited: usize,
    pub charred: usize,
    /// The cell was reset or evicted before the task ran
    pub skipped: bool,
    pub cancelled: bool,
}

/// Completion message sent by a task
#[derive(Debug, Clone, Copy)]
pub struct TaskDone {
    pub cell: CellId,
    pub task_id: u64,
    pub outcome: TaskOutcome,
}

#[derive(Debug)]
struct TaskHandle {
    task_id: u64,
    spawned: Instant,
    cancel: Arc<AtomicBool>,
}

/// Number of task bodies running, abandoned ones included
#[derive(Debug, Default)]
struct LiveTasks {
    count: Mutex<usize>,
    exited: Condvar,
}

impl LiveTasks {
    fn count(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held by a task body; leaving counts the task out, even on panic
struct LiveTask(Arc<LiveTasks>);

impl LiveTask {
    fn enter(live: &Arc<LiveTasks>) -> Self {
        *live.count() += 1;
        Self(live.clone())
    }
}

impl Drop for LiveTask {
    fn drop(&mut self) {
        let mut count = self.0.count();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.exited.notify_all();
        }
    }
}

/// Thread pool plus the handle of every in-flight cell task
pub struct Scheduler {
    pool: ThreadPool,
    handles: FxHashMap<CellId, TaskHandle>,
    live: Arc<LiveTasks>,
    done_tx: Sender<TaskDone>,
    done_rx: Receiver<TaskDone>,
    next_task_id: u64,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.pool.current_num_threads())
            .field("in_flight", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler with `worker_threads` workers (0 = one per core).
    ///
    /// # Errors
    ///
    /// Returns `WildfireError::ThreadPool` if the worker threads cannot be started.
    pub fn new(worker_threads: usize) -> Result<Self, WildfireError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("wildfire-cell-{i}"))
            .build()
            .map_err(|e| WildfireError::ThreadPool(e.to_string()))?;
        let (done_tx, done_rx) = mpsc::channel();

        Ok(Self {
            pool,
            handles: FxHashMap::default(),
            live: Arc::new(LiveTasks::default()),
            done_tx,
            done_rx,
            next_task_id: 0,
        })
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn is_in_flight(&self, cell: CellId) -> bool {
        self.handles.contains_key(&cell)
    }

    pub fn in_flight(&self) -> usize {
        self.handles.len()
    }

    /// Task bodies still running, including abandoned ones.
    pub fn running_tasks(&self) -> usize {
        *self.live.count()
    }

    /// Start `job` for `cell` unless the cell already has a task in flight.
    ///
    /// The job receives the task's cancellation flag. Returns false if the
    /// cell was skipped.
    pub fn spawn<F>(&mut self, cell: CellId, job: F) -> bool
    where
        F: FnOnce(&AtomicBool) -> TaskOutcome + Send + 'static,
    {
        if self.handles.contains_key(&cell) {
            return false;
        }

        self.next_task_id += 1;
        let task_id = self.next_task_id;
        let cancel = Arc::new(AtomicBool::new(false));
        self.handles.insert(
            cell,
            TaskHandle {
                task_id,
                spawned: Instant::now(),
                cancel: cancel.clone(),
            },
        );

        let done_tx = self.done_tx.clone();
        let live = LiveTask::enter(&self.live);
        self.pool.spawn(move || {
            let outcome = job(&cancel);
            // The scheduler may be gone during shutdown
            let _ = done_tx.send(TaskDone {
                cell,
                task_id,
                outcome,
            });
            drop(live);
        });
        true
    }

    /// Accept a completion message if it belongs to a live handle.
    fn accept(&mut self, done: TaskDone) -> Option<TaskDone> {
        match self.handles.get(&done.cell) {
            Some(handle) if handle.task_id == done.task_id => {
                self.handles.remove(&done.cell);
                Some(done)
            }
            // Late report from an abandoned task
            _ => None,
        }
    }

    /// Collect every finished task without blocking.
    pub fn reap(&mut self) -> Vec<TaskDone> {
        let mut finished = Vec::new();
        while let Ok(done) = self.done_rx.try_recv() {
            if let Some(done) = self.accept(done) {
                finished.push(done);
            }
        }
        finished
    }

    /// Abandon every task running longer than `deadline`.
    pub fn expire(&mut self, deadline: Duration) -> Vec<CellId> {
        let now = Instant::now();
        let expired: Vec<CellId> = self
            .handles
            .iter()
            .filter(|(_, handle)| now.duration_since(handle.spawned) > deadline)
            .map(|(cell, _)| *cell)
            .collect();

        for cell in &expired {
            if let Some(handle) = self.handles.remove(cell) {
                handle.cancel.store(true, Ordering::Relaxed);
                warn!(
                    "Task {} for {cell} exceeded its {:.1}s deadline, abandoning it",
                    handle.task_id,
                    deadline.as_secs_f32()
                );
            }
        }
        expired
    }

    /// Block until no task is in flight or `timeout` passes.
    ///
    /// Returns true if every task finished. Reaped completions are returned
    /// through `finished`.
    pub fn wait_idle(&mut self, timeout: Duration, finished: &mut Vec<TaskDone>) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.handles.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(remaining) {
                Ok(done) => finished.extend(self.accept(done)),
                Err(RecvTimeoutError::Timeout) => {
                    debug!("Still {} tasks in flight after {timeout:?}", self.handles.len());
                    return false;
                }
                // We hold a sender, so this cannot happen
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    /// Block until no task body is running, abandoned ones included, or
    /// `timeout` passes. Returns true if none is running.
    pub fn wait_exited(&self, timeout: Duration) -> bool {
        let count = self.live.count();
        let (count, _) = self
            .live
            .exited
            .wait_timeout_while(count, timeout, |running| *running > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }

    /// Raise the cancellation flag of every in-flight task, keeping the
    /// handles so `wait_idle` can still collect them.
    pub fn signal_cancel(&self) {
        for handle in self.handles.values() {
            handle.cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Raise the cancellation flag of every in-flight task and drop its handle.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.cancel.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
