//! The navigation volume: owns the grid and drives path queries tick by tick.
//!
//! Threading follows a single-writer model. The grid and the task pool are
//! mutated only inside [`NavVolume::tick`], which is meant to run on one
//! background thread (see [`NavWorker`](crate::NavWorker)). Callers on any
//! thread submit work into lock-guarded queues that the next tick drains:
//! new queries via [`NavVolume::schedule`] and dynamic rebuild regions via
//! [`NavVolume::request_rebuild`]. Results are read back through
//! [`NavVolume::poll`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard};
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use voxnav_octree::{
    build_grid, rebuild_roots, Aabb, CollisionClassifier, CostModifier, GridConfig, NavError,
    Result, VoxelGrid,
};

use crate::task::{AgentId, PathTask, TaskId, TaskStatus};

/// Full configuration of a navigation volume: grid geometry plus scheduling
/// limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavVolumeConfig {
    /// Geometry and subdivision parameters.
    pub grid: GridConfig,
    /// Upper bound on tasks advanced per tick; later tasks wait for a
    /// following tick.
    pub max_tasks_per_tick: usize,
    /// Wall-clock search budget per task before it is forced to `TimedOut`.
    pub task_timeout: Duration,
    /// Interval of the background tick loop.
    pub tick_interval: Duration,
}

impl Default for NavVolumeConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            max_tasks_per_tick: 200,
            task_timeout: Duration::from_secs(5),
            tick_interval: Duration::from_millis(30),
        }
    }
}

impl NavVolumeConfig {
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_max_tasks_per_tick(mut self, max_tasks_per_tick: usize) -> Self {
        self.max_tasks_per_tick = max_tasks_per_tick;
        self
    }

    pub fn with_task_timeout(mut self, task_timeout: Duration) -> Self {
        self.task_timeout = task_timeout;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.grid.validate()?;
        if self.max_tasks_per_tick == 0 {
            return Err("max tasks per tick must be at least 1".to_string());
        }
        if self.tick_interval.is_zero() {
            return Err("tick interval must be positive".to_string());
        }
        Ok(())
    }
}

/// Point-in-time view of a task, as returned by [`NavVolume::poll`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    /// Waypoints from origin to destination; populated only on
    /// `Successful`.
    pub path: Vec<Vec3>,
}

/// A submitted query that has not been admitted by a tick yet. Endpoints are
/// kept as raw points; cells are resolved at admission so they always refer
/// to the grid as rebuilt up to that tick.
#[derive(Debug, Clone, Copy)]
struct PendingQuery {
    id: TaskId,
    requester: AgentId,
    origin: Vec3,
    destination: Vec3,
}

#[derive(Debug, Default)]
struct SchedulerState {
    /// Queries submitted since the last tick, in submission order.
    pending: VecDeque<PendingQuery>,
    /// Dynamic-obstacle regions awaiting a localized rebuild.
    rebuilds: VecDeque<Aabb>,
    /// Tasks being advanced, in admission order.
    active: Vec<PathTask>,
    /// Terminal results not yet collected by a poll.
    completed: HashMap<TaskId, TaskSnapshot>,
}

/// A navigable volume of space with an asynchronous path query scheduler.
///
/// Construct one per volume; nothing here is global, and independent volumes
/// can coexist (each typically paired with its own worker thread).
pub struct NavVolume<C: CollisionClassifier> {
    config: NavVolumeConfig,
    classifier: C,
    modifiers: Vec<CostModifier>,
    grid: RwLock<VoxelGrid>,
    state: Mutex<SchedulerState>,
    next_task_id: AtomicU64,
}

impl<C: CollisionClassifier> NavVolume<C> {
    /// Validates `config`, builds the full grid against `classifier`, and
    /// returns the volume. Fails fast on malformed configuration.
    pub fn new(config: NavVolumeConfig, classifier: C, modifiers: Vec<CostModifier>) -> Result<Self> {
        config.validate().map_err(NavError::InvalidConfig)?;
        let grid = build_grid(&config.grid, &classifier, &modifiers)?;
        Ok(Self {
            config,
            classifier,
            modifiers,
            grid: RwLock::new(grid),
            state: Mutex::new(SchedulerState::default()),
            next_task_id: AtomicU64::new(1),
        })
    }

    /// The volume's configuration.
    pub fn config(&self) -> &NavVolumeConfig {
        &self.config
    }

    /// Read access to the spatial index.
    pub fn grid(&self) -> RwLockReadGuard<'_, VoxelGrid> {
        self.grid.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedules a path query from `origin` to `destination`.
    ///
    /// A point outside the volume is rejected with [`NavError::OutOfBounds`]
    /// and no task is created. Leaf cell resolution is deferred to the tick
    /// that admits the query, so a rebuild landing between submission and
    /// admission cannot leave the task holding cells of the old subdivision.
    pub fn schedule(&self, requester: AgentId, origin: Vec3, destination: Vec3) -> Result<TaskId> {
        {
            let grid = self.grid();
            grid.locate(destination)
                .ok_or(NavError::OutOfBounds(destination))?;
            grid.locate(origin).ok_or(NavError::OutOfBounds(origin))?;
        }

        let id = TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed));
        debug!(task = %id, agent = requester.0, "path query scheduled");

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.pending.push_back(PendingQuery {
            id,
            requester,
            origin,
            destination,
        });
        Ok(id)
    }

    /// Queues a localized rebuild of every root cell overlapping `bounds`,
    /// applied at the start of the next tick. Used to track moving or
    /// appearing/disappearing obstacles.
    pub fn request_rebuild(&self, bounds: Aabb) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.rebuilds.push_back(bounds);
    }

    /// Status of `id`, consuming the stored result if the task is terminal.
    ///
    /// Returns `None` for unknown ids and for terminal results already
    /// collected.
    pub fn poll(&self, id: TaskId) -> Option<TaskSnapshot> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = state.completed.remove(&id) {
            return Some(snapshot);
        }
        if state.pending.iter().any(|q| q.id == id) {
            return Some(TaskSnapshot {
                status: TaskStatus::NotStarted,
                path: Vec::new(),
            });
        }
        state.active.iter().find(|t| t.id == id).map(|t| TaskSnapshot {
            status: t.status,
            path: Vec::new(),
        })
    }

    /// Runs one scheduler tick: applies queued rebuilds (failing any search
    /// that holds cells under a rebuilt root), admits queued queries by
    /// resolving their endpoints against the current grid, then advances up
    /// to `max_tasks` active tasks in admission order by one search step
    /// each (after a timeout check). Tasks that reach a terminal state are
    /// retired the same tick; the rest keep their order.
    ///
    /// Normally driven by a [`NavWorker`](crate::NavWorker), but callable
    /// directly for synchronous use.
    pub fn tick(&self, delta: Duration, max_tasks: usize) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let state = &mut *guard;

        if !state.rebuilds.is_empty() {
            let mut grid = self.grid.write().unwrap_or_else(|e| e.into_inner());
            let mut rebuilt = Vec::new();
            while let Some(bounds) = state.rebuilds.pop_front() {
                let roots = grid.roots_overlapping(&bounds);
                rebuild_roots(
                    &mut grid,
                    &roots,
                    &self.config.grid,
                    &self.classifier,
                    &self.modifiers,
                );
                debug!(roots = roots.len(), "rebuilt dynamic region");
                rebuilt.extend(roots);
            }

            // A rebuild frees the cells under its roots and recycles their
            // slots, so any search that has touched those subtrees holds ids
            // that may now name different cells. Fail such tasks outright
            // rather than let them expand from, or reconstruct through, the
            // wrong cells. Pending queries are immune: they hold raw points.
            for task in state.active.iter_mut() {
                if task.status.is_terminal() {
                    continue;
                }
                if task.holds_cells_under(&grid, &rebuilt) {
                    task.status = TaskStatus::Failed;
                    warn!(task = %task.id, "path query invalidated by rebuild");
                }
            }
        }

        {
            let grid = self.grid();
            while let Some(query) = state.pending.pop_front() {
                // Bounds were checked at schedule time and the volume never
                // changes shape, so resolution only fails if the arena is
                // somehow inconsistent; surface that as a failed task.
                let resolved = grid
                    .locate(query.origin)
                    .zip(grid.locate(query.destination));
                let Some((origin_cell, destination_cell)) = resolved else {
                    state.completed.insert(
                        query.id,
                        TaskSnapshot {
                            status: TaskStatus::Failed,
                            path: Vec::new(),
                        },
                    );
                    continue;
                };
                state.active.push(PathTask::new(
                    query.id,
                    query.requester,
                    query.destination,
                    origin_cell,
                    destination_cell,
                    grid.cell(origin_cell).cost,
                ));
            }

            let budget = max_tasks.min(state.active.len());
            for task in state.active.iter_mut().take(budget) {
                if task.status.is_terminal() {
                    continue;
                }
                if task.elapsed > self.config.task_timeout {
                    task.status = TaskStatus::TimedOut;
                    warn!(task = %task.id, "path query timed out");
                    continue;
                }

                task.step(&grid);
                match task.status {
                    TaskStatus::Successful => {
                        debug!(
                            task = %task.id,
                            agent = task.requester.0,
                            waypoints = task.path.len(),
                            "path found"
                        );
                    }
                    TaskStatus::Failed => {
                        warn!(task = %task.id, agent = task.requester.0, "no path found");
                    }
                    _ => task.elapsed += delta,
                }
            }
        }

        let mut survivors = Vec::with_capacity(state.active.len());
        for task in state.active.drain(..) {
            if task.status.is_terminal() {
                state.completed.insert(
                    task.id,
                    TaskSnapshot {
                        status: task.status,
                        path: task.path,
                    },
                );
            } else {
                survivors.push(task);
            }
        }
        state.active = survivors;
    }

    /// Number of queries submitted or in flight and not yet terminal.
    pub fn active_tasks(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.pending.len() + state.active.len()
    }
}
