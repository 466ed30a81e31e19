//! One in-flight path query and its search state machine.
//!
//! The push priority of a candidate cell is its local step cost plus the
//! straight-line distance remaining to the destination point; costs are not
//! accumulated from the origin. The search is therefore greedy best-first: it
//! finds *a* path, not necessarily the cheapest one. This matches the
//! scheduling model the volume was designed around and must not be silently
//! swapped for accumulated-cost A*.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use voxnav_octree::{find_neighbors, CellId, Navigability, VoxelGrid};

use crate::frontier::PriorityFrontier;

/// Handle to a scheduled path query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the entity a path query is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Lifecycle of a path query.
///
/// `NotStarted` and `InProgress` are transient; the other three are terminal
/// and reported exactly once through polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    TimedOut,
    Successful,
    Failed,
}

impl TaskStatus {
    /// Whether the task has finished, one way or another.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::TimedOut | TaskStatus::Successful | TaskStatus::Failed
        )
    }
}

/// Search state for one scheduled query.
///
/// `visited` maps each reached cell to the cell it was reached from; it is
/// both the closed set and the parent chain for path reconstruction.
#[derive(Debug)]
pub(crate) struct PathTask {
    pub(crate) id: TaskId,
    pub(crate) requester: AgentId,
    pub(crate) destination: Vec3,
    pub(crate) origin_cell: CellId,
    pub(crate) destination_cell: CellId,
    frontier: PriorityFrontier,
    visited: HashMap<CellId, CellId>,
    pub(crate) path: Vec<Vec3>,
    pub(crate) status: TaskStatus,
    pub(crate) elapsed: Duration,
    scratch: Vec<CellId>,
}

impl PathTask {
    /// Creates a task seeded with its origin cell at that cell's base cost.
    pub(crate) fn new(
        id: TaskId,
        requester: AgentId,
        destination: Vec3,
        origin_cell: CellId,
        destination_cell: CellId,
        origin_cost: f32,
    ) -> Self {
        let mut frontier = PriorityFrontier::new();
        frontier.push(origin_cell, origin_cost);
        Self {
            id,
            requester,
            destination,
            origin_cell,
            destination_cell,
            frontier,
            visited: HashMap::new(),
            path: Vec::new(),
            status: TaskStatus::NotStarted,
            elapsed: Duration::ZERO,
            scratch: Vec::new(),
        }
    }

    /// Performs exactly one search step.
    ///
    /// Empty frontier means the reachable region is exhausted (`Failed`).
    /// Once the destination cell is in the visited map the path is
    /// reconstructed and the task is `Successful`. Otherwise the cheapest
    /// frontier cell is popped and its `Open`, unvisited neighbors are
    /// recorded and queued.
    pub(crate) fn step(&mut self, grid: &VoxelGrid) {
        self.status = TaskStatus::InProgress;

        let Some(curr) = self.frontier.peek_min() else {
            self.status = TaskStatus::Failed;
            return;
        };
        if self.visited.contains_key(&self.destination_cell) {
            self.reconstruct(grid);
            return;
        }
        self.frontier.pop_min();

        let mut neighbors = std::mem::take(&mut self.scratch);
        neighbors.clear();
        find_neighbors(grid, curr, &mut neighbors);
        let curr_center = grid.cell(curr).center;

        for &neighbor in &neighbors {
            let cell = grid.cell(neighbor);
            if cell.state != Navigability::Open || self.visited.contains_key(&neighbor) {
                continue;
            }
            self.visited.insert(neighbor, curr);
            let cost =
                cell.center.distance(self.destination) + curr_center.distance(cell.center);
            self.frontier.push(neighbor, cost);
        }
        self.scratch = neighbors;
    }

    /// Whether any cell this search holds (endpoints, visited map, or
    /// frontier) lies under one of the given root cells.
    ///
    /// Stale cell records keep their root coordinate, so this stays accurate
    /// even after the cells themselves were freed by a rebuild.
    pub(crate) fn holds_cells_under(&self, grid: &VoxelGrid, roots: &[CellId]) -> bool {
        let root_of = |id: CellId| {
            let coord = grid.cell(id).grid;
            grid.root_at(coord.x, coord.y, coord.z).unwrap_or(id)
        };
        [self.origin_cell, self.destination_cell]
            .into_iter()
            .chain(self.visited.keys().copied())
            .chain(self.frontier.cells())
            .any(|id| roots.contains(&root_of(id)))
    }

    /// Walks the visited map backward from the destination cell, collecting
    /// cell centers, then reverses so the waypoints run origin to
    /// destination (both endpoints' cell centers included).
    fn reconstruct(&mut self, grid: &VoxelGrid) {
        let mut waypoints = vec![grid.cell(self.destination_cell).center];
        let mut curr = self.destination_cell;
        while curr != self.origin_cell {
            match self.visited.get(&curr) {
                Some(&prev) => {
                    waypoints.push(grid.cell(prev).center);
                    curr = prev;
                }
                None => {
                    // Parent chain broken (e.g. the region was rebuilt under
                    // a live query); treat as no path.
                    self.status = TaskStatus::Failed;
                    return;
                }
            }
        }
        waypoints.reverse();
        self.path = waypoints;
        self.status = TaskStatus::Successful;
    }
}
