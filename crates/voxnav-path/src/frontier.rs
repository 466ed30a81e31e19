//! Min-priority search frontier over octree cells.

use voxnav_octree::CellId;

#[derive(Debug, Clone, Copy)]
struct Entry {
    cell: CellId,
    cost: f32,
}

/// Binary min-heap of `(cell, cost)` pairs, popped in ascending cost order.
///
/// There is no decrease-key: a cell may be pushed any number of times with
/// different costs, and the frontier does not deduplicate. Closed-set
/// tracking belongs to the search task, not the frontier. Ties are popped in
/// unspecified order.
#[derive(Debug, Default)]
pub struct PriorityFrontier {
    heap: Vec<Entry>,
}

impl PriorityFrontier {
    /// Creates an empty frontier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued entries, counting duplicates.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the frontier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Queues `cell` at the given cost.
    pub fn push(&mut self, cell: CellId, cost: f32) {
        self.heap.push(Entry { cell, cost });
        self.bubble_up(self.heap.len() - 1);
    }

    /// The cheapest queued cell, without removing it.
    pub fn peek_min(&self) -> Option<CellId> {
        self.heap.first().map(|e| e.cell)
    }

    /// Iterates the queued cells in arbitrary order.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.heap.iter().map(|e| e.cell)
    }

    /// Removes and returns the cheapest queued cell.
    pub fn pop_min(&mut self) -> Option<CellId> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let entry = self.heap.pop();
        if !self.heap.is_empty() {
            self.trickle_down(0);
        }
        entry.map(|e| e.cell)
    }

    fn bubble_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i].cost >= self.heap[parent].cost {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn trickle_down(&mut self, mut i: usize) {
        loop {
            let first_child = 2 * i + 1;
            if first_child >= self.heap.len() {
                break;
            }
            let second_child = first_child + 1;
            let mut min_child = first_child;
            if second_child < self.heap.len()
                && self.heap[second_child].cost < self.heap[first_child].cost
            {
                min_child = second_child;
            }
            if self.heap[i].cost <= self.heap[min_child].cost {
                break;
            }
            self.heap.swap(i, min_child);
            i = min_child;
        }
    }
}
