//! Face-adjacent neighbor resolution across subdivision levels.

use crate::cell::{CellId, Face};
use crate::grid::VoxelGrid;

/// Collects the face-adjacent cells of `id` in all six axis directions into
/// `out`.
///
/// The neighbor in a direction is found by point-locating just past the
/// shared face, descending no deeper than the query cell's own level:
///
/// - an equal-or-coarser leaf is pushed as-is (one neighbor);
/// - a finer region shows up as a subdivided cell at the query cell's level
///   and is expanded into all of its descendant leaves on the shared face.
///
/// The asymmetry is intentional: a fine cell has a single coarser neighbor on
/// a face, while a coarse cell borders many fine ones. Subdivided cells are
/// never pushed; `Blocked` leaves are (navigability filtering is the
/// caller's job).
pub fn find_neighbors(grid: &VoxelGrid, id: CellId, out: &mut Vec<CellId>) {
    let (center, half_extent, level) = {
        let cell = grid.cell(id);
        (cell.center, cell.half_extent, cell.level)
    };
    // Probe just inside the adjacent cell: a quarter of the finest cell edge
    // is below any neighbor's thickness.
    let eps = grid.cell_size() / (1u32 << grid.max_depth()) as f32 * 0.25;

    for face in Face::ALL {
        let probe = center + face.offset() * (half_extent + eps);
        let Some(neighbor) = grid.locate_at_most(probe, level) else {
            continue;
        };

        if grid.cell(neighbor).is_leaf() {
            out.push(neighbor);
            continue;
        }

        // Finer than us: walk down the shared face.
        let mut stack = vec![neighbor];
        while let Some(current) = stack.pop() {
            match grid.cell(current).children {
                None => out.push(current),
                Some(children) => {
                    for idx in face.boundary_children() {
                        stack.push(children[idx]);
                    }
                }
            }
        }
    }
}

/// Convenience wrapper returning the neighbors of `id` as a fresh vector.
pub fn neighbors_of(grid: &VoxelGrid, id: CellId) -> Vec<CellId> {
    let mut out = Vec::new();
    find_neighbors(grid, id, &mut out);
    out
}
