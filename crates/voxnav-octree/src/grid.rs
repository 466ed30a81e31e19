//! Arena-backed voxel grid: root index plus every cell of every subtree.

use glam::{UVec3, Vec3};

use crate::aabb::Aabb;
use crate::cell::{octant_offset, Cell, CellId, Navigability};

/// The spatial index over the navigation volume.
///
/// Cells live in a single arena addressed by [`CellId`]; parent/child links
/// are ids, not pointers, so the structure is relocatable and can be shared
/// read-only across threads. Root cells occupy the first `nx*ny*nz` slots in
/// `[x][y][z]` order. Slots freed by a localized rebuild are recycled for
/// later subdivisions without disturbing any other cell.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    origin: Vec3,
    cell_size: f32,
    dims: UVec3,
    max_depth: u8,
    cells: Vec<Cell>,
    free: Vec<u32>,
}

impl VoxelGrid {
    pub(crate) fn new(origin: Vec3, cell_size: f32, dims: UVec3, max_depth: u8) -> Self {
        let root_count = (dims.x * dims.y * dims.z) as usize;
        let mut cells = Vec::with_capacity(root_count);

        for x in 0..dims.x {
            for y in 0..dims.y {
                for z in 0..dims.z {
                    let coord = UVec3::new(x, y, z);
                    cells.push(Cell {
                        grid: coord,
                        center: origin + cell_size * (coord.as_vec3() + Vec3::splat(0.5)),
                        half_extent: cell_size * 0.5,
                        level: 0,
                        octant: 0,
                        parent: None,
                        children: None,
                        state: Navigability::Open,
                        cost: 1.0,
                    });
                }
            }
        }

        Self {
            origin,
            cell_size,
            dims,
            max_depth,
            cells,
            free: Vec::new(),
        }
    }

    /// Minimum corner of the indexed volume.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Edge length of a root cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of root cells per axis.
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Deepest subdivision level the grid was built with.
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Bounds covered by the root grid.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            self.origin,
            self.origin + self.dims.as_vec3() * self.cell_size,
        )
    }

    /// Number of live cells (roots plus all subdivision children).
    pub fn live_count(&self) -> usize {
        self.cells.len() - self.free.len()
    }

    /// The cell at `id`.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.index()]
    }

    /// The root cell at grid coordinate (x, y, z), if in range.
    pub fn root_at(&self, x: u32, y: u32, z: u32) -> Option<CellId> {
        if x >= self.dims.x || y >= self.dims.y || z >= self.dims.z {
            return None;
        }
        Some(CellId((x * self.dims.y + y) * self.dims.z + z))
    }

    /// Ids of all root cells.
    pub fn roots(&self) -> impl Iterator<Item = CellId> {
        (0..self.dims.x * self.dims.y * self.dims.z).map(CellId)
    }

    /// Root cells whose bounds overlap `bounds`.
    pub fn roots_overlapping(&self, bounds: &Aabb) -> Vec<CellId> {
        let lo = ((bounds.min - self.origin) / self.cell_size).floor();
        let hi = ((bounds.max - self.origin) / self.cell_size).floor();

        let lo = lo.max(Vec3::ZERO).as_uvec3();
        let hi = hi.min((self.dims.as_vec3()) - Vec3::ONE);
        if hi.cmplt(Vec3::ZERO).any() {
            return Vec::new();
        }
        let hi = hi.as_uvec3();

        let mut roots = Vec::new();
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    if let Some(id) = self.root_at(x, y, z) {
                        roots.push(id);
                    }
                }
            }
        }
        roots
    }

    /// Point-locates the leaf cell containing `point`.
    ///
    /// Returns `None` only for points outside the grid; any in-bounds point
    /// resolves to exactly one `Open` or `Blocked` leaf.
    pub fn locate(&self, point: Vec3) -> Option<CellId> {
        self.descend(point, None)
    }

    /// Point-locates `point`, but stops descending at `max_level` even when
    /// the cell there is still subdivided.
    ///
    /// Used by neighbor resolution: a cell's neighbor is looked up no deeper
    /// than the cell's own level, so that a finer adjacent region is seen as
    /// one subdivided cell and expanded along the shared face.
    pub fn locate_at_most(&self, point: Vec3, max_level: u8) -> Option<CellId> {
        self.descend(point, Some(max_level))
    }

    fn descend(&self, point: Vec3, stop_level: Option<u8>) -> Option<CellId> {
        let rel = (point - self.origin) / self.cell_size;
        if rel.cmplt(Vec3::ZERO).any() {
            return None;
        }
        let coord = rel.floor().as_uvec3();
        let mut id = self.root_at(coord.x, coord.y, coord.z)?;

        loop {
            let cell = self.cell(id);
            let Some(children) = cell.children else {
                return Some(id);
            };
            if let Some(stop) = stop_level {
                if cell.level >= stop {
                    return Some(id);
                }
            }

            let mut next = None;
            for child in children {
                if self.cell(child).bounds().contains_point(point) {
                    next = Some(child);
                    break;
                }
            }
            // Children partition the parent exactly, so an in-bounds point
            // always lands in one of them.
            id = next?;
        }
    }

    /// Splits `parent` into 8 equal octants and marks it `Subdivided`.
    ///
    /// Children are created `Open` at half the parent's extent, centered a
    /// quarter-extent away along each axis.
    pub(crate) fn attach_children(&mut self, parent: CellId) -> [CellId; 8] {
        let (grid, center, half, level) = {
            let p = self.cell(parent);
            debug_assert!(p.children.is_none(), "cell already subdivided");
            (p.grid, p.center, p.half_extent, p.level)
        };
        let quarter = half * 0.5;

        let mut ids = [CellId(0); 8];
        for (octant, slot) in ids.iter_mut().enumerate() {
            *slot = self.alloc(Cell {
                grid,
                center: center + octant_offset(octant as u8, quarter),
                half_extent: quarter,
                level: level + 1,
                octant: octant as u8,
                parent: Some(parent),
                children: None,
                state: Navigability::Open,
                cost: 1.0,
            });
        }

        let p = self.cell_mut(parent);
        p.children = Some(ids);
        p.state = Navigability::Subdivided;
        ids
    }

    /// Resets `id` to an `Open` leaf with base cost, returning its whole
    /// subtree to the free list. The discard is atomic with respect to the
    /// child array; no cell outside the subtree is touched.
    pub(crate) fn reset_to_leaf(&mut self, id: CellId) {
        let cell = self.cell_mut(id);
        cell.state = Navigability::Open;
        cell.cost = 1.0;
        let Some(children) = cell.children.take() else {
            return;
        };

        let mut stack: Vec<CellId> = children.to_vec();
        while let Some(child) = stack.pop() {
            if let Some(grandchildren) = self.cell_mut(child).children.take() {
                stack.extend(grandchildren);
            }
            self.free.push(child.0);
        }
    }

    fn alloc(&mut self, cell: Cell) -> CellId {
        if let Some(slot) = self.free.pop() {
            self.cells[slot as usize] = cell;
            CellId(slot)
        } else {
            self.cells.push(cell);
            CellId(self.cells.len() as u32 - 1)
        }
    }
}
