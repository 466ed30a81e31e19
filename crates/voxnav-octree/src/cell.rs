//! Octree cells and face topology.

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;

/// Index of a cell within a [`VoxelGrid`](crate::VoxelGrid) arena.
///
/// Ids are stable for the lifetime of the cell: rebuilding one root cell never
/// moves or renumbers cells under other roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub(crate) u32);

impl CellId {
    /// Arena slot of this cell.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Navigability verdict of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Navigability {
    /// Passable leaf.
    Open,
    /// Impassable leaf.
    Blocked,
    /// Structural interior cell with exactly 8 children; never a traversal
    /// target.
    Subdivided,
}

/// One cubic cell of the navigation volume.
///
/// A cell is either a leaf (`Open` or `Blocked`, no children) or `Subdivided`
/// with exactly 8 children partitioning its volume into equal octants. The two
/// facts change together; only the grid and builder mutate cells.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Grid coordinate of the root cell this cell descends from.
    pub grid: UVec3,
    /// Center of the cell.
    pub center: Vec3,
    /// Half of the cube's edge length.
    pub half_extent: f32,
    /// Subdivision depth; roots are level 0.
    pub level: u8,
    /// Child slot (0-7) within the parent; 0 for roots.
    pub octant: u8,
    /// Parent cell, absent for roots.
    pub parent: Option<CellId>,
    /// Exactly 8 children when `Subdivided`, otherwise none.
    pub children: Option<[CellId; 8]>,
    /// Navigability verdict.
    pub state: Navigability,
    /// Traversal cost, base 1.0, scaled by overlapping cost modifiers.
    pub cost: f32,
}

impl Cell {
    /// Bounds of the cell.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extent(self.center, Vec3::splat(self.half_extent))
    }

    /// Whether the cell is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Center offset of child `octant` relative to its parent, where `quarter` is
/// a quarter of the parent's edge length.
///
/// Bit 1 selects the x half (clear = +x), bit 0 the y half (set = +y), bit 2
/// the z half (set = +z). This assignment is what makes the per-face child
/// index sets in [`Face::boundary_children`] land on the shared face.
pub(crate) fn octant_offset(octant: u8, quarter: f32) -> Vec3 {
    Vec3::new(
        if octant & 0b010 == 0 { quarter } else { -quarter },
        if octant & 0b001 != 0 { quarter } else { -quarter },
        if octant & 0b100 != 0 { quarter } else { -quarter },
    )
}

/// One of the six axis directions used for face adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Face {
    NegX,
    PosX,
    NegY,
    PosY,
    NegZ,
    PosZ,
}

impl Face {
    /// All six faces.
    pub const ALL: [Face; 6] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    /// Unit vector pointing out of this face.
    pub fn offset(self) -> Vec3 {
        match self {
            Face::NegX => Vec3::new(-1.0, 0.0, 0.0),
            Face::PosX => Vec3::new(1.0, 0.0, 0.0),
            Face::NegY => Vec3::new(0.0, -1.0, 0.0),
            Face::PosY => Vec3::new(0.0, 1.0, 0.0),
            Face::NegZ => Vec3::new(0.0, 0.0, -1.0),
            Face::PosZ => Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// The face looking back at this one.
    pub fn opposite(self) -> Face {
        match self {
            Face::NegX => Face::PosX,
            Face::PosX => Face::NegX,
            Face::NegY => Face::PosY,
            Face::PosY => Face::NegY,
            Face::NegZ => Face::PosZ,
            Face::PosZ => Face::NegZ,
        }
    }

    /// Child indices of a neighbor located in this direction that lie on the
    /// face shared with the querying cell.
    ///
    /// Looking left (`NegX`), the neighbor's children touching us are its +x
    /// half, and so on for the other directions.
    pub fn boundary_children(self) -> [usize; 4] {
        match self {
            Face::NegX => [0, 1, 4, 5],
            Face::PosX => [2, 3, 6, 7],
            Face::NegY => [1, 3, 5, 7],
            Face::PosY => [0, 2, 4, 6],
            Face::NegZ => [4, 5, 6, 7],
            Face::PosZ => [0, 1, 2, 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octant_offsets_are_distinct_corners() {
        let mut seen = Vec::new();
        for i in 0..8u8 {
            let off = octant_offset(i, 1.0);
            assert_eq!(off.x.abs(), 1.0);
            assert_eq!(off.y.abs(), 1.0);
            assert_eq!(off.z.abs(), 1.0);
            assert!(!seen.contains(&off.to_array()), "octant {i} duplicated");
            seen.push(off.to_array());
        }
    }

    #[test]
    fn test_boundary_children_touch_shared_face() {
        // A neighbor one edge-length away in direction `face`: the four
        // boundary children must be the ones whose offset points back at us.
        for face in Face::ALL {
            let back = face.opposite().offset();
            for idx in face.boundary_children() {
                let off = octant_offset(idx as u8, 1.0);
                assert_eq!(
                    off.dot(back),
                    1.0,
                    "{face:?} child {idx} not on shared face"
                );
            }
        }
    }

    #[test]
    fn test_boundary_children_cover_face_exactly() {
        for face in Face::ALL {
            let mut indices = face.boundary_children().to_vec();
            indices.sort_unstable();
            indices.dedup();
            assert_eq!(indices.len(), 4);
        }
    }

    #[test]
    fn test_opposite_round_trips() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
        }
    }
}
