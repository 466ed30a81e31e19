//! Octree construction: root grid generation, subdivision, localized rebuilds.

use std::time::Instant;

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aabb::Aabb;
use crate::cell::{CellId, Navigability};
use crate::classify::CollisionClassifier;
use crate::grid::VoxelGrid;
use crate::{NavError, Result};

/// Geometry and subdivision parameters for a navigation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Minimum corner of the indexed volume.
    pub origin: Vec3,
    /// Size of the indexed volume along each axis.
    pub extent: Vec3,
    /// Edge length of a root cell. The root grid covers `extent` with
    /// `ceil(extent / cell_size)` cells per axis.
    pub cell_size: f32,
    /// Deepest subdivision level; roots are level 0.
    pub max_depth: u8,
    /// Occupied-volume fraction at which a cell counts as `Blocked` without
    /// further subdivision.
    pub fill_threshold: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            extent: Vec3::splat(1000.0),
            cell_size: 100.0,
            max_depth: 5,
            fill_threshold: 0.8,
        }
    }
}

impl GridConfig {
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_extent(mut self, extent: Vec3) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_fill_threshold(mut self, fill_threshold: f32) -> Self {
        self.fill_threshold = fill_threshold;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err("cell size must be positive".to_string());
        }
        if self.extent.min_element() <= 0.0 {
            return Err("volume extent must be positive along every axis".to_string());
        }
        if self.max_depth > 16 {
            return Err("max depth must be at most 16".to_string());
        }
        if self.fill_threshold <= 0.0 || self.fill_threshold > 1.0 {
            return Err("fill threshold must be in (0, 1]".to_string());
        }
        Ok(())
    }
}

/// A region that scales the traversal cost of every leaf it overlaps.
///
/// Modifier regions are consumed as input at build time; nothing recomputes
/// them afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModifier {
    pub bounds: Aabb,
    pub multiplier: f32,
}

/// Builds the full navigation grid for `config`.
///
/// Fails fast on malformed configuration; classification failures do not
/// exist (a classifier always produces a verdict).
pub fn build_grid(
    config: &GridConfig,
    classifier: &impl CollisionClassifier,
    modifiers: &[CostModifier],
) -> Result<VoxelGrid> {
    config.validate().map_err(NavError::InvalidConfig)?;

    let dims = UVec3::new(
        (config.extent.x / config.cell_size).ceil() as u32,
        (config.extent.y / config.cell_size).ceil() as u32,
        (config.extent.z / config.cell_size).ceil() as u32,
    );

    let start = Instant::now();
    let mut grid = VoxelGrid::new(config.origin, config.cell_size, dims, config.max_depth);
    let roots: Vec<CellId> = grid.roots().collect();
    for root in roots {
        subdivide(&mut grid, root, config, classifier, modifiers);
    }

    info!(
        cells = grid.live_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "built navigation grid"
    );
    Ok(grid)
}

/// Resets each given root cell to an `Open` leaf and re-subdivides it against
/// the current collision state. Cells outside the given subtrees, and their
/// ids, are untouched.
pub fn rebuild_roots(
    grid: &mut VoxelGrid,
    roots: &[CellId],
    config: &GridConfig,
    classifier: &impl CollisionClassifier,
    modifiers: &[CostModifier],
) {
    for &root in roots {
        if grid.cell(root).parent.is_some() {
            debug_assert!(false, "rebuild target must be a root cell");
            continue;
        }
        grid.reset_to_leaf(root);
        subdivide(grid, root, config, classifier, modifiers);
    }
}

/// Classifies `root` and recursively subdivides it, iteratively with an
/// explicit stack.
fn subdivide(
    grid: &mut VoxelGrid,
    root: CellId,
    config: &GridConfig,
    classifier: &impl CollisionClassifier,
    modifiers: &[CostModifier],
) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let (center, half_extent, level) = {
            let cell = grid.cell(id);
            (cell.center, cell.half_extent, cell.level)
        };

        let occupancy = classifier.classify(center, half_extent, config.fill_threshold);
        let verdict = if occupancy.clear {
            Navigability::Open
        } else if occupancy.occupied_fraction >= config.fill_threshold {
            Navigability::Blocked
        } else if level >= config.max_depth {
            // Depth limit reached: the classifier's binary verdict decides,
            // and anything still overlapped is impassable.
            Navigability::Blocked
        } else {
            stack.extend(grid.attach_children(id));
            continue;
        };

        let bounds = Aabb::from_center_half_extent(center, Vec3::splat(half_extent));
        let mut cost = 1.0;
        for modifier in modifiers {
            if modifier.bounds.overlaps(&bounds) {
                cost *= modifier.multiplier;
            }
        }

        let cell = grid.cell_mut(id);
        cell.state = verdict;
        cell.cost = cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ObstacleField;

    fn config_3x3x3() -> GridConfig {
        GridConfig::default()
            .with_extent(Vec3::splat(30.0))
            .with_cell_size(10.0)
            .with_max_depth(2)
    }

    /// Every live cell reachable from the roots.
    fn walk(grid: &VoxelGrid) -> Vec<CellId> {
        let mut out = Vec::new();
        let mut stack: Vec<CellId> = grid.roots().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(children) = grid.cell(id).children {
                stack.extend(children);
            }
        }
        out
    }

    #[test]
    fn test_rejects_invalid_config() {
        let field = ObstacleField::new();
        let bad = config_3x3x3().with_cell_size(0.0);
        assert!(matches!(
            build_grid(&bad, &field, &[]),
            Err(NavError::InvalidConfig(_))
        ));

        let bad = config_3x3x3().with_fill_threshold(0.0);
        assert!(matches!(
            build_grid(&bad, &field, &[]),
            Err(NavError::InvalidConfig(_))
        ));

        let bad = config_3x3x3().with_extent(Vec3::new(10.0, -1.0, 10.0));
        assert!(build_grid(&bad, &field, &[]).is_err());
    }

    #[test]
    fn test_clear_volume_is_open_roots_only() {
        let grid = build_grid(&config_3x3x3(), &ObstacleField::new(), &[]).unwrap();
        assert_eq!(grid.dims(), UVec3::splat(3));
        assert_eq!(grid.live_count(), 27);
        for id in grid.roots() {
            let cell = grid.cell(id);
            assert_eq!(cell.state, Navigability::Open);
            assert!(cell.is_leaf());
        }
    }

    #[test]
    fn test_full_root_is_blocked_without_children() {
        let field = ObstacleField::new();
        // Swallows the root cell at (0,0,0)..(10,10,10) whole.
        field.insert(Aabb::new(Vec3::splat(-1.0), Vec3::splat(11.0)));

        let grid = build_grid(&config_3x3x3(), &field, &[]).unwrap();
        let root = grid.root_at(0, 0, 0).unwrap();
        assert_eq!(grid.cell(root).state, Navigability::Blocked);
        assert!(grid.cell(root).is_leaf());
    }

    #[test]
    fn test_partial_overlap_subdivides() {
        let field = ObstacleField::new();
        // Small box in one corner of the first root cell.
        field.insert(Aabb::new(Vec3::ZERO, Vec3::splat(2.0)));

        let grid = build_grid(&config_3x3x3(), &field, &[]).unwrap();
        let root = grid.root_at(0, 0, 0).unwrap();
        assert_eq!(grid.cell(root).state, Navigability::Subdivided);

        let cells = walk(&grid);

        // Depth bound and partition invariant.
        for &id in &cells {
            let cell = grid.cell(id);
            assert!(cell.level <= 2);
            match cell.children {
                Some(children) => {
                    assert_eq!(cell.state, Navigability::Subdivided);
                    for child in children {
                        assert_eq!(grid.cell(child).half_extent, cell.half_extent * 0.5);
                        assert_eq!(grid.cell(child).parent, Some(id));
                    }
                }
                None => assert_ne!(cell.state, Navigability::Subdivided),
            }
        }

        // The obstacle corner must resolve to a blocked leaf at the depth
        // limit, far corners stay open.
        let blocked = grid.locate(Vec3::splat(1.0)).unwrap();
        assert_eq!(grid.cell(blocked).state, Navigability::Blocked);
        assert_eq!(grid.cell(blocked).level, 2);
        let open = grid.locate(Vec3::splat(29.0)).unwrap();
        assert_eq!(grid.cell(open).state, Navigability::Open);
    }

    #[test]
    fn test_point_location_totality() {
        let field = ObstacleField::new();
        field.insert(Aabb::new(Vec3::splat(4.0), Vec3::splat(13.0)));
        let grid = build_grid(&config_3x3x3(), &field, &[]).unwrap();

        let mut probes = Vec::new();
        for x in 0..30 {
            for y in 0..15 {
                for z in 0..10 {
                    probes.push(Vec3::new(
                        x as f32 + 0.5,
                        y as f32 * 2.0 + 0.3,
                        z as f32 * 3.0 + 0.7,
                    ));
                }
            }
        }
        for probe in probes {
            let id = grid.locate(probe).expect("in-bounds probe must resolve");
            let cell = grid.cell(id);
            assert!(cell.is_leaf());
            assert_ne!(cell.state, Navigability::Subdivided);
            assert!(cell.bounds().contains_point(probe));
        }
    }

    #[test]
    fn test_cost_modifiers_scale_leaves() {
        let modifiers = [CostModifier {
            bounds: Aabb::new(Vec3::ZERO, Vec3::splat(10.0)),
            multiplier: 2.5,
        }];
        let grid = build_grid(&config_3x3x3(), &ObstacleField::new(), &modifiers).unwrap();

        let inside = grid.locate(Vec3::splat(5.0)).unwrap();
        assert_eq!(grid.cell(inside).cost, 2.5);
        let outside = grid.locate(Vec3::splat(25.0)).unwrap();
        assert_eq!(grid.cell(outside).cost, 1.0);
    }

    #[test]
    fn test_rebuild_tracks_obstacle_changes() {
        let field = ObstacleField::new();
        let config = config_3x3x3();
        let mut grid = build_grid(&config, &field, &[]).unwrap();

        let root = grid.root_at(1, 1, 1).unwrap();
        let sibling = grid.root_at(0, 0, 0).unwrap();
        assert_eq!(grid.cell(root).state, Navigability::Open);

        // Obstacle appears inside the middle root cell.
        let id = field.insert(Aabb::new(Vec3::splat(12.5), Vec3::splat(17.5)));
        rebuild_roots(&mut grid, &[root], &config, &field, &[]);
        assert_eq!(grid.cell(root).state, Navigability::Subdivided);
        assert_eq!(grid.cell(sibling).state, Navigability::Open);
        assert!(grid.cell(sibling).is_leaf());

        // And goes away again.
        field.remove(id);
        rebuild_roots(&mut grid, &[root], &config, &field, &[]);
        assert_eq!(grid.cell(root).state, Navigability::Open);
        assert!(grid.cell(root).is_leaf());
        assert_eq!(grid.live_count(), 27);
    }
}
