//! Collision occupancy classification for octree cells.
//!
//! The builder never talks to a physics engine directly; it asks a
//! [`CollisionClassifier`] how occupied a cell is and decides from that. The
//! provided [`ObstacleField`] implementation estimates occupancy against a set
//! of axis-aligned obstacle boxes, which is enough for dynamic-obstacle
//! updates and for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use glam::Vec3;

use crate::aabb::Aabb;

/// Samples per axis of the occupancy estimate sub-grid.
const SAMPLE_AXIS: usize = 5;
/// Total sub-cells tested per cell (5x5x5).
const SAMPLE_TOTAL: usize = SAMPLE_AXIS * SAMPLE_AXIS * SAMPLE_AXIS;

/// Occupancy verdict for one cell volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// No blocking geometry overlaps the cell at all.
    pub clear: bool,
    /// Estimated fraction of the cell volume that is occupied, in `0.0..=1.0`.
    /// Meaningful only when not clear; the estimate may stop early once it
    /// reaches the requested fill threshold.
    pub occupied_fraction: f32,
}

impl Classification {
    /// A cell with no overlapping geometry.
    pub fn clear() -> Self {
        Self {
            clear: true,
            occupied_fraction: 0.0,
        }
    }
}

/// Narrow interface to external collision testing.
pub trait CollisionClassifier {
    /// Reports whether and how much of the cube at `center` with the given
    /// `half_extent` is occupied. `fill_threshold` (a fraction) lets the
    /// implementation stop estimating early once the cell is known to count
    /// as full.
    fn classify(&self, center: Vec3, half_extent: f32, fill_threshold: f32) -> Classification;
}

impl<C: CollisionClassifier + ?Sized> CollisionClassifier for &C {
    fn classify(&self, center: Vec3, half_extent: f32, fill_threshold: f32) -> Classification {
        (**self).classify(center, half_extent, fill_threshold)
    }
}

/// Handle to an obstacle registered in an [`ObstacleField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleId(u64);

#[derive(Debug, Default)]
struct FieldInner {
    next_id: u64,
    obstacles: HashMap<u64, Aabb>,
}

/// A shared, mutable set of axis-aligned obstacle boxes.
///
/// Clones share the same underlying set, so a caller can keep a handle for
/// inserting and removing obstacles while the navigation volume holds another
/// for classification.
#[derive(Debug, Clone, Default)]
pub struct ObstacleField {
    inner: Arc<RwLock<FieldInner>>,
}

impl ObstacleField {
    /// Creates an empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an obstacle and returns its handle.
    pub fn insert(&self, bounds: Aabb) -> ObstacleId {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.obstacles.insert(id, bounds);
        ObstacleId(id)
    }

    /// Removes an obstacle, returning its bounds if it was present.
    pub fn remove(&self, id: ObstacleId) -> Option<Aabb> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.obstacles.remove(&id.0)
    }

    /// Bounds of a registered obstacle.
    pub fn bounds_of(&self, id: ObstacleId) -> Option<Aabb> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.obstacles.get(&id.0).copied()
    }

    /// Bounding boxes of all obstacles overlapping `probe`.
    pub fn overlapping(&self, probe: &Aabb) -> Vec<Aabb> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .obstacles
            .values()
            .filter(|b| b.overlaps(probe))
            .copied()
            .collect()
    }
}

impl CollisionClassifier for ObstacleField {
    fn classify(&self, center: Vec3, half_extent: f32, fill_threshold: f32) -> Classification {
        let probe = Aabb::from_center_half_extent(center, Vec3::splat(half_extent));
        let overlaps = self.overlapping(&probe);
        if overlaps.is_empty() {
            return Classification::clear();
        }

        // 5x5x5 sub-grid of the cell; each sample box is exactly one
        // sub-cell. Stop counting once the cell qualifies as full.
        let early_exit = ((SAMPLE_TOTAL as f32 * fill_threshold).ceil() as usize).max(1);
        let sub_edge = half_extent * 2.0 / SAMPLE_AXIS as f32;
        let sub_half = Vec3::splat(sub_edge * 0.5);
        let min = center - Vec3::splat(half_extent);

        let mut occupied = 0usize;
        'sampling: for x in 0..SAMPLE_AXIS {
            for y in 0..SAMPLE_AXIS {
                for z in 0..SAMPLE_AXIS {
                    let sample_center = min
                        + Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5) * sub_edge;
                    let sample = Aabb::from_center_half_extent(sample_center, sub_half);
                    if overlaps.iter().any(|o| o.overlaps(&sample)) {
                        occupied += 1;
                        if occupied >= early_exit {
                            break 'sampling;
                        }
                    }
                }
            }
        }

        Classification {
            clear: false,
            occupied_fraction: occupied as f32 / SAMPLE_TOTAL as f32,
        }
    }
}
