//! Collision-driven sparse voxel octree for 3D volume navigation.
//!
//! The volume is partitioned into a grid of cubic root cells, each of which is
//! recursively subdivided wherever blocking geometry overlaps it. The result is
//! a navigable spatial index: every leaf cell carries an `Open`/`Blocked`
//! verdict, and face-adjacent leaves can be resolved across subdivision levels.
//!
//! Collision testing itself is external: the builder talks to it through the
//! narrow [`CollisionClassifier`] trait. An AABB-based implementation
//! ([`ObstacleField`]) is provided for dynamic obstacle sets and tests.

mod aabb;
mod builder;
mod cell;
mod classify;
mod grid;
mod neighbor;

pub use aabb::Aabb;
pub use builder::{build_grid, rebuild_roots, CostModifier, GridConfig};
pub use cell::{Cell, CellId, Face, Navigability};
pub use classify::{Classification, CollisionClassifier, ObstacleField, ObstacleId};
pub use grid::VoxelGrid;
pub use neighbor::{find_neighbors, neighbors_of};

use glam::Vec3;

/// Error type shared by the octree and pathfinding crates.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("point ({0}) is outside the navigation volume")]
    OutOfBounds(Vec3),
}

/// Result type for navigation volume operations.
pub type Result<T> = std::result::Result<T, NavError>;
