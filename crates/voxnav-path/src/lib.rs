//! Asynchronous path queries over a voxel octree navigation grid.
//!
//! [`NavVolume`] owns the spatial index built by `voxnav-octree` and runs a
//! budgeted, tick-driven scheduler for greedy best-first path searches.
//! [`NavWorker`] drives the scheduler from a background thread; results come
//! back through polling.
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxnav_path::{AgentId, NavVolume, NavVolumeConfig, NavWorker, ObstacleField, Vec3};
//!
//! let field = ObstacleField::new();
//! let volume = Arc::new(NavVolume::new(NavVolumeConfig::default(), field, Vec::new())?);
//! let worker = NavWorker::start(Arc::clone(&volume));
//!
//! let task = volume.schedule(AgentId(1), Vec3::splat(50.0), Vec3::splat(950.0))?;
//! // ... later: volume.poll(task)
//! worker.stop();
//! # Ok::<(), voxnav_path::NavError>(())
//! ```

mod frontier;
mod scheduler;
mod task;
mod worker;


pub use frontier::PriorityFrontier;
pub use scheduler::{NavVolume, NavVolumeConfig, TaskSnapshot};
pub use task::{AgentId, TaskId, TaskStatus};
pub use worker::NavWorker;

pub use voxnav_octree::{
    Aabb, CollisionClassifier, CostModifier, GridConfig, NavError, ObstacleField, Result,
};

/// Re-exported math types used throughout the public API.
pub use glam::Vec3;
