//! Arbor - procedural volumetric trees
//!
//! Space Colonization grows a branching skeleton inside a crown volume,
//! a pipe-model/decay pass gives every node a radius, and the voxelizer
//! rasterizes the result into an RGBA8 density volume for ray-marching.

pub mod core;
pub mod math;
pub mod procgen;
pub mod voxel;

pub use crate::core::{Error, Result};
pub use procgen::{CrownShape, GrowthEngine, TreeParameters, TreeSkeleton, VolumetricTree};
pub use voxel::{VoxelGrid, VoxelizedTree, voxelize};
