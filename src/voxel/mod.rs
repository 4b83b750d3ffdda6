//! Voxel volumes built from tree skeletons

pub mod grid;
pub mod voxelizer;

pub use grid::{Channel, VoxelGrid};
pub use voxelizer::{TreeVoxelizer, VoxelizedTree, VoxelizerSettings, voxelize};
