//! Procedural tree generation
//!
//! - [`params`]: growth parameters and presets
//! - [`attractor`]: crown attraction points
//! - [`skeleton`]: arena-backed branching skeleton
//! - [`spatial`]: nearest-node queries
//! - [`colonization`]: Space Colonization growth engine
//! - [`radius`]: branch thickness
//! - [`tree`]: parameters to skeleton and volume in one place

pub mod params;
pub mod attractor;
pub mod skeleton;
pub mod spatial;
pub mod colonization;
pub mod radius;
pub mod tree;

pub use params::{CrownShape, TreeParameters};
pub use attractor::{Attractor, AttractorField};
pub use skeleton::{NodeId, SkeletonDefect, TreeNode, TreeSkeleton};
pub use spatial::{BruteForceIndex, NearestNode};
pub use colonization::{DEFAULT_MAX_ITERATIONS, GrowthEngine, GrowthState, grow_tree};
pub use radius::assign_radii;
pub use tree::VolumetricTree;
