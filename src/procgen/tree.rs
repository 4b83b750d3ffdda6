//! Volumetric tree: parameters in, skeleton and density volume out

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::colonization::{DEFAULT_MAX_ITERATIONS, GrowthEngine};
use super::params::TreeParameters;
use super::radius::assign_radii;
use super::skeleton::TreeSkeleton;
use crate::core::Result;
use crate::voxel::{TreeVoxelizer, VoxelizedTree, VoxelizerSettings};

/// A procedurally generated tree and its voxel volume.
///
/// The skeleton is grown on first use unless one was supplied; the volume
/// is computed once and cached.
#[derive(Debug, Clone)]
pub struct VolumetricTree {
    params: TreeParameters,
    seed: u64,
    max_iterations: u32,
    voxelizer: VoxelizerSettings,
    skeleton: Option<TreeSkeleton>,
    volume: Option<VoxelizedTree>,
}

impl VolumetricTree {
    pub fn new(params: TreeParameters) -> Self {
        Self {
            params,
            seed: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            voxelizer: VoxelizerSettings::default(),
            skeleton: None,
            volume: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_voxelizer(mut self, settings: VoxelizerSettings) -> Self {
        self.voxelizer = settings;
        self
    }

    /// Use an existing skeleton instead of growing one
    pub fn with_skeleton(mut self, skeleton: TreeSkeleton) -> Self {
        self.skeleton = Some(skeleton);
        self.volume = None;
        self
    }

    pub fn params(&self) -> &TreeParameters {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_compiled(&self) -> bool {
        self.volume.is_some()
    }

    fn grow(&self) -> Result<TreeSkeleton> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut engine = GrowthEngine::new(self.params.clone(), &mut rng)?;
        engine.run(self.max_iterations);
        let mut skeleton = engine.into_skeleton();
        assign_radii(&mut skeleton, &self.params);
        log::info!("Generated tree with {} nodes (seed {})", skeleton.len(), self.seed);
        Ok(skeleton)
    }

    /// Grow and thicken the skeleton if it does not exist yet
    pub fn skeleton(&mut self) -> Result<&TreeSkeleton> {
        let skeleton = match self.skeleton.take() {
            Some(skeleton) => skeleton,
            None => self.grow()?,
        };
        Ok(&*self.skeleton.insert(skeleton))
    }

    /// Skeleton and voxel volume, computing whatever is missing
    pub fn compile(&mut self) -> Result<(&TreeSkeleton, &VoxelizedTree)> {
        let settings = self.voxelizer;
        let skeleton = match self.skeleton.take() {
            Some(skeleton) => skeleton,
            None => self.grow()?,
        };
        let skeleton = &*self.skeleton.insert(skeleton);

        let volume = match self.volume.take() {
            Some(volume) => volume,
            None => {
                let volume = TreeVoxelizer::new(settings).voxelize(skeleton.nodes())?;
                log::info!(
                    "Voxelized tree: bounds {:?} to {:?}",
                    volume.bounds_min,
                    volume.bounds_max
                );
                volume
            }
        };
        Ok((skeleton, &*self.volume.insert(volume)))
    }
}
