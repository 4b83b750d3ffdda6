//! Space Colonization growth
//!
//! A trunk is laid from the base up to the crown, attractors are scattered
//! through the crown, then every iteration:
//!
//! 1. each active attractor finds its nearest node,
//! 2. attractors closer than `kill_distance` to that node are removed,
//! 3. the rest pull on their nearest node if it lies within
//!    `attraction_distance`,
//! 4. every pulled node grows one child along the mean pull direction.
//!
//! Growth stops when nothing is left to pull or no node grew.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use glam::Vec3;
use rand::Rng;

use super::attractor::AttractorField;
use super::params::TreeParameters;
use super::skeleton::{NodeId, TreeSkeleton};
use super::spatial::{BruteForceIndex, NearestNode};
use crate::core::{EPSILON, Result};

/// Default iteration cap for [`GrowthEngine::run`]
pub const DEFAULT_MAX_ITERATIONS: u32 = 500;

/// Lifecycle of a growth run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthState {
    /// Trunk under construction
    Initializing,
    Growing,
    Terminated,
}

/// Outcome of one growth iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StepReport {
    killed: usize,
    influencing: usize,
    grown: usize,
}

/// Grows a [`TreeSkeleton`] toward an [`AttractorField`]
pub struct GrowthEngine<I: NearestNode = BruteForceIndex> {
    params: TreeParameters,
    skeleton: TreeSkeleton,
    attractors: AttractorField,
    state: GrowthState,
    iterations: u32,
    _index: PhantomData<I>,
}

impl GrowthEngine<BruteForceIndex> {
    /// Validate parameters, build the trunk and distribute attractors
    pub fn new(params: TreeParameters, rng: &mut impl Rng) -> Result<Self> {
        Self::with_index(params, rng)
    }
}

impl<I: NearestNode> GrowthEngine<I> {
    /// Like [`GrowthEngine::new`] with a caller-chosen nearest-node index
    pub fn with_index(params: TreeParameters, rng: &mut impl Rng) -> Result<Self> {
        params.validate()?;
        let attractors = AttractorField::distribute(&params, rng)?;
        Self::with_attractors(params, attractors)
    }

    /// Start a run against an existing attractor field
    pub fn with_attractors(params: TreeParameters, attractors: AttractorField) -> Result<Self> {
        params.validate()?;
        let mut engine = Self {
            skeleton: TreeSkeleton::with_root(params.base_position),
            params,
            attractors,
            state: GrowthState::Initializing,
            iterations: 0,
            _index: PhantomData,
        };
        engine.build_trunk()?;
        engine.state = GrowthState::Growing;
        Ok(engine)
    }

    fn build_trunk(&mut self) -> Result<()> {
        let axis = self.params.trunk_axis()?;
        let base = self.params.base_position;
        let step = self.params.segment_length;

        let mut current: NodeId = 0;
        for i in 1..=self.params.trunk_segments() {
            current = self.skeleton.add_child(current, base + axis * (step * i as f32));
        }

        log::debug!("Trunk built with {} nodes", self.skeleton.len());
        Ok(())
    }

    pub fn state(&self) -> GrowthState {
        self.state
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn skeleton(&self) -> &TreeSkeleton {
        &self.skeleton
    }

    pub fn attractors(&self) -> &AttractorField {
        &self.attractors
    }

    pub fn params(&self) -> &TreeParameters {
        &self.params
    }

    pub fn into_skeleton(self) -> TreeSkeleton {
        self.skeleton
    }

    /// Run one iteration; returns true if the skeleton grew
    pub fn step(&mut self) -> bool {
        if self.state != GrowthState::Growing {
            return false;
        }
        self.iterations += 1;

        let report = self.grow_once();
        log::debug!(
            "Iteration {}: killed {}, influencing {}, grew {} (nodes {}, active attractors {})",
            self.iterations,
            report.killed,
            report.influencing,
            report.grown,
            self.skeleton.len(),
            self.attractors.active_count()
        );

        if report.grown == 0 {
            self.state = GrowthState::Terminated;
            return false;
        }
        true
    }

    fn grow_once(&mut self) -> StepReport {
        let mut report = StepReport::default();

        let (active_indices, active_positions) = self.attractors.active();
        if active_indices.is_empty() {
            return report;
        }

        let index = I::build(&self.skeleton.positions());
        let nearest = index.nearest_batch(&active_positions);

        let kill_distance = self.params.kill_distance;
        let attraction_distance = self.params.attraction_distance;

        // node -> attractor positions pulling on it, ordered by node id
        let mut influences: BTreeMap<NodeId, Vec<Vec3>> = BTreeMap::new();
        for ((&ai, &position), hit) in active_indices.iter().zip(&active_positions).zip(nearest) {
            let Some((node, dist)) = hit else {
                continue;
            };
            if dist < kill_distance {
                self.attractors.deactivate(ai);
                report.killed += 1;
                continue;
            }
            if dist < attraction_distance {
                influences.entry(node).or_default().push(position);
                report.influencing += 1;
            }
        }

        let segment_length = self.params.segment_length;
        for (node_id, targets) in influences {
            let origin = self.skeleton.node(node_id).position;
            let Some(direction) = mean_direction(origin, &targets) else {
                continue;
            };
            self.skeleton.add_child(node_id, origin + direction * segment_length);
            report.grown += 1;
        }

        report
    }

    /// Iterate until growth stops or `max_iterations` is reached.
    /// Returns the number of iterations performed.
    pub fn run(&mut self, max_iterations: u32) -> u32 {
        let start_nodes = self.skeleton.len();
        let mut performed = 0;
        while performed < max_iterations && self.state == GrowthState::Growing {
            performed += 1;
            if !self.step() {
                break;
            }
        }
        self.state = GrowthState::Terminated;

        log::info!(
            "Grew {} nodes in {} iterations ({} total, {}/{} attractors remaining)",
            self.skeleton.len() - start_nodes,
            self.iterations,
            self.skeleton.len(),
            self.attractors.active_count(),
            self.attractors.len()
        );
        performed
    }
}

/// Normalized mean of the unit vectors from `origin` to each target, or
/// None when the pulls cancel out
fn mean_direction(origin: Vec3, targets: &[Vec3]) -> Option<Vec3> {
    if targets.is_empty() {
        return None;
    }
    let sum: Vec3 = targets
        .iter()
        .map(|&t| {
            let d = t - origin;
            d / d.length().max(EPSILON)
        })
        .sum();
    let mean = sum / targets.len() as f32;
    let len = mean.length();
    if len < EPSILON {
        return None;
    }
    Some(mean / len)
}

/// Grow a complete skeleton with the default brute-force index
pub fn grow_tree(
    params: &TreeParameters,
    rng: &mut impl Rng,
    max_iterations: u32,
) -> Result<TreeSkeleton> {
    let mut engine = GrowthEngine::new(params.clone(), rng)?;
    engine.run(max_iterations);
    Ok(engine.into_skeleton())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::procgen::params::CrownShape;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn engine(params: TreeParameters, field: AttractorField) -> GrowthEngine {
        GrowthEngine::with_attractors(params, field).unwrap()
    }

    fn grow(params: &TreeParameters, seed: u64, max_iterations: u32) -> TreeSkeleton {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        grow_tree(params, &mut rng, max_iterations).unwrap()
    }

    #[test]
    fn test_zero_trunk_direction_is_configuration_error() {
        let params = TreeParameters {
            trunk_direction: Vec3::ZERO,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            GrowthEngine::new(params, &mut rng),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_huge_trunk_is_configuration_error() {
        let params = TreeParameters {
            crown_offset: 1.0e8,
            segment_length: 1.0,
            attractor_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            GrowthEngine::<BruteForceIndex>::with_attractors(params, AttractorField::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_inverted_radius_range_is_configuration_error() {
        let params = TreeParameters {
            min_radius: 0.5,
            initial_radius: 0.1,
            attractor_count: 50,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(grow_tree(&params, &mut rng, 10), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_trunk_reaches_crown_offset() {
        let params = TreeParameters {
            crown_offset: 1.0,
            segment_length: 0.25,
            attractor_count: 0,
            ..Default::default()
        };
        let engine = engine(params, AttractorField::default());
        let skeleton = engine.skeleton();

        assert_eq!(engine.state(), GrowthState::Growing);
        assert_eq!(skeleton.len(), 5);
        for (i, node) in skeleton.nodes().iter().enumerate() {
            assert_eq!(node.depth as usize, i);
            assert!((node.position.y - 0.25 * i as f32).abs() < 1e-5);
        }
        assert!(skeleton.validate().is_ok());
    }

    #[test]
    fn test_single_attractor_pulls_tip() {
        let params = TreeParameters {
            crown_offset: 0.0,
            segment_length: 0.5,
            attraction_distance: 5.0,
            kill_distance: 0.1,
            ..Default::default()
        };
        let field = AttractorField::from_positions([Vec3::new(2.0, 0.0, 0.0)]);
        let mut engine = engine(params, field);

        assert!(engine.step());
        let child = engine.skeleton().node(1);
        assert_eq!(child.parent, Some(0));
        assert!((child.position - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        assert_eq!(child.depth, 1);
    }

    #[test]
    fn test_kill_rule_deactivates_close_attractors() {
        let params = TreeParameters {
            crown_offset: 0.0,
            kill_distance: 0.5,
            attraction_distance: 3.0,
            ..Default::default()
        };
        let field = AttractorField::from_positions([Vec3::new(0.2, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]);
        let mut engine = engine(params, field);

        engine.step();
        assert!(!engine.attractors().get(0).unwrap().active);
        assert!(engine.attractors().get(1).unwrap().active);
        // Only the surviving attractor pulled the root
        assert_eq!(engine.skeleton().len(), 2);
        assert!(engine.skeleton().node(1).position.x > 0.0);
    }

    #[test]
    fn test_out_of_range_attractor_has_no_effect() {
        let params = TreeParameters {
            crown_offset: 0.0,
            attraction_distance: 1.0,
            ..Default::default()
        };
        let field = AttractorField::from_positions([Vec3::new(10.0, 0.0, 0.0)]);
        let mut engine = engine(params, field);

        assert!(!engine.step());
        assert_eq!(engine.state(), GrowthState::Terminated);
        assert_eq!(engine.skeleton().len(), 1);
        assert!(engine.attractors().get(0).unwrap().active);
    }

    #[test]
    fn test_cancelling_pulls_do_not_grow() {
        let params = TreeParameters {
            crown_offset: 0.0,
            attraction_distance: 5.0,
            kill_distance: 0.1,
            ..Default::default()
        };
        let field = AttractorField::from_positions([Vec3::X, Vec3::NEG_X]);
        let mut engine = engine(params, field);

        assert!(!engine.step());
        assert_eq!(engine.skeleton().len(), 1);
    }

    #[test]
    fn test_mean_direction() {
        let dir = mean_direction(Vec3::ZERO, &[Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 0.5, 0.0)]).unwrap();
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((dir - expected).length() < 1e-6);
        // Attractor sitting on the node contributes a zero vector, not NaN
        assert!(mean_direction(Vec3::ZERO, &[Vec3::ZERO]).is_none());
    }

    #[test]
    fn test_growth_respects_iteration_cap() {
        let params = TreeParameters::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut engine = GrowthEngine::new(params, &mut rng).unwrap();
        let performed = engine.run(3);
        assert!(performed <= 3);
        assert_eq!(engine.iterations(), performed);
        assert_eq!(engine.state(), GrowthState::Terminated);
        assert!(!engine.step());
    }

    #[test]
    fn test_grown_skeleton_is_a_tree() {
        for shape in [CrownShape::Sphere, CrownShape::Cone, CrownShape::Cylinder, CrownShape::Ellipsoid] {
            let params = TreeParameters {
                crown_shape: shape,
                attractor_count: 200,
                ..Default::default()
            };
            let skeleton = grow(&params, 7, 100);
            assert!(skeleton.validate().is_ok(), "{:?} skeleton invalid", shape);
            assert_eq!(skeleton.root(), Some(0));
        }
    }

    #[test]
    fn test_colonization_produces_branches() {
        let skeleton = grow(&TreeParameters::oak(), 42, DEFAULT_MAX_ITERATIONS);
        assert!(skeleton.len() > 50, "Expected crown growth, got {} nodes", skeleton.len());
        assert!(skeleton.tip_count() > 1, "Expected more than one branch tip");
    }

    #[test]
    fn test_same_seed_same_skeleton() {
        let params = TreeParameters {
            attractor_count: 100,
            ..Default::default()
        };
        let a = grow(&params, 1, 50);
        let b = grow(&params, 1, 50);
        assert_eq!(a.len(), b.len());
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_different_trees() {
        let params = TreeParameters::default();
        let a = grow(&params, 1, 100);
        let b = grow(&params, 2, 100);
        assert!(a.positions() != b.positions());
    }
}
