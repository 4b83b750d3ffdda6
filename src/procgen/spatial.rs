//! Nearest-node queries used by the growth loop
//!
//! The growth engine only needs "which node is closest to this point, and
//! how far away is it". That capability is the [`NearestNode`] trait so a
//! grid or k-d tree can replace the brute-force scan without touching the
//! engine.

use glam::Vec3;
use rayon::prelude::*;

use super::skeleton::NodeId;

/// Nearest-neighbour lookup over a fixed set of node positions
pub trait NearestNode: Sync {
    /// Build an index over the given node positions (index = NodeId)
    fn build(positions: &[Vec3]) -> Self
    where
        Self: Sized;

    /// Closest node to `point` and its Euclidean distance.
    /// Ties resolve to the lowest node id.
    fn nearest(&self, point: Vec3) -> Option<(NodeId, f32)>;

    /// Answer many queries at once; results line up with `points`
    fn nearest_batch(&self, points: &[Vec3]) -> Vec<Option<(NodeId, f32)>> {
        points.par_iter().map(|&p| self.nearest(p)).collect()
    }
}

/// Linear scan over every node
#[derive(Debug, Clone, Default)]
pub struct BruteForceIndex {
    positions: Vec<Vec3>,
}

impl NearestNode for BruteForceIndex {
    fn build(positions: &[Vec3]) -> Self {
        Self {
            positions: positions.to_vec(),
        }
    }

    fn nearest(&self, point: Vec3) -> Option<(NodeId, f32)> {
        let mut best = None;
        let mut best_d2 = f32::INFINITY;
        for (id, pos) in self.positions.iter().enumerate() {
            let d2 = (*pos - point).length_squared();
            if d2 < best_d2 {
                best_d2 = d2;
                best = Some(id);
            }
        }
        best.map(|id| (id, best_d2.sqrt()))
    }
}
