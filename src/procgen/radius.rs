//! Branch thickness
//!
//! Two passes run in order. The pipe model works leaves-up: a parent's
//! cross-section equals the sum of its children's. The decay pass then
//! walks root-down and sets every radius to `parent * radius_decay`,
//! which replaces the pipe-model value on every node. Final radii are
//! therefore `initial_radius * radius_decay^depth`, clamped to
//! `[min_radius, initial_radius]`.

use std::f32::consts::PI;

use super::params::TreeParameters;
use super::skeleton::{NodeId, TreeSkeleton};

/// Assign a radius to every node of a finished skeleton
pub fn assign_radii(skeleton: &mut TreeSkeleton, params: &TreeParameters) {
    if skeleton.is_empty() {
        return;
    }
    pipe_model_pass(skeleton, params);
    decay_pass(skeleton, params);
}

/// Leaves-up cross-section accumulation (da Vinci's rule)
pub fn pipe_model_pass(skeleton: &mut TreeSkeleton, params: &TreeParameters) {
    let min_radius = params.min_radius;
    let max_radius = params.initial_radius.max(min_radius);

    let mut by_depth: Vec<NodeId> = (0..skeleton.len()).collect();
    // Stable sort keeps creation order within a depth
    by_depth.sort_by_key(|&id| std::cmp::Reverse(skeleton.node(id).depth));

    for id in by_depth {
        let node = skeleton.node(id);
        let radius = if node.is_tip() {
            min_radius
        } else {
            let child_area: f32 = node
                .children
                .iter()
                .map(|&c| PI * skeleton.node(c).radius.powi(2))
                .sum();
            (child_area / PI).sqrt().clamp(min_radius, max_radius)
        };
        skeleton.node_mut(id).radius = radius;
    }
}

/// Root-down geometric decay, overwriting earlier radii
pub fn decay_pass(skeleton: &mut TreeSkeleton, params: &TreeParameters) {
    let Some(root) = skeleton.root() else {
        return;
    };
    skeleton.node_mut(root).radius = params.initial_radius;

    // Pre-order guarantees a parent is final before its children
    for id in skeleton.depth_first() {
        let Some(parent) = skeleton.node(id).parent else {
            continue;
        };
        let radius = (skeleton.node(parent).radius * params.radius_decay).max(params.min_radius);
        skeleton.node_mut(id).radius = radius;
    }
}
