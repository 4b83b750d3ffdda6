//! Skeleton to density-volume rasterization
//!
//! Branches become tapered cylinders, stamped as a chain of soft spheres
//! into the wood channel. Branch tips get a noisy leaf cluster. The result
//! is a cubic RGBA8 volume plus its world-space bounds.
//!
//! The fill runs in parallel over x-slabs of the grid. Each slab replays
//! every stamp in the same order a single-threaded pass would, so the
//! output does not depend on thread scheduling.

use glam::Vec3;
use rayon::prelude::*;

use super::grid::{CHANNELS, VoxelGrid};
use crate::core::{EPSILON, Error, Result};
use crate::math::Aabb;
use crate::procgen::skeleton::TreeNode;

/// Padding around the skeleton beyond twice the largest radius
const BOUNDS_PADDING: f32 = 0.5;
/// Segments shorter than this (in voxels) are skipped
const MIN_SEGMENT_VOXELS: f32 = 0.001;
const MIN_LEAF_RADIUS_VOXELS: f32 = 1.5;
const MAX_LEAF_RADIUS_VOXELS: f32 = 4.0;
/// Leaf noise below this leaves a gap
const LEAF_NOISE_THRESHOLD: f32 = 0.15;
/// Leaf contribution to the combined alpha channel
const LEAF_OPACITY: f32 = 0.6;

/// Voxelization settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelizerSettings {
    /// Voxels per grid edge
    pub resolution: u32,
    /// Leaf density at branch tips (0 disables leaves)
    pub leaf_density: f32,
    /// Leaf cluster radius as a fraction of the grid edge
    pub leaf_cluster_size: f32,
}

impl Default for VoxelizerSettings {
    fn default() -> Self {
        Self {
            resolution: 64,
            leaf_density: 0.3,
            leaf_cluster_size: 0.4,
        }
    }
}

/// Voxel grid plus its placement in world space
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelizedTree {
    pub grid: VoxelGrid,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl VoxelizedTree {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.bounds_min, self.bounds_max)
    }

    /// World-space edge length of one voxel (0 for an empty volume)
    pub fn voxel_size(&self) -> f32 {
        let r = self.grid.resolution();
        if r == 0 {
            return 0.0;
        }
        self.bounds().max_extent() / r as f32
    }
}

/// A soft sphere in voxel space
#[derive(Debug, Clone, Copy)]
struct Stamp {
    center: Vec3,
    radius: f32,
}

impl Stamp {
    /// Half-open voxel range touched along one axis
    fn span(&self, axis: usize, resolution: u32) -> (u32, u32) {
        let c = self.center[axis];
        let lo = (c - self.radius - 1.0).floor().max(0.0) as u32;
        let hi = (c + self.radius + 1.0).ceil().clamp(0.0, resolution as f32) as u32;
        (lo, hi)
    }
}

/// Working values for one voxel before quantization
#[derive(Debug, Clone, Copy, Default)]
struct Density {
    wood: f32,
    leaf: f32,
    distance: f32,
}

/// Rasterizes radius-annotated skeleton nodes into a [`VoxelGrid`]
#[derive(Debug, Clone, Default)]
pub struct TreeVoxelizer {
    settings: VoxelizerSettings,
}

impl TreeVoxelizer {
    pub fn new(settings: VoxelizerSettings) -> Self {
        Self { settings }
    }

    pub fn with_resolution(resolution: u32) -> Self {
        Self::new(VoxelizerSettings {
            resolution,
            ..Default::default()
        })
    }

    /// Rasterize `nodes`; parent links index into the same slice
    pub fn voxelize(&self, nodes: &[TreeNode]) -> Result<VoxelizedTree> {
        let resolution = self.settings.resolution;
        if resolution == 0 {
            return Err(Error::Configuration("voxel resolution must be at least 1".into()));
        }

        let Some(bounds) = compute_bounds(nodes) else {
            return Ok(VoxelizedTree {
                grid: VoxelGrid::new(resolution),
                bounds_min: Vec3::ZERO,
                bounds_max: Vec3::ZERO,
            });
        };

        let edge = bounds.max_extent();
        let voxel_size = (edge / resolution as f32).max(EPSILON);
        let to_voxel = |p: Vec3| (p - bounds.min) / (bounds.size().max(Vec3::splat(EPSILON))) * resolution as f32;

        let wood = wood_stamps(nodes, voxel_size, &to_voxel);
        let leaves = if self.settings.leaf_density > 0.0 {
            let radius = (self.settings.leaf_cluster_size * edge / voxel_size)
                .clamp(MIN_LEAF_RADIUS_VOXELS, MAX_LEAF_RADIUS_VOXELS);
            nodes
                .iter()
                .filter(|n| n.is_tip())
                .map(|n| Stamp {
                    center: to_voxel(n.position),
                    radius,
                })
                .collect()
        } else {
            Vec::new()
        };

        let grid = self.rasterize(&wood, &leaves);

        log::debug!(
            "Voxelized {} nodes ({} wood stamps, {} leaf clusters) into {}^3, voxel size {:.4}",
            nodes.len(),
            wood.len(),
            leaves.len(),
            resolution,
            voxel_size
        );

        Ok(VoxelizedTree {
            grid,
            bounds_min: bounds.min,
            bounds_max: bounds.max,
        })
    }

    fn rasterize(&self, wood: &[Stamp], leaves: &[Stamp]) -> VoxelGrid {
        let res = self.settings.resolution;
        let plane = (res * res) as usize;
        let leaf_density = self.settings.leaf_density;

        let mut volume = vec![Density::default(); plane * res as usize];
        volume
            .par_chunks_mut(plane)
            .enumerate()
            .for_each(|(x, slab)| {
                let x = x as u32;
                for stamp in wood {
                    fill_wood(slab, x, res, stamp);
                }
                for stamp in leaves {
                    fill_leaf(slab, x, res, stamp, leaf_density);
                }
            });

        let mut data = vec![0u8; volume.len() * CHANNELS];
        data.par_chunks_mut(CHANNELS)
            .zip(volume.par_iter())
            .for_each(|(out, d)| {
                let wood = d.wood.clamp(0.0, 1.0);
                let leaf = d.leaf.clamp(0.0, 1.0);
                let distance = d.distance.clamp(0.0, 1.0);
                let alpha = wood.max(leaf * LEAF_OPACITY);
                out[0] = quantize(wood);
                out[1] = quantize(leaf);
                out[2] = quantize(distance);
                out[3] = quantize(alpha);
            });

        VoxelGrid::from_raw(res, data)
    }
}

/// Convenience wrapper over [`TreeVoxelizer`]
pub fn voxelize(
    nodes: &[TreeNode],
    resolution: u32,
    leaf_density: f32,
    leaf_cluster_size: f32,
) -> Result<VoxelizedTree> {
    TreeVoxelizer::new(VoxelizerSettings {
        resolution,
        leaf_density,
        leaf_cluster_size,
    })
    .voxelize(nodes)
}

/// Cubic bounds around all nodes, padded for branch thickness and leaves
fn compute_bounds(nodes: &[TreeNode]) -> Option<Aabb> {
    let tight = Aabb::from_points(nodes.iter().map(|n| n.position))?;
    let max_radius = nodes.iter().map(|n| n.radius).fold(0.0f32, f32::max);
    Some(tight.padded(max_radius * 2.0 + BOUNDS_PADDING).to_cubic())
}

/// Sphere chain along every parent -> node segment, radii linearly interpolated
fn wood_stamps(nodes: &[TreeNode], voxel_size: f32, to_voxel: &impl Fn(Vec3) -> Vec3) -> Vec<Stamp> {
    let mut stamps = Vec::new();
    for node in nodes {
        let Some(parent) = node.parent.and_then(|p| nodes.get(p)) else {
            continue;
        };
        let start = to_voxel(parent.position);
        let end = to_voxel(node.position);
        let r_start = parent.radius / voxel_size;
        let r_end = node.radius / voxel_size;

        let length = (end - start).length();
        if length < MIN_SEGMENT_VOXELS {
            continue;
        }
        let direction = (end - start) / length;

        let samples = ((length * 2.0) as usize).max(3);
        for i in 0..=samples {
            let t = i as f32 / samples as f32;
            stamps.push(Stamp {
                center: start + direction * (t * length),
                radius: r_start + (r_end - r_start) * t,
            });
        }
    }
    stamps
}

/// Apply `f(slab_index, dist)` to every voxel of slab `x` within `stamp.radius`
#[inline]
fn for_each_in_stamp(x: u32, res: u32, stamp: &Stamp, mut f: impl FnMut(usize, f32)) {
    let (x_lo, x_hi) = stamp.span(0, res);
    if x < x_lo || x >= x_hi {
        return;
    }
    let (y_lo, y_hi) = stamp.span(1, res);
    let (z_lo, z_hi) = stamp.span(2, res);
    for y in y_lo..y_hi {
        for z in z_lo..z_hi {
            let voxel_center = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
            let dist = (voxel_center - stamp.center).length();
            if dist <= stamp.radius {
                f((y * res + z) as usize, dist);
            }
        }
    }
}

fn fill_wood(slab: &mut [Density], x: u32, res: u32, stamp: &Stamp) {
    let radius = stamp.radius.max(EPSILON);
    for_each_in_stamp(x, res, stamp, |i, dist| {
        let falloff = (1.0 - (dist / radius).powi(2)).max(0.0);
        let cell = &mut slab[i];
        cell.wood = (cell.wood + falloff).min(1.0);
        cell.distance = cell.distance.max(1.0 - dist / stamp.radius.max(0.001));
    });
}

fn fill_leaf(slab: &mut [Density], x: u32, res: u32, stamp: &Stamp, density: f32) {
    for_each_in_stamp(x, res, stamp, |i, dist| {
        let falloff = (1.0 - (dist / stamp.radius).powf(1.5)).max(0.0);
        let y = (i as u32) / res;
        let z = (i as u32) % res;
        let noise = leaf_noise(x, y, z);
        if noise > LEAF_NOISE_THRESHOLD {
            let cell = &mut slab[i];
            cell.leaf = (cell.leaf + falloff * density * (0.5 + 0.5 * noise)).min(1.0);
        }
    });
}

/// Deterministic sinusoidal texture in [0, 1] over integer voxel coordinates
#[inline]
pub fn leaf_noise(x: u32, y: u32, z: u32) -> f32 {
    let (x, y, z) = (x as f32, y as f32, z as f32);
    ((x * 5.7).sin() * (y * 4.3).cos() * (z * 6.1).sin() + 1.0) * 0.5
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v * 255.0) as u8
}
