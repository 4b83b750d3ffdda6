//! Dense RGBA8 density volume

use glam::UVec3;

/// Channels per voxel
pub const CHANNELS: usize = 4;

/// Meaning of each byte of a voxel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Channel {
    /// Branch density (R)
    Wood = 0,
    /// Leaf density (G)
    Leaf = 1,
    /// Closeness to a branch axis, 1 at the axis (B)
    Distance = 2,
    /// Combined opacity for ray-marching (A)
    Alpha = 3,
}

/// A `resolution³ × 4` byte volume laid out `[x][y][z][channel]`,
/// ready to upload as an RGBA8 3D texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    resolution: u32,
    data: Vec<u8>,
}

impl VoxelGrid {
    /// All-zero grid
    pub fn new(resolution: u32) -> Self {
        let r = resolution as usize;
        Self {
            resolution,
            data: vec![0; r * r * r * CHANNELS],
        }
    }

    pub(crate) fn from_raw(resolution: u32, data: Vec<u8>) -> Self {
        let r = resolution as usize;
        debug_assert_eq!(data.len(), r * r * r * CHANNELS);
        Self { resolution, data }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Array shape `(resolution, resolution, resolution, 4)`
    pub fn shape(&self) -> [usize; 4] {
        let r = self.resolution as usize;
        [r, r, r, CHANNELS]
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Linear voxel index of `(x, y, z)`
    #[inline]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let r = self.resolution as usize;
        (x as usize * r + y as usize) * r + z as usize
    }

    /// RGBA bytes of one voxel, None outside the grid
    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<[u8; CHANNELS]> {
        if x >= self.resolution || y >= self.resolution || z >= self.resolution {
            return None;
        }
        let i = self.index(x, y, z) * CHANNELS;
        let mut voxel = [0; CHANNELS];
        voxel.copy_from_slice(&self.data[i..i + CHANNELS]);
        Some(voxel)
    }

    /// Every value of one channel, in voxel order
    pub fn channel(&self, channel: Channel) -> impl Iterator<Item = u8> + '_ {
        self.data.iter().skip(channel as usize).step_by(CHANNELS).copied()
    }

    pub fn channel_sum(&self, channel: Channel) -> u64 {
        self.channel(channel).map(u64::from).sum()
    }

    /// Number of voxels with a non-zero value in `channel`
    pub fn occupied(&self, channel: Channel) -> usize {
        self.channel(channel).filter(|&v| v > 0).count()
    }

    /// Coordinates of voxels with a non-zero value in `channel`
    pub fn occupied_coords(&self, channel: Channel) -> Vec<UVec3> {
        let r = self.resolution;
        self.channel(channel)
            .enumerate()
            .filter(|(_, v)| *v > 0)
            .map(|(i, _)| {
                let i = i as u32;
                UVec3::new(i / (r * r), (i / r) % r, i % r)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}
