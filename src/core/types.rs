//! Core type aliases and re-exports

pub use glam::{UVec3, Vec3};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Guard used wherever a division by a vector norm or radius could hit zero
pub const EPSILON: f32 = 1e-6;
