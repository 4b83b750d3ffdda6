//! Attraction points distributed through the crown volume

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use super::params::{CrownShape, TreeParameters};
use crate::core::Result;

/// A growth target. Starts active; once killed it never comes back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attractor {
    pub position: Vec3,
    pub active: bool,
}

/// The set of attractors for one growth run
#[derive(Debug, Clone, Default)]
pub struct AttractorField {
    points: Vec<Attractor>,
}

impl AttractorField {
    /// Build a field of active attractors at explicit positions
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let points = positions
            .into_iter()
            .map(|position| Attractor {
                position,
                active: true,
            })
            .collect();
        Self { points }
    }

    /// Distribute `attractor_count` points inside the crown volume
    pub fn distribute(params: &TreeParameters, rng: &mut impl Rng) -> Result<Self> {
        let axis = params.trunk_axis()?;
        let center = params.crown_center()?;
        let radius = params.crown_radius;
        let height = radius * 2.0;

        let positions: Vec<Vec3> = (0..params.attractor_count)
            .map(|_| match params.crown_shape {
                CrownShape::Sphere => center + random_in_unit_ball(rng) * radius,
                CrownShape::Cone => {
                    random_in_cone(rng, center - axis * radius, axis, height, radius)
                }
                CrownShape::Cylinder => random_in_cylinder(rng, center, axis, height, radius),
                CrownShape::Ellipsoid => {
                    center + random_in_unit_ball(rng) * (params.bounding_size * 0.5)
                }
            })
            .collect();

        log::debug!(
            "Distributed {} attractors in {} crown at {:?}",
            positions.len(),
            params.crown_shape.name(),
            center
        );

        Ok(Self::from_positions(positions))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.points.iter().filter(|a| a.active).count()
    }

    pub fn any_active(&self) -> bool {
        self.points.iter().any(|a| a.active)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attractor> {
        self.points.iter()
    }

    /// Positions of every attractor, active or not
    pub fn positions(&self) -> Vec<Vec3> {
        self.points.iter().map(|a| a.position).collect()
    }

    pub fn get(&self, index: usize) -> Option<&Attractor> {
        self.points.get(index)
    }

    /// Indices and positions of the attractors still active
    pub fn active(&self) -> (Vec<usize>, Vec<Vec3>) {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, a)| a.active)
            .map(|(i, a)| (i, a.position))
            .unzip()
    }

    /// Kill an attractor permanently
    pub fn deactivate(&mut self, index: usize) {
        self.points[index].active = false;
    }
}

/// Rejection-sample the unit ball
fn random_in_unit_ball(rng: &mut impl Rng) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        if p.length() <= 1.0 {
            return p;
        }
    }
}

/// Two unit vectors perpendicular to `axis` and to each other
fn orthonormal_basis(axis: Vec3) -> (Vec3, Vec3) {
    let up = if axis.dot(Vec3::Y).abs() > 0.9 { Vec3::X } else { Vec3::Y };
    let right = axis.cross(up).normalize();
    let forward = right.cross(axis);
    (right, forward)
}

/// Point on a disc of radius `radius` around `axis`, uniform by area
fn random_disc_offset(rng: &mut impl Rng, axis: Vec3, radius: f32) -> Vec3 {
    let (right, forward) = orthonormal_basis(axis);
    let theta = rng.random::<f32>() * TAU;
    let dist = rng.random::<f32>().sqrt() * radius;
    right * theta.cos() * dist + forward * theta.sin() * dist
}

/// Point in a cone opening from `apex` along `axis`
fn random_in_cone(rng: &mut impl Rng, apex: Vec3, axis: Vec3, height: f32, base_radius: f32) -> Vec3 {
    // Cube root keeps the distribution uniform by volume
    let h = rng.random::<f32>().cbrt() * height;
    let r = (h / height) * base_radius;
    apex + axis * h + random_disc_offset(rng, axis, r)
}

/// Point in a cylinder centered on `center`
fn random_in_cylinder(rng: &mut impl Rng, center: Vec3, axis: Vec3, height: f32, radius: f32) -> Vec3 {
    let h = (rng.random::<f32>() - 0.5) * height;
    center + axis * h + random_disc_offset(rng, axis, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn field_for(shape: CrownShape, seed: u64) -> (TreeParameters, AttractorField) {
        let params = TreeParameters {
            crown_shape: shape,
            attractor_count: 400,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let field = AttractorField::distribute(&params, &mut rng).unwrap();
        (params, field)
    }

    #[test]
    fn test_exact_count_all_active() {
        for shape in [CrownShape::Sphere, CrownShape::Cone, CrownShape::Cylinder, CrownShape::Ellipsoid] {
            let (params, field) = field_for(shape, 3);
            assert_eq!(field.len(), params.attractor_count);
            assert_eq!(field.active_count(), params.attractor_count);
        }
    }

    #[test]
    fn test_sphere_points_inside_crown() {
        let (params, field) = field_for(CrownShape::Sphere, 11);
        let center = params.crown_center().unwrap();
        for a in field.iter() {
            assert!((a.position - center).length() <= params.crown_radius + 1e-4);
        }
    }

    #[test]
    fn test_ellipsoid_points_inside_bounds() {
        let (params, field) = field_for(CrownShape::Ellipsoid, 5);
        let center = params.crown_center().unwrap();
        let radii = params.bounding_size * 0.5;
        for a in field.iter() {
            let q = (a.position - center) / radii;
            assert!(q.length() <= 1.0 + 1e-4);
        }
    }

    #[test]
    fn test_cone_points_inside_cone() {
        let (params, field) = field_for(CrownShape::Cone, 8);
        let axis = params.trunk_axis().unwrap();
        let height = params.crown_radius * 2.0;
        let apex = params.crown_center().unwrap() - axis * params.crown_radius;
        for a in field.iter() {
            let rel = a.position - apex;
            let h = rel.dot(axis);
            let radial = (rel - axis * h).length();
            assert!(h >= -1e-4 && h <= height + 1e-4);
            assert!(radial <= (h / height) * params.crown_radius + 1e-4);
        }
    }

    #[test]
    fn test_cylinder_points_inside_cylinder() {
        let params = TreeParameters {
            crown_shape: CrownShape::Cylinder,
            trunk_direction: Vec3::new(1.0, 0.2, 0.0),
            attractor_count: 300,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let field = AttractorField::distribute(&params, &mut rng).unwrap();
        let axis = params.trunk_axis().unwrap();
        let center = params.crown_center().unwrap();
        for a in field.iter() {
            let rel = a.position - center;
            let h = rel.dot(axis);
            assert!(h.abs() <= params.crown_radius + 1e-4);
            assert!((rel - axis * h).length() <= params.crown_radius + 1e-4);
        }
    }

    #[test]
    fn test_basis_is_orthonormal_for_vertical_axis() {
        let (right, forward) = orthonormal_basis(Vec3::Y);
        assert!(right.is_normalized() && forward.is_normalized());
        assert!(right.dot(Vec3::Y).abs() < 1e-6);
        assert!(forward.dot(Vec3::Y).abs() < 1e-6);
        assert!(right.dot(forward).abs() < 1e-6);
    }

    #[test]
    fn test_same_seed_same_field() {
        let (_, a) = field_for(CrownShape::Cone, 99);
        let (_, b) = field_for(CrownShape::Cone, 99);
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn test_deactivate_is_permanent() {
        let mut field = AttractorField::from_positions([Vec3::ZERO, Vec3::ONE]);
        field.deactivate(0);
        let (indices, positions) = field.active();
        assert_eq!(indices, vec![1]);
        assert_eq!(positions, vec![Vec3::ONE]);
        assert_eq!(field.active_count(), 1);
        assert!(field.any_active());

        field.deactivate(1);
        assert!(!field.any_active());
        assert_eq!(field.len(), 2);
    }
}
