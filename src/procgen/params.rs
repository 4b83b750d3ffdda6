//! Tree generation parameters and presets

use std::path::Path;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::{EPSILON, Error, Result};

/// Upper bound on nodes laid down for the trunk
pub const MAX_TRUNK_SEGMENTS: usize = 100_000;

/// Crown volume shape for Space Colonization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CrownShape {
    #[default]
    Sphere,
    Cone,
    Cylinder,
    Ellipsoid,
}

impl CrownShape {
    /// Parse a shape name, falling back to `Sphere` for anything unrecognized
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "sphere" => CrownShape::Sphere,
            "cone" => CrownShape::Cone,
            "cylinder" => CrownShape::Cylinder,
            "ellipsoid" => CrownShape::Ellipsoid,
            other => {
                log::warn!("Unknown crown shape '{}', using sphere", other);
                CrownShape::Sphere
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CrownShape::Sphere => "sphere",
            CrownShape::Cone => "cone",
            CrownShape::Cylinder => "cylinder",
            CrownShape::Ellipsoid => "ellipsoid",
        }
    }
}

impl From<String> for CrownShape {
    fn from(name: String) -> Self {
        CrownShape::from_name(&name)
    }
}

impl From<CrownShape> for String {
    fn from(shape: CrownShape) -> Self {
        shape.name().to_string()
    }
}

impl FromStr for CrownShape {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(CrownShape::from_name(s))
    }
}

/// Parameters for a single growth run (Space Colonization + radius assignment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParameters {
    /// Shape of the crown volume
    pub crown_shape: CrownShape,
    /// Crown radius
    pub crown_radius: f32,
    /// Trunk length before the crown begins
    pub crown_offset: f32,
    /// Number of attraction points distributed in the crown
    pub attractor_count: usize,
    /// Root position
    pub base_position: Vec3,
    /// Trunk growth axis (normalized before use)
    pub trunk_direction: Vec3,
    /// Ellipsoid crown diameters
    pub bounding_size: Vec3,
    /// Growth step size per iteration
    pub segment_length: f32,
    /// How far nodes can see attractors
    pub attraction_distance: f32,
    /// When attractors are removed (node reaches this close)
    pub kill_distance: f32,
    /// Root radius, also the upper clamp for every radius
    pub initial_radius: f32,
    /// Per-generation radius multiplier in (0, 1]
    pub radius_decay: f32,
    /// Lower clamp for every radius
    pub min_radius: f32,
}

impl Default for TreeParameters {
    fn default() -> Self {
        Self {
            crown_shape: CrownShape::Sphere,
            crown_radius: 2.0,
            crown_offset: 2.0,
            attractor_count: 500,
            base_position: Vec3::ZERO,
            trunk_direction: Vec3::Y,
            bounding_size: Vec3::splat(4.0),
            segment_length: 0.1,
            attraction_distance: 1.0,
            kill_distance: 0.2,
            initial_radius: 0.15,
            radius_decay: 0.97,
            min_radius: 0.01,
        }
    }
}

impl TreeParameters {
    /// Round oak-like crown
    pub fn oak() -> Self {
        Self {
            crown_radius: 2.0,
            crown_offset: 2.5,
            attractor_count: 800,
            ..Self::default()
        }
    }

    /// Tall conical crown
    pub fn pine() -> Self {
        Self {
            crown_shape: CrownShape::Cone,
            crown_radius: 1.5,
            crown_offset: 1.5,
            attractor_count: 600,
            ..Self::default()
        }
    }

    /// Wide ellipsoid crown
    pub fn spreading_oak() -> Self {
        Self {
            crown_shape: CrownShape::Ellipsoid,
            crown_radius: 2.5,
            crown_offset: 2.0,
            bounding_size: Vec3::new(5.0, 4.0, 5.0),
            attractor_count: 900,
            ..Self::default()
        }
    }

    /// Small bushy tree
    pub fn bush() -> Self {
        Self {
            crown_radius: 1.2,
            crown_offset: 1.0,
            attractor_count: 400,
            ..Self::default()
        }
    }

    /// Narrow cylindrical crown
    pub fn cypress() -> Self {
        Self {
            crown_shape: CrownShape::Cylinder,
            crown_radius: 1.0,
            crown_offset: 1.0,
            attractor_count: 500,
            ..Self::default()
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default()),
            "oak" => Some(Self::oak()),
            "pine" => Some(Self::pine()),
            "spreading_oak" | "spreading-oak" => Some(Self::spreading_oak()),
            "bush" => Some(Self::bush()),
            "cypress" => Some(Self::cypress()),
            _ => None,
        }
    }

    /// Check that a growth run with these parameters is well defined
    pub fn validate(&self) -> Result<()> {
        if self.trunk_direction.length() < EPSILON {
            return Err(Error::Configuration(format!(
                "trunk direction {:?} has zero magnitude",
                self.trunk_direction
            )));
        }
        if !(self.segment_length > 0.0 && self.segment_length.is_finite()) {
            return Err(Error::Configuration(format!(
                "segment length must be positive and finite, got {}",
                self.segment_length
            )));
        }
        if !self.crown_offset.is_finite() {
            return Err(Error::Configuration(format!(
                "crown offset must be finite, got {}",
                self.crown_offset
            )));
        }
        if self.trunk_segments() > MAX_TRUNK_SEGMENTS {
            return Err(Error::Configuration(format!(
                "trunk of {} over segments of {} needs more than {} nodes",
                self.crown_offset, self.segment_length, MAX_TRUNK_SEGMENTS
            )));
        }
        if !(self.min_radius >= 0.0 && self.min_radius <= self.initial_radius) {
            return Err(Error::Configuration(format!(
                "radii must satisfy 0 <= min_radius <= initial_radius, got {} and {}",
                self.min_radius, self.initial_radius
            )));
        }
        if !(self.radius_decay > 0.0 && self.radius_decay <= 1.0) {
            return Err(Error::Configuration(format!(
                "radius decay must lie in (0, 1], got {}",
                self.radius_decay
            )));
        }
        Ok(())
    }

    /// Number of trunk segments between the root and the crown
    pub fn trunk_segments(&self) -> usize {
        (self.crown_offset / self.segment_length).ceil().max(0.0) as usize
    }

    /// Normalized trunk direction
    pub fn trunk_axis(&self) -> Result<Vec3> {
        self.trunk_direction.try_normalize().ok_or_else(|| {
            Error::Configuration(format!(
                "trunk direction {:?} cannot be normalized",
                self.trunk_direction
            ))
        })
    }

    /// Crown center: the crown's near edge sits at the top of the trunk
    pub fn crown_center(&self) -> Result<Vec3> {
        let axis = self.trunk_axis()?;
        Ok(self.base_position + axis * (self.crown_offset + self.crown_radius))
    }

    /// Save to file as JSON
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file; missing fields take their default values
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let params: TreeParameters = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TreeParameters::default().validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let pine = TreeParameters::pine();
        let cypress = TreeParameters::cypress();
        let spreading = TreeParameters::spreading_oak();

        assert_eq!(pine.crown_shape, CrownShape::Cone);
        assert_eq!(cypress.crown_shape, CrownShape::Cylinder);
        assert_eq!(spreading.crown_shape, CrownShape::Ellipsoid);
        assert!(TreeParameters::bush().crown_radius < TreeParameters::oak().crown_radius);

        for name in ["default", "oak", "pine", "spreading_oak", "bush", "cypress"] {
            let params = TreeParameters::preset(name).unwrap();
            assert!(params.validate().is_ok(), "preset {} invalid", name);
        }
        assert!(TreeParameters::preset("baobab").is_none());
    }

    #[test]
    fn test_zero_trunk_direction_rejected() {
        let params = TreeParameters {
            trunk_direction: Vec3::ZERO,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(Error::Configuration(_))));
        assert!(params.crown_center().is_err());
    }

    #[test]
    fn test_unbounded_trunk_rejected() {
        for (crown_offset, segment_length) in [
            (f32::INFINITY, 0.1),
            (f32::NAN, 0.1),
            (1.0e8, 1.0),
            (2.0, f32::INFINITY),
        ] {
            let params = TreeParameters {
                crown_offset,
                segment_length,
                attractor_count: 0,
                ..Default::default()
            };
            assert!(
                matches!(params.validate(), Err(Error::Configuration(_))),
                "offset {} / segment {} accepted",
                crown_offset,
                segment_length
            );
        }
    }

    #[test]
    fn test_trunk_segments() {
        let params = TreeParameters {
            crown_offset: 1.0,
            segment_length: 0.25,
            ..Default::default()
        };
        assert_eq!(params.trunk_segments(), 4);

        let flat = TreeParameters {
            crown_offset: 0.0,
            ..Default::default()
        };
        assert_eq!(flat.trunk_segments(), 0);
    }

    #[test]
    fn test_radius_range_rejected() {
        let inverted = TreeParameters {
            min_radius: 0.5,
            initial_radius: 0.1,
            ..Default::default()
        };
        assert!(matches!(inverted.validate(), Err(Error::Configuration(_))));

        let negative = TreeParameters {
            min_radius: -0.01,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let equal = TreeParameters {
            min_radius: 0.1,
            initial_radius: 0.1,
            ..Default::default()
        };
        assert!(equal.validate().is_ok());
    }

    #[test]
    fn test_bad_decay_rejected() {
        let params = TreeParameters {
            radius_decay: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_unknown_shape_falls_back_to_sphere() {
        assert_eq!(CrownShape::from_name("Cone"), CrownShape::Cone);
        assert_eq!(CrownShape::from_name("pyramid"), CrownShape::Sphere);
        assert_eq!("cylinder".parse::<CrownShape>().unwrap(), CrownShape::Cylinder);
    }

    #[test]
    fn test_crown_center() {
        let params = TreeParameters {
            base_position: Vec3::new(1.0, 0.0, 0.0),
            trunk_direction: Vec3::new(0.0, 2.0, 0.0),
            crown_offset: 3.0,
            crown_radius: 1.0,
            ..Default::default()
        };
        assert_eq!(params.crown_center().unwrap(), Vec3::new(1.0, 4.0, 0.0));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params").join("pine.json");

        let params = TreeParameters::pine();
        params.save_sync(&path).unwrap();
        let loaded = TreeParameters::load_sync(&path).unwrap();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "crown_shape": "cone", "attractor_count": 42 }"#).unwrap();

        let loaded = TreeParameters::load_sync(&path).unwrap();
        assert_eq!(loaded.crown_shape, CrownShape::Cone);
        assert_eq!(loaded.attractor_count, 42);
        assert_eq!(loaded.segment_length, TreeParameters::default().segment_length);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(TreeParameters::load_sync(&path), Err(Error::Parse(_))));
    }

    #[test]
    fn test_unknown_shape_in_json_is_not_an_error() {
        let params: TreeParameters = serde_json::from_str(r#"{ "crown_shape": "pyramid" }"#).unwrap();
        assert_eq!(params.crown_shape, CrownShape::Sphere);
    }
}
