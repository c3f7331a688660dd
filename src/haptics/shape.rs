//! Probe and haptic shape data.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{HapticError, Result};

/// The single moving point-like tool driven by the robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    /// Center in simulation units.
    pub position: Vec3,
    /// Filtered velocity in simulation units per second.
    pub velocity: Vec3,
    /// Effective collision radius.
    pub radius: f32,
}

impl Probe {
    pub fn new(radius: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            radius,
        }
    }

    pub fn at(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
        }
    }
}

/// Spring-damper gains of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdGains {
    /// Stiffness.
    pub kp: f32,
    /// Damping.
    pub kd: f32,
}

impl PdGains {
    /// Defaults used for haptic spheres.
    pub const SPHERE: Self = Self { kp: 700.0, kd: 100.0 };
    /// Defaults used for haptic boxes.
    pub const BOX: Self = Self { kp: 500.0, kd: 60.0 };

    /// Create gains, rejecting negative or non-finite values.
    pub fn new(kp: f32, kd: f32) -> Result<Self> {
        let gains = Self { kp, kd };
        gains.validate()?;
        Ok(gains)
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |g: f32| g.is_finite() && g >= 0.0;
        if ok(self.kp) && ok(self.kd) {
            Ok(())
        } else {
            Err(HapticError::InvalidGains {
                kp: self.kp,
                kd: self.kd,
            })
        }
    }
}

/// Geometry of a haptic shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeGeometry {
    Sphere { center: Vec3, radius: f32 },
    /// Axis-aligned box.
    Box { center: Vec3, half_extents: Vec3 },
}

impl ShapeGeometry {
    pub fn center(&self) -> Vec3 {
        match self {
            ShapeGeometry::Sphere { center, .. } | ShapeGeometry::Box { center, .. } => *center,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            ShapeGeometry::Sphere { center, radius } => {
                if !center.is_finite() || !radius.is_finite() || *radius < 0.0 {
                    return Err(HapticError::InvalidGeometry(format!(
                        "sphere center {center}, radius {radius}"
                    )));
                }
            }
            ShapeGeometry::Box {
                center,
                half_extents,
            } => {
                if !center.is_finite()
                    || !half_extents.is_finite()
                    || half_extents.min_element() < 0.0
                {
                    return Err(HapticError::InvalidGeometry(format!(
                        "box center {center}, half extents {half_extents}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A static or kinematic obstacle rendered as a force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HapticShape {
    /// Name used in log output.
    #[serde(default)]
    pub name: Option<String>,
    pub geometry: ShapeGeometry,
    pub gains: PdGains,
    /// Shape velocity; zero for static shapes.
    #[serde(default)]
    pub velocity: Vec3,
}

impl HapticShape {
    /// Sphere with the default sphere gains.
    pub fn sphere(center: Vec3, radius: f32) -> Result<Self> {
        Self::new(ShapeGeometry::Sphere { center, radius }, PdGains::SPHERE)
    }

    /// Axis-aligned box with the default box gains.
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Result<Self> {
        Self::new(
            ShapeGeometry::Box {
                center,
                half_extents,
            },
            PdGains::BOX,
        )
    }

    pub fn new(geometry: ShapeGeometry, gains: PdGains) -> Result<Self> {
        let shape = Self {
            name: None,
            geometry,
            gains,
            velocity: Vec3::ZERO,
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn with_gains(mut self, kp: f32, kd: f32) -> Result<Self> {
        self.gains = PdGains::new(kp, kd)?;
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Check gains and geometry. Deserialized shapes must pass this before use.
    pub fn validate(&self) -> Result<()> {
        self.gains.validate()?;
        self.geometry.validate()
    }

    pub(crate) fn label(&self) -> &str {
        match (&self.name, &self.geometry) {
            (Some(name), _) => name.as_str(),
            (None, ShapeGeometry::Sphere { .. }) => "sphere",
            (None, ShapeGeometry::Box { .. }) => "box",
        }
    }
}

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    #[inline]
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}
