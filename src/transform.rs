//! Fixed frame mapping between the robot and the simulation.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{HapticError, Result};

/// Orthonormal linear map from the robot frame to the simulation frame,
/// together with the workspace scale.
///
/// Positions and velocities entering the simulation are rotated and then
/// multiplied by `position_scale`; forces leaving it are rotated back and
/// divided by `position_scale`, so shape gains do not depend on the scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FrameTransformDesc", into = "FrameTransformDesc")]
pub struct FrameTransform {
    robot_to_sim: Mat3,
    sim_to_robot: Mat3,
    position_scale: f32,
}

/// Serialized form: the rotation as sim-frame axes expressed in robot
/// coordinates, i.e. the rows of the robot→sim matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct FrameTransformDesc {
    sim_x: Vec3,
    sim_y: Vec3,
    sim_z: Vec3,
    position_scale: f32,
}

impl TryFrom<FrameTransformDesc> for FrameTransform {
    type Error = HapticError;

    fn try_from(desc: FrameTransformDesc) -> Result<Self> {
        FrameTransform::from_rows(desc.sim_x, desc.sim_y, desc.sim_z, desc.position_scale)
    }
}

impl From<FrameTransform> for FrameTransformDesc {
    fn from(t: FrameTransform) -> Self {
        let rows = t.robot_to_sim.transpose();
        Self {
            sim_x: rows.x_axis,
            sim_y: rows.y_axis,
            sim_z: rows.z_axis,
            position_scale: t.position_scale,
        }
    }
}

const ORTHONORMAL_TOLERANCE: f32 = 1e-4;

impl Default for FrameTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl FrameTransform {
    /// Same axes, unit scale.
    pub const fn identity() -> Self {
        Self {
            robot_to_sim: Mat3::IDENTITY,
            sim_to_robot: Mat3::IDENTITY,
            position_scale: 1.0,
        }
    }

    /// Axis remap used by the Barrett arm over CoAP: sim = (robot.y, robot.z,
    /// robot.x), scaled by 15 into the simulation workspace.
    pub const fn barrett() -> Self {
        Self {
            robot_to_sim: Mat3::from_cols(Vec3::Z, Vec3::X, Vec3::Y),
            sim_to_robot: Mat3::from_cols(Vec3::Y, Vec3::Z, Vec3::X),
            position_scale: 15.0,
        }
    }

    /// Build from the sim axes expressed in robot coordinates.
    ///
    /// The matrix must be orthonormal so that its inverse is its transpose;
    /// the scale must be finite and positive.
    pub fn from_rows(sim_x: Vec3, sim_y: Vec3, sim_z: Vec3, position_scale: f32) -> Result<Self> {
        let robot_to_sim = Mat3::from_cols(sim_x, sim_y, sim_z).transpose();
        let should_be_identity = robot_to_sim * robot_to_sim.transpose();
        if !should_be_identity.abs_diff_eq(Mat3::IDENTITY, ORTHONORMAL_TOLERANCE) {
            return Err(HapticError::InvalidConfig(format!(
                "frame axes {sim_x}, {sim_y}, {sim_z} are not orthonormal"
            )));
        }
        if !position_scale.is_finite() || position_scale <= 0.0 {
            return Err(HapticError::InvalidConfig(format!(
                "position scale must be positive, got {position_scale}"
            )));
        }
        Ok(Self {
            robot_to_sim,
            sim_to_robot: robot_to_sim.transpose(),
            position_scale,
        })
    }

    pub fn with_position_scale(mut self, position_scale: f32) -> Result<Self> {
        if !position_scale.is_finite() || position_scale <= 0.0 {
            return Err(HapticError::InvalidConfig(format!(
                "position scale must be positive, got {position_scale}"
            )));
        }
        self.position_scale = position_scale;
        Ok(self)
    }

    #[inline]
    pub fn position_scale(&self) -> f32 {
        self.position_scale
    }

    /// Rotate a robot-frame vector into the simulation frame (no scaling).
    #[inline]
    pub fn to_sim_frame(&self, v: Vec3) -> Vec3 {
        self.robot_to_sim * v
    }

    /// Rotate a simulation-frame vector into the robot frame (no scaling).
    #[inline]
    pub fn to_robot_frame(&self, v: Vec3) -> Vec3 {
        self.sim_to_robot * v
    }

    /// Robot tool position or velocity to simulation units.
    #[inline]
    pub fn kinematics_to_sim(&self, v: Vec3) -> Vec3 {
        self.to_sim_frame(v) * self.position_scale
    }

    /// Simulation position to robot coordinates, the inverse of
    /// [`kinematics_to_sim`](Self::kinematics_to_sim).
    #[inline]
    pub fn position_to_robot(&self, position: Vec3) -> Vec3 {
        self.to_robot_frame(position) / self.position_scale
    }

    /// Simulation force to the robot command.
    #[inline]
    pub fn force_to_robot(&self, force: Vec3) -> Vec3 {
        self.to_robot_frame(force) / self.position_scale
    }
}
