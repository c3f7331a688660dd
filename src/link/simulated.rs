//! In-process point-mass arm for running the loop without hardware.

use std::time::{Duration, Instant};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LinkError;

use super::RobotLink;

/// A hand holding the tool, modeled as a spring toward a target that
/// oscillates along `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandMotion {
    /// Center of the motion in robot coordinates.
    pub center: Vec3,
    /// Direction and amplitude of the oscillation.
    pub axis: Vec3,
    /// Oscillation period in seconds.
    pub period: f32,
    /// Spring from the hand to the tool (N/m).
    pub stiffness: f32,
}

impl HandMotion {
    fn target(&self, time: f32) -> Vec3 {
        let phase = std::f32::consts::TAU * time / self.period.max(f32::EPSILON);
        self.center + self.axis * phase.sin()
    }
}

/// Most integration steps taken by one real-time catch-up.
const MAX_SUBSTEPS: u64 = 250;

/// Tool modeled as a damped point mass.
///
/// By default the arm is stepped by `dt` once per force command, which
/// keeps tests deterministic. In [`real_time`](Self::real_time) mode it
/// follows the wall clock instead and applies the last commanded force
/// until a new one arrives.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    position: Vec3,
    velocity: Vec3,
    mass: f32,
    damping: f32,
    dt: f32,
    time: f32,
    hand: Option<HandMotion>,
    enabled: bool,
    last_force: Vec3,
    real_time: bool,
    last_advance: Option<Instant>,
}

impl SimulatedRobot {
    /// Arm at `position` with a 1 kg tool, stepped by `dt` per command.
    pub fn new(position: Vec3, dt: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            mass: 1.0,
            damping: 2.0,
            dt: dt.max(1e-6),
            time: 0.0,
            hand: None,
            enabled: false,
            last_force: Vec3::ZERO,
            real_time: false,
            last_advance: None,
        }
    }

    /// Integrate in fixed `dt` substeps against the wall clock instead of
    /// once per command. The clock starts at the first telemetry read or
    /// command.
    pub fn real_time(mut self) -> Self {
        self.real_time = true;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass.max(f32::EPSILON);
        self
    }

    /// Viscous friction of the joints (N·s/m).
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping.max(0.0);
        self
    }

    pub fn with_hand(mut self, hand: HandMotion) -> Self {
        self.hand = Some(hand);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last force actually applied by the motors.
    pub fn last_force(&self) -> Vec3 {
        self.last_force
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Simulated seconds integrated so far.
    pub fn sim_time(&self) -> f32 {
        self.time
    }

    /// Semi-implicit Euler step under the motor force, the hand spring and
    /// joint friction.
    fn step(&mut self, motor_force: Vec3) {
        let hand_force = self
            .hand
            .map_or(Vec3::ZERO, |h| h.stiffness * (h.target(self.time) - self.position));
        let force = motor_force + hand_force - self.damping * self.velocity;

        self.velocity += force / self.mass * self.dt;
        self.position += self.velocity * self.dt;
        self.time += self.dt;
    }

    /// Catch the real-time integration up with the wall clock under the
    /// last commanded force. Time beyond [`MAX_SUBSTEPS`] is dropped.
    fn advance(&mut self) {
        if !self.real_time {
            return;
        }
        let now = Instant::now();
        let Some(last) = self.last_advance else {
            self.last_advance = Some(now);
            return;
        };

        let dt = f64::from(self.dt);
        let due = ((now - last).as_secs_f64() / dt) as u64;
        let steps = due.min(MAX_SUBSTEPS);
        for _ in 0..steps {
            self.step(self.last_force);
        }

        if due > steps {
            debug!(dropped = due - steps, "simulated arm fell behind, dropping steps");
            self.last_advance = Some(now);
        } else {
            self.last_advance = Some(last + Duration::from_secs_f64(dt * steps as f64));
        }
    }
}

impl RobotLink for SimulatedRobot {
    fn tool_position(&mut self) -> Option<Vec3> {
        self.advance();
        Some(self.position)
    }

    fn tool_velocity(&mut self) -> Option<Vec3> {
        self.advance();
        Some(self.velocity)
    }

    fn telemetry(&mut self) -> Option<(Vec3, Option<Vec3>)> {
        self.advance();
        Some((self.position, Some(self.velocity)))
    }

    fn send_tool_force(&mut self, force: Vec3) -> Result<(), LinkError> {
        if !force.is_finite() {
            return Err(LinkError::SendFailed(format!("non-finite force {force}")));
        }
        // Time up to now ran under the previous command.
        self.advance();
        self.last_force = if self.enabled { force } else { Vec3::ZERO };
        if !self.real_time {
            self.step(self.last_force);
        }
        Ok(())
    }

    fn enable(&mut self) -> Result<(), LinkError> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), LinkError> {
        self.advance();
        self.enabled = false;
        self.last_force = Vec3::ZERO;
        Ok(())
    }
}
