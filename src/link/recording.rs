//! Scripted link that records every command.

use glam::Vec3;

use crate::error::LinkError;

use super::RobotLink;

/// Link with settable telemetry and injectable send failures.
#[derive(Debug, Clone, Default)]
pub struct RecordingLink {
    /// Position returned to the controller.
    pub position: Option<Vec3>,
    /// Velocity returned to the controller.
    pub velocity: Option<Vec3>,
    /// Every force command that was accepted, in order.
    pub sent: Vec<Vec3>,
    /// Fail this many upcoming sends.
    pub fail_sends: u32,
    /// Fail every flush.
    pub fail_flush: bool,
    pub enabled: bool,
    pub flush_count: u32,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_telemetry(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position: Some(position),
            velocity: Some(velocity),
            ..Self::default()
        }
    }

    pub fn set_telemetry(&mut self, position: Vec3, velocity: Vec3) {
        self.position = Some(position);
        self.velocity = Some(velocity);
    }

    pub fn last_sent(&self) -> Option<Vec3> {
        self.sent.last().copied()
    }
}

impl RobotLink for RecordingLink {
    fn tool_position(&mut self) -> Option<Vec3> {
        self.position
    }

    fn tool_velocity(&mut self) -> Option<Vec3> {
        self.velocity
    }

    fn send_tool_force(&mut self, force: Vec3) -> Result<(), LinkError> {
        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(LinkError::SendFailed("injected failure".into()));
        }
        self.sent.push(force);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), LinkError> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), LinkError> {
        self.enabled = false;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        if self.fail_flush {
            return Err(LinkError::FlushTimeout(std::time::Duration::ZERO));
        }
        self.flush_count += 1;
        Ok(())
    }
}
