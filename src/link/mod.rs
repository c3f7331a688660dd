//! Robot transport contract.
//!
//! The core only needs three operations from the arm: read the tool
//! position, read the tool velocity and command a tool force. The wire
//! protocol behind them is opaque. Implementations:
//!
//! - [`BufferedLink`] moves a blocking link onto a worker thread so the
//!   control tick never waits on I/O
//! - [`SimulatedRobot`] is an in-process point-mass arm
//! - [`RecordingLink`] scripts telemetry and records commands

pub mod buffered;
pub mod recording;
pub mod simulated;

use glam::Vec3;

use crate::error::LinkError;

pub use buffered::{BufferConfig, BufferedLink};
pub use recording::RecordingLink;
pub use simulated::{HandMotion, SimulatedRobot};

/// Connection to a force-feedback arm, in the robot's native frame and
/// units.
pub trait RobotLink {
    /// Latest tool position, or `None` until valid telemetry is available.
    fn tool_position(&mut self) -> Option<Vec3>;

    /// Latest tool velocity, or `None` until valid telemetry is available.
    fn tool_velocity(&mut self) -> Option<Vec3>;

    /// Position and velocity taken from the same telemetry sample.
    ///
    /// `None` when no position is available. Links that sample
    /// asynchronously override this so the pair cannot straddle two
    /// samples.
    fn telemetry(&mut self) -> Option<(Vec3, Option<Vec3>)> {
        let position = self.tool_position()?;
        Some((position, self.tool_velocity()))
    }

    /// Command a tool force. Must not block longer than the transport's
    /// bounded latency.
    fn send_tool_force(&mut self, force: Vec3) -> Result<(), LinkError>;

    /// Activate the arm's force output.
    fn enable(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    /// Deactivate the arm's force output.
    fn disable(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    /// Wait until previously sent commands have been delivered.
    fn flush(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}

impl<L: RobotLink + ?Sized> RobotLink for Box<L> {
    fn tool_position(&mut self) -> Option<Vec3> {
        (**self).tool_position()
    }

    fn tool_velocity(&mut self) -> Option<Vec3> {
        (**self).tool_velocity()
    }

    fn telemetry(&mut self) -> Option<(Vec3, Option<Vec3>)> {
        (**self).telemetry()
    }

    fn send_tool_force(&mut self, force: Vec3) -> Result<(), LinkError> {
        (**self).send_tool_force(force)
    }

    fn enable(&mut self) -> Result<(), LinkError> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<(), LinkError> {
        (**self).disable()
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        (**self).flush()
    }
}
