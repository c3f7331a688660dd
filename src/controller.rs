//! Per-tick haptic control: telemetry in, contact forces out.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{HapticError, LinkError, Result};
use crate::filter::LowPassFilter;
use crate::haptics::{ContactState, ContactTracker, ForceAccumulator, HapticShape, Probe};
use crate::link::RobotLink;
use crate::transform::FrameTransform;

/// Probe and telemetry processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Probe sphere radius in simulation units. Default: 0.5.
    pub probe_radius: f32,
    /// Velocity low-pass cutoff in rad/s; `None` disables filtering.
    /// Default: 100.
    pub velocity_cutoff: Option<f32>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            probe_radius: 0.5,
            velocity_cutoff: Some(100.0),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.probe_radius.is_finite() || self.probe_radius < 0.0 {
            return Err(HapticError::InvalidGeometry(format!(
                "probe radius must be non-negative, got {}",
                self.probe_radius
            )));
        }
        Ok(())
    }
}

/// Output limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Consecutive send failures before the safety stop latches. Default: 10.
    pub max_consecutive_failures: u32,
    /// Largest force magnitude sent to the arm, in simulation units.
    pub max_force: Option<f32>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 10,
            max_force: None,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_consecutive_failures == 0 {
            return Err(HapticError::InvalidConfig(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }
        if let Some(max) = self.max_force {
            if !max.is_finite() || max < 0.0 {
                return Err(HapticError::InvalidConfig(format!(
                    "max_force must be a non-negative finite value, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// State of the outbound force channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkHealth {
    #[default]
    Nominal,
    /// Recent sends failed; commands are still attempted every tick.
    Degraded { consecutive_failures: u32 },
    /// Too many failures in a row; only zero force is commanded until
    /// [`HapticController::clear_safety_stop`].
    SafetyStop,
}

/// Outcome of one control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Accumulated force in the simulation frame, before limits.
    pub force: Vec3,
    /// Command handed to the link, in the robot frame.
    pub command: Vec3,
    pub active_contacts: usize,
    /// Whether a tool position was available this tick.
    pub telemetry_valid: bool,
    pub health: LinkHealth,
}

/// Owns the probe, the contact states and the link, and runs one tick at a
/// time.
pub struct HapticController<L: RobotLink> {
    link: L,
    shapes: Vec<HapticShape>,
    tracker: ContactTracker,
    accumulator: ForceAccumulator,
    transform: FrameTransform,
    velocity_filter: LowPassFilter,
    probe: Probe,
    safety: SafetyConfig,
    health: LinkHealth,
    failures: u32,
    ticks: u64,
}

impl<L: RobotLink> HapticController<L> {
    pub fn new(
        link: L,
        shapes: Vec<HapticShape>,
        transform: FrameTransform,
        telemetry: TelemetryConfig,
        safety: SafetyConfig,
    ) -> Result<Self> {
        for shape in &shapes {
            shape.validate()?;
        }
        telemetry.validate()?;
        safety.validate()?;

        Ok(Self {
            link,
            tracker: ContactTracker::new(shapes.len()),
            shapes,
            accumulator: ForceAccumulator::new(),
            transform,
            velocity_filter: LowPassFilter::new(telemetry.velocity_cutoff),
            probe: Probe::new(telemetry.probe_radius),
            safety,
            health: LinkHealth::Nominal,
            failures: 0,
            ticks: 0,
        })
    }

    /// Enable the arm's force output.
    pub fn start(&mut self) -> Result<()> {
        self.link.enable()?;
        info!(shapes = self.shapes.len(), "haptic controller started");
        Ok(())
    }

    /// Run one control tick of `dt` seconds.
    ///
    /// Reads one telemetry sample, updates every contact, sends the summed force
    /// once and clears the accumulator. Without a tool position the contacts
    /// are left as they were and zero force is commanded.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let telemetry = self.link.telemetry();
        let telemetry_valid = telemetry.is_some();

        if let Some((position, velocity)) = telemetry {
            let raw_velocity = velocity.map_or(Vec3::ZERO, |v| self.transform.kinematics_to_sim(v));
            self.probe.position = self.transform.kinematics_to_sim(position);
            self.probe.velocity = self.velocity_filter.update(raw_velocity, dt);

            let states = self.tracker.update_contacts(&self.probe, &self.shapes);
            self.accumulator.add_contacts(states);
        } else {
            self.velocity_filter.reset();
            self.probe.velocity = Vec3::ZERO;
        }

        let force = self.accumulator.total();
        let limited = match self.safety.max_force {
            Some(max) => force.clamp_length_max(max),
            None => force,
        };
        let command = if self.health == LinkHealth::SafetyStop {
            Vec3::ZERO
        } else {
            self.transform.force_to_robot(limited)
        };

        let result = self.link.send_tool_force(command);
        self.record_send(result);
        self.accumulator.clear();
        self.ticks += 1;

        TickReport {
            force,
            command,
            active_contacts: self.tracker.active_count(),
            telemetry_valid,
            health: self.health,
        }
    }

    fn record_send(&mut self, result: std::result::Result<(), LinkError>) {
        match result {
            Ok(()) => {
                if let LinkHealth::Degraded { consecutive_failures } = self.health {
                    info!(consecutive_failures, "force link recovered");
                    self.health = LinkHealth::Nominal;
                }
                self.failures = 0;
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                warn!(tick = self.ticks, failures = self.failures, "force send failed: {e}");
                if self.health == LinkHealth::SafetyStop {
                    return;
                }
                if self.failures >= self.safety.max_consecutive_failures {
                    error!(failures = self.failures, "safety stop: commanding zero force");
                    self.health = LinkHealth::SafetyStop;
                } else {
                    self.health = LinkHealth::Degraded {
                        consecutive_failures: self.failures,
                    };
                }
            }
        }
    }

    /// Leave the safety stop and resume force output on the next tick.
    pub fn clear_safety_stop(&mut self) {
        if self.health == LinkHealth::SafetyStop {
            info!("safety stop cleared");
        }
        self.health = LinkHealth::Nominal;
        self.failures = 0;
    }

    /// Zero the force, flush the link and disable the arm.
    ///
    /// Every step is attempted; the first failure is returned.
    pub fn shutdown(&mut self) -> Result<()> {
        let steps = [
            ("zero force", self.link.send_tool_force(Vec3::ZERO)),
            ("flush", self.link.flush()),
            ("disable", self.link.disable()),
        ];

        let mut first_error = None;
        for (step, result) in steps {
            if let Err(e) = result {
                error!("shutdown {step} failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        self.tracker.reset();
        self.accumulator.clear();
        self.velocity_filter.reset();

        match first_error {
            Some(e) => Err(e.into()),
            None => {
                debug!(ticks = self.ticks, "haptic controller shut down");
                Ok(())
            }
        }
    }

    pub fn health(&self) -> LinkHealth {
        self.health
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    pub fn shapes(&self) -> &[HapticShape] {
        &self.shapes
    }

    pub fn contacts(&self) -> &[ContactState] {
        self.tracker.states()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::ContactPhase;
    use crate::link::RecordingLink;

    const DT: f32 = 0.004;

    fn unfiltered() -> TelemetryConfig {
        TelemetryConfig {
            probe_radius: 0.5,
            velocity_cutoff: None,
        }
    }

    fn controller(link: RecordingLink, shapes: Vec<HapticShape>) -> HapticController<RecordingLink> {
        HapticController::new(
            link,
            shapes,
            FrameTransform::identity(),
            unfiltered(),
            SafetyConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_sphere_force_reaches_link() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0)
            .unwrap()
            .with_gains(400.0, 0.0)
            .unwrap();
        let mut c = controller(RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO), vec![sphere]);

        let report = c.tick(DT);
        assert!(report.telemetry_valid);
        assert_eq!(report.active_contacts, 1);
        assert!((report.command - Vec3::new(200.0, 0.0, 0.0)).length() < 1e-4);
        assert_eq!(c.link().sent.len(), 1);
        assert_eq!(c.contacts()[0].phase, ContactPhase::Entering);

        c.tick(DT);
        assert_eq!(c.contacts()[0].phase, ContactPhase::InContact);
    }

    #[test]
    fn test_multi_contact_sent_once_then_reset() {
        let a = HapticShape::sphere(Vec3::new(-0.5, 0.0, 0.0), 0.5)
            .unwrap()
            .with_gains(100.0, 0.0)
            .unwrap();
        let b = HapticShape::cuboid(Vec3::new(0.6, 0.0, 0.0), Vec3::splat(0.5)).unwrap();
        let mut c = controller(RecordingLink::with_telemetry(Vec3::ZERO, Vec3::ZERO), vec![a, b]);

        let report = c.tick(DT);
        let f1 = c.contacts()[0].force;
        let f2 = c.contacts()[1].force;
        assert_eq!(report.active_contacts, 2);
        assert!(f1.length() > 0.0 && f2.length() > 0.0);
        assert!((c.link().sent[0] - (f1 + f2)).length() < 1e-4);

        // Probe leaves both shapes: next command is exactly zero.
        c.link_mut().set_telemetry(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
        let report = c.tick(DT);
        assert_eq!(report.active_contacts, 0);
        assert_eq!(c.link().last_sent(), Some(Vec3::ZERO));
    }

    #[test]
    fn test_frame_transform_applied() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0)
            .unwrap()
            .with_gains(400.0, 0.0)
            .unwrap();
        let mut c = HapticController::new(
            // Robot x maps onto sim z, scaled by 15.
            RecordingLink::with_telemetry(Vec3::new(0.2, 0.0, 0.0), Vec3::ZERO),
            vec![sphere],
            FrameTransform::barrett(),
            unfiltered(),
            SafetyConfig::default(),
        )
        .unwrap();

        let report = c.tick(DT);
        // Probe at sim (0, 0, 3): separated.
        assert_eq!(report.active_contacts, 0);

        c.link_mut().set_telemetry(Vec3::new(1.0 / 15.0, 0.0, 0.0), Vec3::ZERO);
        let report = c.tick(DT);
        // Sim depth 0.5 along +z: 200 in sim, 200/15 along robot x.
        assert!((report.force - Vec3::new(0.0, 0.0, 200.0)).length() < 1e-2);
        assert!((report.command - Vec3::new(200.0 / 15.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_missing_position_sends_zero_and_keeps_contacts() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0).unwrap();
        let mut c = controller(RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO), vec![sphere]);
        c.tick(DT);
        let before = c.contacts()[0];
        assert!(before.is_active());

        c.link_mut().position = None;
        let report = c.tick(DT);
        assert!(!report.telemetry_valid);
        assert_eq!(report.command, Vec3::ZERO);
        assert_eq!(c.link().last_sent(), Some(Vec3::ZERO));
        assert_eq!(c.contacts()[0], before);
    }

    #[test]
    fn test_missing_velocity_is_zero() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0)
            .unwrap()
            .with_gains(400.0, 50.0)
            .unwrap();
        let mut link = RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO);
        link.velocity = None;
        let mut c = controller(link, vec![sphere]);
        let report = c.tick(DT);
        assert!((report.force - Vec3::new(200.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_force_clamp() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0)
            .unwrap()
            .with_gains(400.0, 0.0)
            .unwrap();
        let mut c = HapticController::new(
            RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO),
            vec![sphere],
            FrameTransform::identity(),
            unfiltered(),
            SafetyConfig {
                max_force: Some(50.0),
                ..SafetyConfig::default()
            },
        )
        .unwrap();
        let report = c.tick(DT);
        assert!((report.command.length() - 50.0).abs() < 1e-3);
        assert!((report.force.length() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_send_failures_degrade_then_recover() {
        let link = RecordingLink {
            fail_sends: 2,
            ..RecordingLink::with_telemetry(Vec3::splat(5.0), Vec3::ZERO)
        };
        let mut c = controller(link, Vec::new());

        assert_eq!(
            c.tick(DT).health,
            LinkHealth::Degraded { consecutive_failures: 1 }
        );
        assert_eq!(
            c.tick(DT).health,
            LinkHealth::Degraded { consecutive_failures: 2 }
        );
        assert_eq!(c.tick(DT).health, LinkHealth::Nominal);
    }

    #[test]
    fn test_safety_stop_latches_until_cleared() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0).unwrap();
        let link = RecordingLink {
            fail_sends: 3,
            ..RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO)
        };
        let mut c = HapticController::new(
            link,
            vec![sphere],
            FrameTransform::identity(),
            unfiltered(),
            SafetyConfig {
                max_consecutive_failures: 3,
                max_force: None,
            },
        )
        .unwrap();

        for _ in 0..3 {
            c.tick(DT);
        }
        assert_eq!(c.health(), LinkHealth::SafetyStop);

        // Sends succeed again but only zero goes out.
        let report = c.tick(DT);
        assert_eq!(report.health, LinkHealth::SafetyStop);
        assert_eq!(report.command, Vec3::ZERO);
        assert!(report.force.length() > 0.0);

        c.clear_safety_stop();
        let report = c.tick(DT);
        assert_eq!(report.health, LinkHealth::Nominal);
        assert!(report.command.length() > 0.0);
    }

    #[test]
    fn test_start_and_shutdown() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0).unwrap();
        let mut c = controller(RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO), vec![sphere]);
        c.start().unwrap();
        assert!(c.link().enabled);
        c.tick(DT);
        assert!(c.link().last_sent().unwrap().length() > 0.0);

        c.shutdown().unwrap();
        let link = c.into_link();
        assert_eq!(link.last_sent(), Some(Vec3::ZERO));
        assert_eq!(link.flush_count, 1);
        assert!(!link.enabled);
    }

    #[test]
    fn test_shutdown_reports_failure_but_disables() {
        let mut link = RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO);
        link.fail_flush = true;
        let mut c = controller(link, Vec::new());
        c.start().unwrap();
        assert!(c.shutdown().is_err());
        assert!(!c.link().enabled);
        assert_eq!(c.link().last_sent(), Some(Vec3::ZERO));
    }

    #[test]
    fn test_rejects_bad_setup() {
        let bad_radius = TelemetryConfig {
            probe_radius: -1.0,
            velocity_cutoff: None,
        };
        assert!(HapticController::new(
            RecordingLink::new(),
            Vec::new(),
            FrameTransform::identity(),
            bad_radius,
            SafetyConfig::default(),
        )
        .is_err());

        let no_failures = SafetyConfig {
            max_consecutive_failures: 0,
            max_force: None,
        };
        assert!(HapticController::new(
            RecordingLink::new(),
            Vec::new(),
            FrameTransform::identity(),
            unfiltered(),
            no_failures,
        )
        .is_err());

        for max_force in [-50.0, f32::NAN, f32::INFINITY] {
            let bad_limit = SafetyConfig {
                max_force: Some(max_force),
                ..SafetyConfig::default()
            };
            assert!(
                matches!(
                    HapticController::new(
                        RecordingLink::new(),
                        Vec::new(),
                        FrameTransform::identity(),
                        unfiltered(),
                        bad_limit,
                    ),
                    Err(HapticError::InvalidConfig(_))
                ),
                "max_force {max_force} accepted"
            );
        }
    }

    #[test]
    fn test_zero_force_limit_sends_zero() {
        let sphere = HapticShape::sphere(Vec3::ZERO, 1.0).unwrap();
        let mut c = HapticController::new(
            RecordingLink::with_telemetry(Vec3::X, Vec3::ZERO),
            vec![sphere],
            FrameTransform::identity(),
            unfiltered(),
            SafetyConfig {
                max_force: Some(0.0),
                ..SafetyConfig::default()
            },
        )
        .unwrap();
        let report = c.tick(DT);
        assert!(report.force.length() > 0.0);
        assert_eq!(report.command, Vec3::ZERO);
    }
}
