//! Rein Haptics
//!
//! Haptic force rendering for a force-feedback robot arm: a spherical probe
//! driven by the arm's tool position is tested against spheres and
//! axis-aligned boxes, and a PD spring-damper force is sent back to the arm
//! once per control tick.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **haptics** - Contact depth, force law, contact state machine, force accumulation
//! 2. **transform** - Robot frame to simulation frame mapping
//! 3. **filter** - Telemetry velocity low-pass filter
//! 4. **link** - Robot transport trait, buffered worker, simulated arm
//! 5. **controller** - Per-tick control, link health, safety stop, shutdown
//! 6. **engine** - Fixed-rate control loop
//! 7. **config** - JSON configuration
//! 8. **ecs** - hecs ECS integration (feature = "ecs")

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod filter;
pub mod haptics;
pub mod link;
pub mod transform;

#[cfg(feature = "ecs")]
pub mod ecs;

// Re-export commonly used types
pub use config::HapticsConfig;

pub use controller::{HapticController, LinkHealth, SafetyConfig, TelemetryConfig, TickReport};

pub use engine::{ControlLoop, ControlLoopConfig, LoopStats};

pub use error::{HapticError, LinkError, Result};

pub use filter::LowPassFilter;

pub use haptics::{
    compute_contact, pd_force, Axis, ContactPhase, ContactState, ContactTracker,
    ForceAccumulator, HapticShape, PdGains, Penetration, Probe, ShapeGeometry,
};

pub use link::{
    BufferConfig, BufferedLink, HandMotion, RecordingLink, RobotLink, SimulatedRobot,
};

pub use transform::FrameTransform;

#[cfg(feature = "ecs")]
pub use ecs::prelude::*;

// Re-export glam for convenience
pub use glam;
