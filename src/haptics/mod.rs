//! Haptic force rendering: contact geometry, force law, contact tracking and
//! force accumulation.
//!
//! # Architecture
//!
//! Every control tick runs, for each shape:
//!
//! 1. Overlap test against the probe
//! 2. Contact state transition (enter / stay / exit, frozen box axis)
//! 3. Penetration depth and outward normal
//! 4. PD force along the normal
//!
//! and then sums the samples of every active contact into a
//! [`ForceAccumulator`] that the controller drains once per tick.

pub mod accumulator;
pub mod contact;
pub mod depth;
pub mod force;
pub mod shape;

pub use accumulator::ForceAccumulator;
pub use contact::{ContactPhase, ContactState, ContactTracker};
pub use depth::{compute_contact, Penetration};
pub use force::pd_force;
pub use shape::{Axis, HapticShape, PdGains, Probe, ShapeGeometry};
