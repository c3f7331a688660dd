//! Per-shape contact state machine.
//!
//! Each (probe, shape) pair moves through
//! `NoContact -> Entering -> InContact -> NoContact`. `Entering` lasts one
//! tick and already produces force. Box contacts freeze the entry axis on
//! enter and hold it until exit so the force cannot flip to another face
//! while the probe is inside.

use glam::Vec3;
use tracing::debug;

use super::depth::{
    compute_contact, overlaps, select_entry_axis, sphere_box_depths, Penetration,
};
use super::force::pd_force;
use super::shape::{Axis, HapticShape, Probe, ShapeGeometry};

/// Phase of a single contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactPhase {
    #[default]
    NoContact,
    /// Overlap began this tick.
    Entering,
    InContact,
}

/// Contact state of one (probe, shape) pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactState {
    pub phase: ContactPhase,
    /// Face axis frozen at enter. Boxes only.
    pub entered_axis: Option<Axis>,
    /// Penetration used for this tick's force.
    pub penetration: Option<Penetration>,
    /// Force sample for this tick, zero outside contact.
    pub force: Vec3,
}

impl ContactState {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.phase != ContactPhase::NoContact
    }

    /// Advance the state machine one tick and return the force sample.
    pub fn update(&mut self, shape: &HapticShape, probe: &Probe) -> Vec3 {
        if !overlaps(&shape.geometry, probe) {
            if self.is_active() {
                debug!(shape = shape.label(), "haptic contact exit");
            }
            *self = ContactState::default();
            return Vec3::ZERO;
        }

        if self.is_active() {
            self.phase = ContactPhase::InContact;
        } else {
            self.phase = ContactPhase::Entering;
            self.entered_axis = match shape.geometry {
                ShapeGeometry::Box {
                    center,
                    half_extents,
                } => Some(select_entry_axis(sphere_box_depths(
                    probe.position,
                    probe.radius,
                    center,
                    half_extents,
                ))),
                ShapeGeometry::Sphere { .. } => None,
            };
            debug!(
                shape = shape.label(),
                axis = ?self.entered_axis,
                "haptic contact enter"
            );
        }

        let penetration = compute_contact(&shape.geometry, probe, self.entered_axis);
        if penetration.normal == Vec3::ZERO {
            debug!(shape = shape.label(), "degenerate contact normal, no force this tick");
        }
        self.penetration = Some(penetration);
        self.force = pd_force(penetration, probe.velocity - shape.velocity, shape.gains);
        self.force
    }

    /// Drop any contact without computing force.
    pub fn reset(&mut self) {
        *self = ContactState::default();
    }
}

/// Contact states for a list of shapes, indexed like the shape list.
#[derive(Debug, Clone, Default)]
pub struct ContactTracker {
    states: Vec<ContactState>,
}

impl ContactTracker {
    pub fn new(shape_count: usize) -> Self {
        Self {
            states: vec![ContactState::default(); shape_count],
        }
    }

    /// Run one tick of every shape's state machine.
    ///
    /// The tracker resizes itself if the shape list changed length; states of
    /// removed shapes are dropped and new shapes start in `NoContact`.
    pub fn update_contacts(&mut self, probe: &Probe, shapes: &[HapticShape]) -> &[ContactState] {
        self.states.resize(shapes.len(), ContactState::default());
        for (state, shape) in self.states.iter_mut().zip(shapes) {
            state.update(shape, probe);
        }
        &self.states
    }

    pub fn states(&self) -> &[ContactState] {
        &self.states
    }

    /// Number of shapes currently in contact.
    pub fn active_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_active()).count()
    }

    /// End every contact.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }
}
