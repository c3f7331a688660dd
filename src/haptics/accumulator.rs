//! Per-tick force accumulation across active contacts.

use glam::Vec3;

use super::contact::ContactState;

/// Sums force samples for one control tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceAccumulator {
    total: Vec3,
    contributions: u32,
}

impl ForceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, force: Vec3) {
        self.total += force;
        self.contributions += 1;
    }

    /// Add the force sample of every active contact.
    pub fn add_contacts(&mut self, states: &[ContactState]) {
        for state in states.iter().filter(|s| s.is_active()) {
            self.add(state.force);
        }
    }

    /// Current sum without resetting.
    #[inline]
    pub fn total(&self) -> Vec3 {
        self.total
    }

    /// Number of samples added since the last reset.
    #[inline]
    pub fn contributions(&self) -> u32 {
        self.contributions
    }

    /// Return the sum and reset to zero.
    #[inline]
    pub fn take(&mut self) -> Vec3 {
        let total = self.total;
        self.clear();
        total
    }

    #[inline]
    pub fn clear(&mut self) {
        self.total = Vec3::ZERO;
        self.contributions = 0;
    }
}
