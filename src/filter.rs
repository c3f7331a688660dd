//! First-order low-pass filter for tool velocity.

use glam::Vec3;

/// Discrete first-order low-pass filter.
///
/// `y = (y + a*dt*x) / (1 + a*dt)` with cutoff `a` in rad/s. A cutoff of
/// `None` passes the input through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassFilter {
    cutoff: Option<f32>,
    state: Vec3,
    primed: bool,
}

impl LowPassFilter {
    /// Create a filter; non-positive or non-finite cutoffs disable filtering.
    pub fn new(cutoff: Option<f32>) -> Self {
        Self {
            cutoff: cutoff.filter(|a| a.is_finite() && *a > 0.0),
            state: Vec3::ZERO,
            primed: false,
        }
    }

    pub fn passthrough() -> Self {
        Self::new(None)
    }

    pub fn cutoff(&self) -> Option<f32> {
        self.cutoff
    }

    /// Feed one raw sample taken `dt` seconds after the previous one.
    ///
    /// The first sample after construction or [`reset`](Self::reset) seeds
    /// the state directly.
    pub fn update(&mut self, raw: Vec3, dt: f32) -> Vec3 {
        self.state = match self.cutoff {
            Some(a) if self.primed => {
                let k = a * dt;
                (self.state + k * raw) / (1.0 + k)
            }
            _ => raw,
        };
        self.primed = true;
        self.state
    }

    pub fn value(&self) -> Vec3 {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = Vec3::ZERO;
        self.primed = false;
    }
}
