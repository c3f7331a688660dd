//! ECS components.

pub mod haptics;

pub use haptics::{HapticCollider, HapticContact};
