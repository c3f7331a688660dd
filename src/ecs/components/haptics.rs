//! Haptic components for ECS entities.

use crate::haptics::{ContactState, HapticShape};

/// Shape the probe can touch.
#[derive(Debug, Clone, PartialEq)]
pub struct HapticCollider(pub HapticShape);

/// Contact state of the probe against this entity's collider.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HapticContact(pub ContactState);

impl HapticContact {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }
}
