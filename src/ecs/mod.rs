//! Entity Component System integration with hecs.
//!
//! Shapes live as entities carrying a [`HapticCollider`] and a
//! [`HapticContact`]; [`haptic_contact_system`] runs the per-tick contact
//! update over them.
//!
//! [`HapticCollider`]: components::HapticCollider
//! [`HapticContact`]: components::HapticContact
//! [`haptic_contact_system`]: systems::haptic_contact_system

pub mod bridge;
pub mod components;
pub mod systems;

pub mod prelude {
    pub use super::bridge::*;
    pub use super::components::*;
    pub use super::systems::haptic_contact_system;
}
