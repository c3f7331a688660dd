//! ECS systems.

pub mod haptics;

pub use haptics::haptic_contact_system;
