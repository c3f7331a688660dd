//! ECS haptic contact system.

use crate::ecs::components::{HapticCollider, HapticContact};
use crate::haptics::{ForceAccumulator, Probe};

/// Advance every collider's contact state against `probe` and add the
/// force of each active contact to `accumulator`.
///
/// Returns the number of active contacts.
pub fn haptic_contact_system(
    world: &mut hecs::World,
    probe: &Probe,
    accumulator: &mut ForceAccumulator,
) -> usize {
    let mut active = 0;
    for (_, (collider, contact)) in world.query_mut::<(&HapticCollider, &mut HapticContact)>() {
        let force = contact.0.update(&collider.0, probe);
        if contact.is_active() {
            accumulator.add(force);
            active += 1;
        }
    }
    active
}
