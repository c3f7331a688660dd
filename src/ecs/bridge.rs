//! Bridge between plain shape lists and ECS.

use crate::ecs::components::{HapticCollider, HapticContact};
use crate::haptics::HapticShape;

/// Spawn a `HapticShape` as an ECS entity with a fresh contact state.
pub fn spawn_haptic_shape(world: &mut hecs::World, shape: HapticShape) -> hecs::Entity {
    world.spawn((HapticCollider(shape), HapticContact::default()))
}

/// Spawn every shape of a scene, in order.
pub fn spawn_haptic_scene(
    world: &mut hecs::World,
    shapes: impl IntoIterator<Item = HapticShape>,
) -> Vec<hecs::Entity> {
    shapes
        .into_iter()
        .map(|shape| spawn_haptic_shape(world, shape))
        .collect()
}
