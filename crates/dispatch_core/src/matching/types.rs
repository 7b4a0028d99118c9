use bevy_ecs::prelude::Entity;

/// A selected ride-driver pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentPair {
    pub ride_entity: Entity,
    pub driver_entity: Entity,
}
