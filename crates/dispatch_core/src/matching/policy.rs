use bevy_ecs::prelude::Entity;
use h3o::CellIndex;

use super::types::AssignmentPair;

/// Trait for driver-selection policies used by the dispatcher.
pub trait AssignmentPolicy: Send + Sync {
    /// Select a driver for a single pending ride.
    /// Returns the chosen driver entity, or `None` if no idle driver is
    /// within the match radius.
    fn select_driver(
        &self,
        ride_entity: Entity,
        pickup_cell: CellIndex,
        idle_drivers: &[(Entity, CellIndex)],
        match_radius: u32,
    ) -> Option<Entity>;

    /// Pair multiple pending rides with idle drivers in one pass. Policies
    /// can override this to optimize globally (e.g. bipartite assignment).
    /// The default selects per ride in the given order, never reusing a
    /// driver.
    fn select_batch(
        &self,
        rides: &[(Entity, CellIndex)],
        idle_drivers: &[(Entity, CellIndex)],
        match_radius: u32,
    ) -> Vec<AssignmentPair> {
        let mut available: Vec<(Entity, CellIndex)> = idle_drivers.to_vec();
        let mut pairs = Vec::new();
        for &(ride_entity, pickup_cell) in rides {
            if available.is_empty() {
                break;
            }
            if let Some(driver_entity) =
                self.select_driver(ride_entity, pickup_cell, &available, match_radius)
            {
                available.retain(|&(e, _)| e != driver_entity);
                pairs.push(AssignmentPair {
                    ride_entity,
                    driver_entity,
                });
            }
        }
        pairs
    }
}
