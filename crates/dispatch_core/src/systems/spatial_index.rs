use bevy_ecs::prelude::{Changed, Entity, Or, Query, ResMut};

use crate::ecs::{DriverAgent, Position};
use crate::ingest::DriverStatus;
use crate::spatial::DriverSpatialIndex;

/// Keeps the idle-driver index in sync. Runs after `apply_deferred` on every
/// event so freshly spawned or re-idled drivers are visible to the next
/// assignment pass; only entities whose agent or position changed are touched.
pub fn update_driver_spatial_index_system(
    mut index: ResMut<DriverSpatialIndex>,
    drivers: Query<
        (Entity, &DriverAgent, &Position),
        Or<(Changed<DriverAgent>, Changed<Position>)>,
    >,
) {
    for (entity, driver, position) in drivers.iter() {
        if driver.record.status == DriverStatus::Idle && driver.current_ride.is_none() {
            index.insert(entity, position.0);
        } else {
            index.remove(entity);
        }
    }
}
