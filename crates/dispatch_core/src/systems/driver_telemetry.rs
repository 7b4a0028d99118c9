use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::ecs::{DriverAgent, DriverDirectory, GeoPosition, Position};
use crate::ingest::latest_sample;
use crate::scenario::InboundTelemetry;
use crate::spatial::cell_for_point;
use crate::telemetry::DispatchTelemetry;

/// Applies queued driver location samples, last-write-wins by timestamp.
/// Samples arrive at high frequency; the whole backlog is drained per event.
pub fn driver_telemetry_system(
    mut inbound: ResMut<InboundTelemetry>,
    directory: Res<DriverDirectory>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut commands: Commands,
    mut drivers: Query<(&mut DriverAgent, Option<&mut Position>, Option<&mut GeoPosition>)>,
) {
    while let Some((driver_id, sample)) = inbound.0.pop_front() {
        let Some(entity) = directory.get(&driver_id) else {
            telemetry.validation_failures_total += 1;
            continue;
        };
        let Ok((mut driver, position, geo)) = drivers.get_mut(entity) else {
            continue;
        };

        let current = driver.record.location;
        if current.map_or(false, |c| c.timestamp_ms > sample.timestamp_ms) {
            // A newer sample is already stored; stale writes lose by time
            // alone, they are never an error.
            telemetry.stale_telemetry_dropped_total += 1;
            continue;
        }

        let merged = latest_sample(current, sample);
        driver.record.location = Some(merged);

        if let Some(cell) = cell_for_point(merged.point) {
            match position {
                Some(mut p) => p.0 = cell,
                None => {
                    commands.entity(entity).insert(Position(cell));
                }
            }
            match geo {
                Some(mut g) => g.0 = merged.point,
                None => {
                    commands.entity(entity).insert(GeoPosition(merged.point));
                }
            }
        }
    }
}
