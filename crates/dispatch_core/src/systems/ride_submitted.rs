use bevy_ecs::prelude::{Commands, Res, ResMut};

use crate::clock::{DispatchClock, EventKind};
use crate::ecs::{Position, RideDirectory, RideHandle};
use crate::forecast::DemandSample;
use crate::ranking::PendingQueue;
use crate::ride::{NamedPoint, RideStatus};
use crate::scenario::{EngineEpoch, SubmittedRides};
use crate::spatial::cell_for_point;
use crate::telemetry::{DemandHistory, DispatchTelemetry};
use crate::zones::ZoneRegistry;

/// Attach registry coordinates to a request location that arrived by name only.
fn resolve_location(location: &mut NamedPoint, registry: &ZoneRegistry) {
    if location.point.is_none() {
        if let Ok(zone) = registry.get(&location.name) {
            location.point = Some(zone.centroid);
        }
    }
}

/// Demand zone for a pickup: the registry zone by name, else by proximity,
/// else the raw pickup name.
fn attribute_zone(pickup: &NamedPoint, registry: &ZoneRegistry) -> String {
    if registry.get(&pickup.name).is_ok() {
        return pickup.name.clone();
    }
    pickup
        .point
        .and_then(|p| registry.nearest_zone(p))
        .map(|z| z.name.clone())
        .unwrap_or_else(|| pickup.name.clone())
}

/// Admits one queued submission: spawns the ride entity, enters it into the
/// pending queue and the demand history, and schedules an immediate
/// assignment attempt.
pub fn ride_submitted_system(
    mut clock: ResMut<DispatchClock>,
    mut commands: Commands,
    mut submitted: ResMut<SubmittedRides>,
    mut queue: ResMut<PendingQueue>,
    mut directory: ResMut<RideDirectory>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut history: ResMut<DemandHistory>,
    registry: Res<ZoneRegistry>,
    epoch: Res<EngineEpoch>,
) {
    let Some(mut record) = submitted.0.pop_front() else {
        return;
    };

    // The glue layer normalizes before queueing; a non-pending record here is
    // a replayed or duplicate delta.
    if record.status != RideStatus::Pending || directory.get(&record.id).is_some() {
        telemetry.validation_failures_total += 1;
        return;
    }

    resolve_location(&mut record.pickup, &registry);
    resolve_location(&mut record.destination, &registry);

    let zone = attribute_zone(&record.pickup, &registry);
    history.record(DemandSample {
        zone: zone.clone(),
        timestamp_ms: epoch.real_ms(record.requested_at),
        count: 1.0,
    });

    let ride_id = record.id.clone();
    let score = record.priority_score;
    let requested_at = record.requested_at;
    let pickup_cell = record.pickup.point.and_then(cell_for_point);

    let mut spawned = commands.spawn(RideHandle { record, zone });
    if let Some(cell) = pickup_cell {
        spawned.insert(Position(cell));
    }
    let entity = spawned.id();

    directory.insert(&ride_id, entity);
    queue.push(entity, score, requested_at);
    clock.schedule_in(0, EventKind::TryAssign, None);
}
