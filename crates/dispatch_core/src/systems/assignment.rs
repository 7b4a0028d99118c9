//! Driver assignment: the per-submission attempt and the periodic batch pass.
//!
//! Both paths pop from the ranked pending queue, select a driver through the
//! installed policy, apply the state-machine transition, and emit the
//! assignment command plus notifications. A ride that finds no driver goes
//! back into the queue and is retried by the next batch pass.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};
use h3o::CellIndex;

use crate::clock::{DispatchClock, EventKind, ONE_SEC_MS};
use crate::ecs::{DriverAgent, GeoPosition, Position, RideHandle};
use crate::geo::{haversine_km, GeoPoint};
use crate::ingest::DriverStatus;
use crate::matching::AssignmentPolicyResource;
use crate::notify::{
    deliver_best_effort, AssignmentCommand, CommandOutbox, Notification, NotifierResource,
};
use crate::ranking::PendingQueue;
use crate::ride::{AssignedDriver, NamedPoint, RideStatus};
use crate::routing::{travel_minutes, RoutePlannerResource, Waypoint};
use crate::scenario::{BatchAssignConfig, MatchRadius};
use crate::spatial::{cell_for_point, point_for_cell, DriverSpatialIndex};
use crate::telemetry::DispatchTelemetry;
use crate::zones::ZoneRegistry;

fn campus_fallback(registry: &ZoneRegistry) -> GeoPoint {
    registry
        .zones()
        .first()
        .map(|z| z.centroid)
        .unwrap_or(GeoPoint {
            lat: 13.1344,
            lng: 77.5681,
        })
}

fn waypoint_for(location: &NamedPoint, fallback: GeoPoint) -> Waypoint {
    Waypoint {
        name: location.name.clone(),
        point: location.point.unwrap_or(fallback),
    }
}

fn pickup_cell_for(
    position: Option<&Position>,
    pickup: &NamedPoint,
    registry: &ZoneRegistry,
) -> Option<CellIndex> {
    position
        .map(|p| p.0)
        .or_else(|| pickup.point.and_then(cell_for_point))
        .or_else(|| cell_for_point(campus_fallback(registry)))
}

enum AssignOutcome {
    Committed,
    /// The driver was gone or no longer idle; the ride should be retried.
    DriverUnavailable,
    /// The ride itself cannot be assigned (despawned, no longer pending,
    /// unroutable); the counters record why.
    RideUnavailable,
}

/// Commit one ride-driver pairing.
#[allow(clippy::too_many_arguments)]
fn assign_ride_to_driver(
    ride_entity: Entity,
    driver_entity: Entity,
    now: u64,
    rides: &mut Query<(&mut RideHandle, Option<&Position>)>,
    drivers: &mut Query<(&mut DriverAgent, Option<&Position>, Option<&GeoPosition>)>,
    planner: &RoutePlannerResource,
    registry: &ZoneRegistry,
    telemetry: &mut DispatchTelemetry,
    outbox: &mut CommandOutbox,
    notifier: &NotifierResource,
) -> AssignOutcome {
    let Ok((mut driver, driver_pos, driver_geo)) = drivers.get_mut(driver_entity) else {
        return AssignOutcome::DriverUnavailable;
    };
    if driver.record.status != DriverStatus::Idle || driver.current_ride.is_some() {
        return AssignOutcome::DriverUnavailable;
    }

    let Ok((mut ride, _)) = rides.get_mut(ride_entity) else {
        return AssignOutcome::RideUnavailable;
    };

    let fallback = campus_fallback(registry);
    let pickup_wp = waypoint_for(&ride.record.pickup, fallback);
    let destination_wp = waypoint_for(&ride.record.destination, fallback);

    // Plan before mutating anything so an unroutable request leaves both
    // records untouched.
    let plan = match planner.plan(&pickup_wp, &destination_wp, &[]) {
        Ok(plan) => plan,
        Err(_) => {
            telemetry.validation_failures_total += 1;
            return AssignOutcome::RideUnavailable;
        }
    };

    let assigned = AssignedDriver {
        driver_id: driver.record.id.clone(),
        driver_name: driver.record.name.clone(),
        vehicle_number: driver.record.vehicle_number.clone(),
    };
    if ride.record.assign(assigned, now).is_err() {
        // Lost the race against a cancellation; the loser is accounted, never
        // silently dropped.
        telemetry.rejected_transitions_total += 1;
        return AssignOutcome::RideUnavailable;
    }

    driver.record.status = DriverStatus::Active;
    driver.current_ride = Some(ride_entity);

    let driver_point = driver_geo
        .map(|g| g.0)
        .or_else(|| driver_pos.map(|p| point_for_cell(p.0)))
        .unwrap_or(pickup_wp.point);
    let pickup_eta_minutes = travel_minutes(haversine_km(driver_point, pickup_wp.point));

    outbox.0.push(AssignmentCommand {
        ride_id: ride.record.id.clone(),
        driver_id: driver.record.id.clone(),
        plan: plan.clone(),
        pickup_eta_minutes,
    });
    telemetry.assignments_total += 1;

    // Fire-and-forget: a failed delivery never unwinds the assignment.
    if !deliver_best_effort(
        notifier.0.as_ref(),
        Notification::route_assigned(&driver.record.id, &plan),
    ) {
        telemetry.notification_failures_total += 1;
    }
    if !deliver_best_effort(
        notifier.0.as_ref(),
        Notification::ride_accepted(
            &ride.record.rider_id,
            &driver.record.name,
            &driver.record.vehicle_number,
            pickup_eta_minutes,
        ),
    ) {
        telemetry.notification_failures_total += 1;
    }

    AssignOutcome::Committed
}

/// Serve the head of the pending queue after a submission.
#[allow(clippy::too_many_arguments)]
pub fn try_assign_system(
    mut clock: ResMut<DispatchClock>,
    batch: Res<BatchAssignConfig>,
    policy: Res<AssignmentPolicyResource>,
    planner: Res<RoutePlannerResource>,
    registry: Res<ZoneRegistry>,
    radius: Res<MatchRadius>,
    index: Res<DriverSpatialIndex>,
    mut queue: ResMut<PendingQueue>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut outbox: ResMut<CommandOutbox>,
    notifier: Res<NotifierResource>,
    mut rides: Query<(&mut RideHandle, Option<&Position>)>,
    mut drivers: Query<(&mut DriverAgent, Option<&Position>, Option<&GeoPosition>)>,
) {
    let Some(head) = queue.pop_head() else {
        return;
    };

    let Ok((ride, position)) = rides.get(head.entity) else {
        return;
    };
    if ride.record.status != RideStatus::Pending {
        telemetry.rejected_transitions_total += 1;
        return;
    }
    let Some(pickup_cell) = pickup_cell_for(position, &ride.record.pickup, &registry) else {
        telemetry.validation_failures_total += 1;
        return;
    };

    let candidates = index.drivers_near(pickup_cell, radius.0);
    let chosen = policy.select_driver(head.entity, pickup_cell, &candidates, radius.0);

    let Some(driver_entity) = chosen else {
        // No idle driver in range: back into the queue, retried by the next
        // batch pass.
        queue.push(head.entity, head.score, head.requested_at);
        if batch.enabled {
            clock.schedule_in(batch.interval_secs * ONE_SEC_MS, EventKind::BatchAssign, None);
        }
        return;
    };

    let now = clock.now();
    let outcome = assign_ride_to_driver(
        head.entity,
        driver_entity,
        now,
        &mut rides,
        &mut drivers,
        &planner,
        &registry,
        &mut telemetry,
        &mut outbox,
        &notifier,
    );
    if matches!(outcome, AssignOutcome::DriverUnavailable) {
        queue.push(head.entity, head.score, head.requested_at);
        if batch.enabled {
            clock.schedule_in(batch.interval_secs * ONE_SEC_MS, EventKind::BatchAssign, None);
        }
    }
}

/// Periodic global pass over the whole backlog.
#[allow(clippy::too_many_arguments)]
pub fn batch_assign_system(
    mut clock: ResMut<DispatchClock>,
    batch: Res<BatchAssignConfig>,
    policy: Res<AssignmentPolicyResource>,
    planner: Res<RoutePlannerResource>,
    registry: Res<ZoneRegistry>,
    radius: Res<MatchRadius>,
    index: Res<DriverSpatialIndex>,
    mut queue: ResMut<PendingQueue>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut outbox: ResMut<CommandOutbox>,
    notifier: Res<NotifierResource>,
    mut rides: Query<(&mut RideHandle, Option<&Position>)>,
    mut drivers: Query<(&mut DriverAgent, Option<&Position>, Option<&GeoPosition>)>,
) {
    if !batch.enabled {
        return;
    }

    // Rank order so the batch serves emergencies first when drivers are scarce.
    let entries: Vec<(crate::ranking::RankedRide, CellIndex)> = queue
        .ranked()
        .into_iter()
        .filter_map(|entry| {
            let (ride, position) = rides.get(entry.entity).ok()?;
            let cell = pickup_cell_for(position, &ride.record.pickup, &registry)?;
            Some((entry, cell))
        })
        .collect();

    if !entries.is_empty() {
        let pending: Vec<(Entity, CellIndex)> =
            entries.iter().map(|(e, cell)| (e.entity, *cell)).collect();
        let idle = index.all_drivers();
        let pairs = policy.select_batch(&pending, &idle, radius.0);
        let now = clock.now();

        for pair in pairs {
            queue.remove(pair.ride_entity);
            let outcome = assign_ride_to_driver(
                pair.ride_entity,
                pair.driver_entity,
                now,
                &mut rides,
                &mut drivers,
                &planner,
                &registry,
                &mut telemetry,
                &mut outbox,
                &notifier,
            );
            if matches!(outcome, AssignOutcome::DriverUnavailable) {
                if let Some((entry, _)) = entries.iter().find(|(e, _)| e.entity == pair.ride_entity)
                {
                    queue.push(entry.entity, entry.score, entry.requested_at);
                }
            }
        }
    }

    // Keep the cadence alive only while there is a backlog to retry; a fresh
    // submission re-kicks it through try_assign.
    if !queue.is_empty() {
        clock.schedule_in(batch.interval_secs * ONE_SEC_MS, EventKind::BatchAssign, None);
    }
}
