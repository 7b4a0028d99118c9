use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventSubject};
use crate::ecs::{DriverAgent, DriverDirectory, RideHandle};
use crate::ingest::DriverStatus;
use crate::notify::{deliver_best_effort, Notification, NotifierResource};
use crate::telemetry::{CompletedRideRecord, DispatchTelemetry};

/// The assigned driver reports dropoff: `InProgress -> Completed`. Frees the
/// driver and records the completed-ride KPIs.
pub fn ride_completed_system(
    event: Res<CurrentEvent>,
    clock: Res<DispatchClock>,
    directory: Res<DriverDirectory>,
    mut telemetry: ResMut<DispatchTelemetry>,
    notifier: Res<NotifierResource>,
    mut rides: Query<&mut RideHandle>,
    mut drivers: Query<&mut DriverAgent>,
) {
    let Some(EventSubject::Ride(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(entity) else {
        return;
    };

    if ride.record.complete(clock.now()).is_err() {
        telemetry.rejected_transitions_total += 1;
        return;
    }

    let mut driver_entity = None;
    if let Some(assigned) = ride.record.assigned_driver.as_ref() {
        if let Some(found) = directory.get(&assigned.driver_id) {
            driver_entity = Some(found);
            if let Ok(mut driver) = drivers.get_mut(found) {
                driver.record.status = DriverStatus::Idle;
                driver.current_ride = None;
            }
        }
    }

    telemetry.completed_rides.push(CompletedRideRecord {
        ride_entity: entity,
        driver_entity,
        ride_id: ride.record.id.clone(),
        zone: ride.zone.clone(),
        requested_at: ride.record.requested_at,
        assigned_at: ride.record.assigned_at.unwrap_or(ride.record.requested_at),
        started_at: ride.record.started_at.unwrap_or(ride.record.requested_at),
        completed_at: ride.record.completed_at.unwrap_or(ride.record.requested_at),
    });

    if !deliver_best_effort(
        notifier.0.as_ref(),
        Notification::ride_completed(&ride.record.rider_id),
    ) {
        telemetry.notification_failures_total += 1;
    }
}
