use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventSubject};
use crate::ecs::RideHandle;
use crate::notify::{deliver_best_effort, Notification, NotifierResource};
use crate::telemetry::DispatchTelemetry;

/// The assigned driver reports pickup: `Accepted -> InProgress`.
pub fn ride_started_system(
    event: Res<CurrentEvent>,
    clock: Res<DispatchClock>,
    mut telemetry: ResMut<DispatchTelemetry>,
    notifier: Res<NotifierResource>,
    mut rides: Query<&mut RideHandle>,
) {
    let Some(EventSubject::Ride(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(entity) else {
        return;
    };

    match ride.record.start(clock.now()) {
        Ok(()) => {
            let driver_name = ride
                .record
                .assigned_driver
                .as_ref()
                .map(|d| d.driver_name.clone())
                .unwrap_or_default();
            if !deliver_best_effort(
                notifier.0.as_ref(),
                Notification::ride_started(&ride.record.rider_id, &driver_name),
            ) {
                telemetry.notification_failures_total += 1;
            }
        }
        Err(_) => telemetry.rejected_transitions_total += 1,
    }
}
