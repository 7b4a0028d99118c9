use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, DispatchClock, EventSubject};
use crate::ecs::{DriverAgent, DriverDirectory, RideHandle};
use crate::ingest::DriverStatus;
use crate::ranking::PendingQueue;
use crate::telemetry::DispatchTelemetry;

/// Rider cancellation. Legal from `Pending` and `Accepted` only; a cancel
/// racing an assignment resolves against the committed status, and the loser
/// is counted, never silently ignored.
pub fn ride_cancel_system(
    event: Res<CurrentEvent>,
    clock: Res<DispatchClock>,
    directory: Res<DriverDirectory>,
    mut queue: ResMut<PendingQueue>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut rides: Query<&mut RideHandle>,
    mut drivers: Query<&mut DriverAgent>,
) {
    let Some(EventSubject::Ride(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut ride) = rides.get_mut(entity) else {
        return;
    };

    // The transition clears the driver sub-record; remember it for release.
    let assigned_driver_id = ride
        .record
        .assigned_driver
        .as_ref()
        .map(|d| d.driver_id.clone());

    if ride.record.cancel(clock.now()).is_err() {
        // In-progress or already terminal.
        telemetry.rejected_transitions_total += 1;
        return;
    }

    queue.remove(entity);
    telemetry.cancellations_total += 1;

    if let Some(driver_id) = assigned_driver_id {
        if let Some(driver_entity) = directory.get(&driver_id) {
            if let Ok(mut driver) = drivers.get_mut(driver_entity) {
                if driver.current_ride == Some(entity) {
                    driver.record.status = DriverStatus::Idle;
                    driver.current_ride = None;
                }
            }
        }
    }
}
