use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::DispatchClock;
use crate::ecs::{DriverAgent, RideHandle};
use crate::ranking::PendingQueue;
use crate::telemetry::{DispatchCounts, DispatchSnapshot, DispatchSnapshots, SnapshotConfig};

/// Captures a state snapshot. The interval gate lives in the runner's
/// `run_if` condition; this system just records.
pub fn capture_snapshot_system(
    clock: Res<DispatchClock>,
    config: Res<SnapshotConfig>,
    queue: Res<PendingQueue>,
    mut snapshots: ResMut<DispatchSnapshots>,
    rides: Query<&RideHandle>,
    drivers: Query<&DriverAgent>,
) {
    let mut counts = DispatchCounts::default();
    for ride in rides.iter() {
        counts.add_ride(ride.record.status);
    }
    for driver in drivers.iter() {
        counts.add_driver(driver.record.status);
    }

    snapshots.snapshots.push_back(DispatchSnapshot {
        timestamp_ms: clock.now(),
        counts,
        pending_queue_len: queue.len(),
    });
    while snapshots.snapshots.len() > config.max_snapshots {
        snapshots.snapshots.pop_front();
    }
    snapshots.last_snapshot_at = Some(clock.now());
}
