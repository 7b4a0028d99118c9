//! Engine runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each
//! step pops the next event from [`DispatchClock`], inserts it as
//! [`CurrentEvent`], then runs the schedule; systems are gated per event kind
//! so only the relevant one does work.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, DispatchClock, EventKind};
use crate::scenario::EngineEndTimeMs;
use crate::systems::{
    assignment::{batch_assign_system, try_assign_system},
    driver_telemetry::driver_telemetry_system,
    engine_started::engine_started_system,
    forecast_cycle::forecast_cycle_system,
    ride_cancel::ride_cancel_system,
    ride_completed::ride_completed_system,
    ride_started::ride_started_system,
    ride_submitted::ride_submitted_system,
    spatial_index::update_driver_spatial_index_system,
    telemetry_snapshot::capture_snapshot_system,
};

fn is_engine_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::EngineStarted)
        .unwrap_or(false)
}

fn is_ride_submitted(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideSubmitted)
        .unwrap_or(false)
}

fn is_try_assign(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TryAssign)
        .unwrap_or(false)
}

fn is_batch_assign(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::BatchAssign)
        .unwrap_or(false)
}

fn is_ride_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideStarted)
        .unwrap_or(false)
}

fn is_ride_completed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideCompleted)
        .unwrap_or(false)
}

fn is_ride_cancel(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RideCancel)
        .unwrap_or(false)
}

fn is_driver_telemetry(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::DriverTelemetry)
        .unwrap_or(false)
}

fn is_forecast_cycle(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ForecastCycle)
        .unwrap_or(false)
}

/// Condition: snapshot interval has elapsed.
fn should_capture_snapshot(
    clock: Option<Res<DispatchClock>>,
    config: Option<Res<crate::telemetry::SnapshotConfig>>,
    snapshots: Option<Res<crate::telemetry::DispatchSnapshots>>,
) -> bool {
    let Some(clock) = clock else {
        return false;
    };
    let Some(config) = config else {
        return false;
    };
    let Some(snapshots) = snapshots else {
        return false;
    };

    match snapshots.last_snapshot_at {
        None => true,
        Some(last) => clock.now().saturating_sub(last) >= config.interval_ms,
    }
}

/// Runs one engine step: pops the next event, inserts it as [`CurrentEvent`],
/// then runs the schedule. Returns `false` when the clock is empty or the
/// next event is at or past [`EngineEndTimeMs`] (when that resource exists).
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let stop_at = world.get_resource::<EngineEndTimeMs>().map(|e| e.0);
    let next_ts = world
        .get_resource::<DispatchClock>()
        .and_then(|c| c.next_event_time());
    if let (Some(end_ms), Some(ts)) = (stop_at, next_ts) {
        if ts >= end_ms {
            return false;
        }
    }

    let event = match world.resource_mut::<DispatchClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));

    schedule.run(world);
    true
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Builds the default dispatch schedule: all event-reacting systems plus
/// [`apply_deferred`] so spawned ride entities are applied before the next
/// step, then the spatial index refresh and the interval-gated snapshot.
pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    // Chained so the event system, the deferred flush, the index refresh and
    // the snapshot observe each other's effects within one step.
    schedule.add_systems(
        (
            engine_started_system.run_if(is_engine_started),
            ride_submitted_system.run_if(is_ride_submitted),
            try_assign_system.run_if(is_try_assign),
            batch_assign_system.run_if(is_batch_assign),
            ride_started_system.run_if(is_ride_started),
            ride_completed_system.run_if(is_ride_completed),
            ride_cancel_system.run_if(is_ride_cancel),
            driver_telemetry_system.run_if(is_driver_telemetry),
            forecast_cycle_system.run_if(is_forecast_cycle),
            apply_deferred,
            update_driver_spatial_index_system,
            capture_snapshot_system.run_if(should_capture_snapshot),
        )
            .chain(),
    );

    schedule
}

/// Schedules the EngineStarted event at time 0. Call after building the world
/// and before running events.
pub fn initialize_engine(world: &mut World) {
    let mut clock = world.resource_mut::<DispatchClock>();
    clock.schedule_at(0, EventKind::EngineStarted, None);
}
