//! Run a morning of campus dispatch and print the outcome.
//!
//! Run with: cargo run -p dispatch_core --example dispatch_run

use dispatch_core::clock::{DispatchClock, EventKind, EventSubject, ONE_SEC_MS};
use dispatch_core::ecs::RideDirectory;
use dispatch_core::notify::CommandOutbox;
use dispatch_core::ride::{NamedPoint, PriorityClass, RideRecord};
use dispatch_core::runner::{dispatch_schedule, initialize_engine, run_until_empty};
use dispatch_core::scenario::{build_dispatch_world, enqueue_ride, spawn_driver, DispatchParams};
use dispatch_core::store::{
    ChangeFeed, DeltaFilter, InMemoryChangeFeed, InMemoryRideStore, RecordDelta, RideStore,
};
use dispatch_core::telemetry::{DispatchTelemetry, ForecastBoard};
use dispatch_core::test_helpers::test_driver;

fn main() {
    const NUM_RIDES: usize = 40;
    const NUM_DRIVERS: usize = 6;
    const RUN_MINUTES: u64 = 45;

    let params = DispatchParams::default().with_end_time_ms(RUN_MINUTES * 60 * ONE_SEC_MS);
    let mut world = build_dispatch_world(&params);

    for i in 0..NUM_DRIVERS {
        spawn_driver(&mut world, test_driver(&format!("{i:02}")));
    }

    // Requests flow the way production does: the store commits each record
    // and its change feed pushes the delta; the glue drains the subscription
    // into the engine.
    let store = InMemoryRideStore::new();
    let feed = InMemoryChangeFeed::new();
    let submissions = feed.subscribe(DeltaFilter::RidesOnly);

    let zones = ["Main Gate", "Hostel Area", "Lab Block", "Girls Hostel"];
    for i in 0..NUM_RIDES {
        let pickup = zones[i % zones.len()];
        let destination = zones[(i + 1) % zones.len()];
        let priority = match i % 10 {
            0 => PriorityClass::Emergency,
            1 | 2 => PriorityClass::Exam,
            _ => PriorityClass::Normal,
        };
        let at_ms = (i as u64) * 30 * ONE_SEC_MS;
        let record = RideRecord::submit(
            &format!("ride-{i:03}"),
            &format!("stu-{i:03}"),
            "Student",
            NamedPoint::named(pickup),
            NamedPoint::named(destination),
            priority,
            at_ms,
        )
        .expect("valid request");
        store.create(record.clone()).expect("store create");
        feed.publish(RecordDelta::RideUpserted(record));
    }

    while let Some(delta) = submissions.try_next() {
        if let RecordDelta::RideUpserted(record) = delta {
            let at_ms = record.requested_at;
            enqueue_ride(&mut world, record, at_ms);
        }
    }
    submissions.unsubscribe();

    initialize_engine(&mut world);
    let mut schedule = dispatch_schedule();

    // Drivers report pickup one minute after assignment and dropoff five
    // minutes later; interleave those events with the engine the way the
    // change feed would deliver them.
    let mut started: std::collections::HashSet<String> = Default::default();
    let mut completed: std::collections::HashSet<String> = Default::default();
    let mut steps = 0usize;
    loop {
        let now = world.resource::<DispatchClock>().now();
        let due: Vec<(dispatch_core::ecs::RideHandle, _)> = {
            let directory = world.resource::<RideDirectory>();
            let outbox = world.resource::<CommandOutbox>();
            outbox
                .0
                .iter()
                .filter_map(|cmd| {
                    let entity = directory.get(&cmd.ride_id)?;
                    let handle = world.entity(entity).get::<dispatch_core::ecs::RideHandle>()?;
                    Some((handle.clone(), entity))
                })
                .collect()
        };
        for (handle, entity) in due {
            match handle.record.status {
                dispatch_core::ride::RideStatus::Accepted
                    if !started.contains(&handle.record.id) =>
                {
                    started.insert(handle.record.id.clone());
                    world.resource_mut::<DispatchClock>().schedule_at(
                        now + 60 * ONE_SEC_MS,
                        EventKind::RideStarted,
                        Some(EventSubject::Ride(entity)),
                    );
                }
                dispatch_core::ride::RideStatus::InProgress
                    if !completed.contains(&handle.record.id) =>
                {
                    completed.insert(handle.record.id.clone());
                    world.resource_mut::<DispatchClock>().schedule_at(
                        now + 300 * ONE_SEC_MS,
                        EventKind::RideCompleted,
                        Some(EventSubject::Ride(entity)),
                    );
                }
                _ => {}
            }
        }

        if run_until_empty(&mut world, &mut schedule, 1) == 0 || steps > 1_000_000 {
            break;
        }
        steps += 1;
    }

    let telemetry = world.resource::<DispatchTelemetry>();
    let board = world.resource::<ForecastBoard>();
    let clock = world.resource::<DispatchClock>();

    println!(
        "--- Dispatch run ({NUM_RIDES} requests, {NUM_DRIVERS} drivers, {RUN_MINUTES} min window) ---"
    );
    println!("Steps executed: {steps}");
    println!("Engine time: {} s", clock.now() / ONE_SEC_MS);
    println!("Store records: {}", store.len());
    println!("Assignments: {}", telemetry.assignments_total);
    println!("Completed rides: {}", telemetry.completed_rides.len());
    println!("Cancellations: {}", telemetry.cancellations_total);

    if !telemetry.completed_rides.is_empty() {
        println!("\nSample completed rides (first 10):");
        for (i, r) in telemetry.completed_rides.iter().take(10).enumerate() {
            println!(
                "  {}  {}  zone={}  time_to_assign={} s  ride_duration={} s",
                i + 1,
                r.ride_id,
                r.zone,
                r.time_to_assign() / ONE_SEC_MS,
                r.ride_duration() / ONE_SEC_MS,
            );
        }
    }

    println!("\nForecast board (cycle {}):", board.cycle_count);
    for result in &board.results {
        println!(
            "  {:<12}  current={:<3} predicted={:<3} confidence={:>2}%  trend={:?}  anomaly={}",
            result.zone,
            result.current_demand,
            result.predicted_demand,
            result.confidence,
            result.trend,
            result.anomaly,
        );
    }
}
