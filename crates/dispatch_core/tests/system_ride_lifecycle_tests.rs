mod support;

use support::world::TestWorld;

use dispatch_core::clock::EventKind;
use dispatch_core::ecs::{DriverAgent, RideHandle};
use dispatch_core::ingest::DriverStatus;
use dispatch_core::notify::NotificationKind;
use dispatch_core::ranking::PendingQueue;
use dispatch_core::ride::{PriorityClass, RideStatus};
use dispatch_core::scenario::spawn_driver;
use dispatch_core::telemetry::DispatchTelemetry;
use dispatch_core::test_helpers::test_driver;

#[test]
fn full_lifecycle_records_monotonic_timestamps() {
    let mut tw = TestWorld::new();
    let driver_entity = spawn_driver(&mut tw.world, test_driver("01"));

    tw.submit_campus_ride("ride-1", PriorityClass::Normal, 1_000);
    tw.run_all(100);
    assert_eq!(tw.ride_status("ride-1"), RideStatus::Accepted);

    tw.schedule_ride_event("ride-1", EventKind::RideStarted, 60_000);
    tw.schedule_ride_event("ride-1", EventKind::RideCompleted, 300_000);
    tw.run_all(100);

    assert_eq!(tw.ride_status("ride-1"), RideStatus::Completed);

    let entity = tw.ride_entity("ride-1");
    let record = &tw
        .world
        .entity(entity)
        .get::<RideHandle>()
        .expect("handle")
        .record;
    let stamps = [
        record.requested_at,
        record.assigned_at.expect("assigned_at"),
        record.started_at.expect("started_at"),
        record.completed_at.expect("completed_at"),
    ];
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    assert!(record.cancelled_at.is_none());

    // The driver went back to idle and the KPI record landed in telemetry.
    let driver = tw
        .world
        .entity(driver_entity)
        .get::<DriverAgent>()
        .expect("driver");
    assert_eq!(driver.record.status, DriverStatus::Idle);
    assert_eq!(driver.current_ride, None);

    let telemetry = tw.world.resource::<DispatchTelemetry>();
    assert_eq!(telemetry.completed_rides.len(), 1);
    let kpi = &telemetry.completed_rides[0];
    assert_eq!(kpi.ride_id, "ride-1");
    assert_eq!(kpi.zone, "Main Gate");
    assert_eq!(kpi.time_to_assign(), 0);
    assert_eq!(kpi.ride_duration(), 240_000);

    // Students and driver heard about each step.
    let kinds: Vec<NotificationKind> = tw.notifier.delivered().iter().map(|n| n.kind).collect();
    assert!(kinds.contains(&NotificationKind::RouteAssigned));
    assert!(kinds.contains(&NotificationKind::RideAccepted));
    assert!(kinds.contains(&NotificationKind::RideStarted));
    assert!(kinds.contains(&NotificationKind::RideCompleted));
}

#[test]
fn cancel_of_pending_ride_removes_it_from_the_queue() {
    let mut tw = TestWorld::new();
    tw.submit_campus_ride("ride-1", PriorityClass::Normal, 1_000);

    // Submission and failed assignment pass (no drivers online).
    tw.step();
    tw.step();
    assert_eq!(tw.ride_status("ride-1"), RideStatus::Pending);

    let now = tw
        .world
        .resource::<dispatch_core::clock::DispatchClock>()
        .now();
    tw.schedule_ride_event("ride-1", EventKind::RideCancel, now + 1_000);
    tw.run_all(100);

    assert_eq!(tw.ride_status("ride-1"), RideStatus::Cancelled);
    assert!(tw.world.resource::<PendingQueue>().is_empty());
    let telemetry = tw.world.resource::<DispatchTelemetry>();
    assert_eq!(telemetry.cancellations_total, 1);
    assert_eq!(telemetry.assignments_total, 0);
}

#[test]
fn cancel_after_assignment_frees_the_driver() {
    let mut tw = TestWorld::new();
    let driver_entity = spawn_driver(&mut tw.world, test_driver("01"));

    tw.submit_campus_ride("ride-1", PriorityClass::Exam, 1_000);
    tw.run_all(100);
    assert_eq!(tw.ride_status("ride-1"), RideStatus::Accepted);

    tw.schedule_ride_event("ride-1", EventKind::RideCancel, 30_000);
    tw.run_all(100);

    assert_eq!(tw.ride_status("ride-1"), RideStatus::Cancelled);
    let entity = tw.ride_entity("ride-1");
    let record = &tw
        .world
        .entity(entity)
        .get::<RideHandle>()
        .expect("handle")
        .record;
    assert!(record.assigned_driver.is_none());

    let driver = tw
        .world
        .entity(driver_entity)
        .get::<DriverAgent>()
        .expect("driver");
    assert_eq!(driver.record.status, DriverStatus::Idle);
    assert_eq!(driver.current_ride, None);
}

#[test]
fn cancelling_an_in_progress_ride_is_rejected_and_it_still_completes() {
    let mut tw = TestWorld::new();
    spawn_driver(&mut tw.world, test_driver("01"));

    tw.submit_campus_ride("ride-1", PriorityClass::Normal, 1_000);
    tw.run_all(100);
    tw.schedule_ride_event("ride-1", EventKind::RideStarted, 60_000);
    tw.run_all(100);
    assert_eq!(tw.ride_status("ride-1"), RideStatus::InProgress);

    tw.schedule_ride_event("ride-1", EventKind::RideCancel, 90_000);
    tw.run_all(100);
    assert_eq!(tw.ride_status("ride-1"), RideStatus::InProgress);
    assert_eq!(
        tw.world
            .resource::<DispatchTelemetry>()
            .rejected_transitions_total,
        1
    );
    assert_eq!(tw.world.resource::<DispatchTelemetry>().cancellations_total, 0);

    tw.schedule_ride_event("ride-1", EventKind::RideCompleted, 120_000);
    tw.run_all(100);
    assert_eq!(tw.ride_status("ride-1"), RideStatus::Completed);
}

#[test]
fn out_of_order_lifecycle_events_are_rejected_not_applied() {
    let mut tw = TestWorld::new();
    tw.submit_campus_ride("ride-1", PriorityClass::Normal, 1_000);
    tw.step();
    tw.step();

    // Started without ever being accepted.
    let now = tw
        .world
        .resource::<dispatch_core::clock::DispatchClock>()
        .now();
    tw.schedule_ride_event("ride-1", EventKind::RideStarted, now + 1_000);
    tw.schedule_ride_event("ride-1", EventKind::RideCompleted, now + 2_000);
    tw.run_all(100);

    assert_eq!(tw.ride_status("ride-1"), RideStatus::Pending);
    assert_eq!(
        tw.world
            .resource::<DispatchTelemetry>()
            .rejected_transitions_total,
        2
    );
}

#[test]
fn notification_failures_never_block_transitions() {
    let mut tw = TestWorld::new().with_failing_notifier();
    spawn_driver(&mut tw.world, test_driver("01"));

    tw.submit_campus_ride("ride-1", PriorityClass::Normal, 1_000);
    tw.run_all(100);
    tw.schedule_ride_event("ride-1", EventKind::RideStarted, 60_000);
    tw.schedule_ride_event("ride-1", EventKind::RideCompleted, 120_000);
    tw.run_all(100);

    assert_eq!(tw.ride_status("ride-1"), RideStatus::Completed);
    let telemetry = tw.world.resource::<DispatchTelemetry>();
    assert_eq!(telemetry.assignments_total, 1);
    assert!(telemetry.notification_failures_total >= 4);
}
