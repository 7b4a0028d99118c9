#![allow(dead_code)]

use bevy_ecs::prelude::{Entity, Schedule, World};

use dispatch_core::clock::{DispatchClock, EventKind, EventSubject};
use dispatch_core::ecs::{RideDirectory, RideHandle};
use dispatch_core::notify::{CollectingDispatcher, FailingDispatcher, NotifierResource};
use dispatch_core::ride::{NamedPoint, PriorityClass, RideRecord, RideStatus};
use dispatch_core::runner::{dispatch_schedule, run_next_event, run_until_empty};
use dispatch_core::scenario::{build_dispatch_world, enqueue_ride, DispatchParams};

/// Shared harness wrapping a dispatch world, its schedule and a capturing
/// notifier for assertions.
pub struct TestWorld {
    pub world: World,
    pub schedule: Schedule,
    pub notifier: CollectingDispatcher,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_params(DispatchParams::default())
    }

    pub fn with_params(params: DispatchParams) -> Self {
        let mut world = build_dispatch_world(&params);
        let notifier = CollectingDispatcher::new();
        world.insert_resource(NotifierResource(Box::new(notifier.clone())));
        Self {
            world,
            schedule: dispatch_schedule(),
            notifier,
        }
    }

    /// Swap in a notifier whose deliveries always fail.
    pub fn with_failing_notifier(mut self) -> Self {
        self.world
            .insert_resource(NotifierResource(Box::new(FailingDispatcher)));
        self
    }

    pub fn submit_campus_ride(&mut self, id: &str, priority: PriorityClass, at_ms: u64) {
        let record = RideRecord::submit(
            id,
            &format!("stu-{id}"),
            "Student",
            NamedPoint::named("Main Gate"),
            NamedPoint::named("Lab Block"),
            priority,
            at_ms,
        )
        .expect("valid request");
        enqueue_ride(&mut self.world, record, at_ms);
    }

    pub fn step(&mut self) -> bool {
        run_next_event(&mut self.world, &mut self.schedule)
    }

    pub fn run_all(&mut self, max_steps: usize) -> usize {
        run_until_empty(&mut self.world, &mut self.schedule, max_steps)
    }

    pub fn ride_entity(&self, id: &str) -> Entity {
        self.world
            .resource::<RideDirectory>()
            .get(id)
            .expect("ride registered")
    }

    pub fn ride_status(&self, id: &str) -> RideStatus {
        self.try_ride_status(id).expect("ride registered")
    }

    /// `None` until the submission event has been processed.
    pub fn try_ride_status(&self, id: &str) -> Option<RideStatus> {
        let entity = self.world.resource::<RideDirectory>().get(id)?;
        self.world
            .entity(entity)
            .get::<RideHandle>()
            .map(|h| h.record.status)
    }

    /// Schedule a lifecycle event against a ride by document id.
    pub fn schedule_ride_event(&mut self, id: &str, kind: EventKind, at_ms: u64) {
        let entity = self.ride_entity(id);
        self.world.resource_mut::<DispatchClock>().schedule_at(
            at_ms,
            kind,
            Some(EventSubject::Ride(entity)),
        );
    }
}
