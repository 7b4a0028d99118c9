use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

pub const ONE_SEC_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    EngineStarted,
    RideSubmitted,
    TryAssign,
    BatchAssign,
    RideStarted,
    RideCompleted,
    RideCancel,
    DriverTelemetry,
    ForecastCycle,
}

/// The entity an event is about, when it is about one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventSubject {
    Ride(Entity),
    Driver(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap: earliest timestamp
        // first, declaration order of EventKind breaking ties.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.kind.cmp(&self.kind))
            .then_with(|| other.subject.cmp(&self.subject))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being processed, inserted by the runner before each
/// schedule pass.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

/// Discrete-event clock driving the engine. Time is engine milliseconds; the
/// scenario epoch maps it to wall-clock time where that matters (forecasting).
#[derive(Debug, Default, Resource)]
pub struct DispatchClock {
    now: u64,
    events: BinaryHeap<Event>,
}

impl DispatchClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, event: Event) {
        debug_assert!(
            event.timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        self.events.push(event);
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule(Event {
            timestamp,
            kind,
            subject,
        });
    }

    /// Schedule relative to the current time.
    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now + delay_ms, kind, subject);
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = DispatchClock::default();
        clock.schedule_at(10, EventKind::RideSubmitted, None);
        clock.schedule_at(5, EventKind::RideSubmitted, None);
        clock.schedule_at(20, EventKind::BatchAssign, None);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.kind, EventKind::BatchAssign);
        assert_eq!(clock.now(), 20);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn simultaneous_events_order_by_kind() {
        let mut clock = DispatchClock::default();
        clock.schedule_at(5, EventKind::TryAssign, None);
        clock.schedule_at(5, EventKind::RideSubmitted, None);
        // RideSubmitted sorts before TryAssign so a submission at time T is
        // visible to an assignment pass at the same instant.
        assert_eq!(clock.pop_next().unwrap().kind, EventKind::RideSubmitted);
        assert_eq!(clock.pop_next().unwrap().kind, EventKind::TryAssign);
    }

    #[test]
    fn schedule_in_is_relative_to_now() {
        let mut clock = DispatchClock::default();
        clock.schedule_at(100, EventKind::ForecastCycle, None);
        clock.pop_next();
        clock.schedule_in(50, EventKind::ForecastCycle, None);
        assert_eq!(clock.next_event_time(), Some(150));
    }
}
