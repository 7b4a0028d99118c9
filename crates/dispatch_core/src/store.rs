//! Collaborator interfaces: the persistent ride store and the change feed.
//!
//! The production backing store is a hosted document database; the engine
//! only assumes per-document atomicity. `update_checked` is the
//! compare-and-set primitive the single-writer-per-ride rule rests on: of two
//! concurrent dispatchers assigning the same pending ride, exactly one
//! observes `Pending` at commit time and the other receives `Conflict`.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::error::DispatchError;
use crate::ingest::DriverRecord;
use crate::ride::{RideRecord, RideStatus};

/// CRUD with per-document compare-and-set semantics.
pub trait RideStore: Send + Sync {
    fn create(&self, record: RideRecord) -> Result<(), DispatchError>;

    fn get(&self, ride_id: &str) -> Result<RideRecord, DispatchError>;

    /// Atomically mutate the ride iff its committed status equals `expected`.
    /// The losing side of a race receives [`DispatchError::Conflict`], never a
    /// silent no-op.
    fn update_checked(
        &self,
        ride_id: &str,
        expected: RideStatus,
        apply: &mut dyn FnMut(&mut RideRecord) -> Result<(), DispatchError>,
    ) -> Result<RideRecord, DispatchError>;
}

/// In-memory reference implementation backing tests and demos.
#[derive(Default)]
pub struct InMemoryRideStore {
    rides: Mutex<HashMap<String, RideRecord>>,
}

impl InMemoryRideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rides.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RideStore for InMemoryRideStore {
    fn create(&self, record: RideRecord) -> Result<(), DispatchError> {
        let mut rides = self
            .rides
            .lock()
            .map_err(|_| DispatchError::ExternalService("ride store lock poisoned".to_string()))?;
        if rides.contains_key(&record.id) {
            return Err(DispatchError::Validation(format!(
                "ride {} already exists",
                record.id
            )));
        }
        rides.insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, ride_id: &str) -> Result<RideRecord, DispatchError> {
        let rides = self
            .rides
            .lock()
            .map_err(|_| DispatchError::ExternalService("ride store lock poisoned".to_string()))?;
        rides
            .get(ride_id)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(format!("ride {ride_id}")))
    }

    fn update_checked(
        &self,
        ride_id: &str,
        expected: RideStatus,
        apply: &mut dyn FnMut(&mut RideRecord) -> Result<(), DispatchError>,
    ) -> Result<RideRecord, DispatchError> {
        let mut rides = self
            .rides
            .lock()
            .map_err(|_| DispatchError::ExternalService("ride store lock poisoned".to_string()))?;
        let record = rides
            .get_mut(ride_id)
            .ok_or_else(|| DispatchError::NotFound(format!("ride {ride_id}")))?;
        if record.status != expected {
            return Err(DispatchError::Conflict {
                expected,
                actual: record.status,
            });
        }
        apply(record)?;
        Ok(record.clone())
    }
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

/// A record delta pushed by the feed.
#[derive(Debug, Clone)]
pub enum RecordDelta {
    RideUpserted(RideRecord),
    RideRemoved(String),
    DriverUpserted(DriverRecord),
    DriverRemoved(String),
}

impl RecordDelta {
    fn is_ride(&self) -> bool {
        matches!(
            self,
            RecordDelta::RideUpserted(_) | RecordDelta::RideRemoved(_)
        )
    }
}

/// Which deltas a subscriber wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaFilter {
    #[default]
    All,
    RidesOnly,
    DriversOnly,
}

impl DeltaFilter {
    fn accepts(&self, delta: &RecordDelta) -> bool {
        match self {
            DeltaFilter::All => true,
            DeltaFilter::RidesOnly => delta.is_ride(),
            DeltaFilter::DriversOnly => !delta.is_ride(),
        }
    }
}

/// A live subscription. Dropping it without calling [`Subscription::unsubscribe`]
/// also detaches it (the feed prunes closed channels on publish).
pub struct Subscription {
    receiver: Receiver<RecordDelta>,
    cancel: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    /// Drain the next pending delta, if any. Never blocks.
    pub fn try_next(&self) -> Option<RecordDelta> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything currently pending.
    pub fn drain(&self) -> Vec<RecordDelta> {
        let mut deltas = Vec::new();
        while let Some(delta) = self.try_next() {
            deltas.push(delta);
        }
        deltas
    }

    /// Explicitly detach from the feed.
    pub fn unsubscribe(self) {
        (self.cancel)();
    }
}

/// Push-based subscription source for record deltas.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, filter: DeltaFilter) -> Subscription;
}

#[derive(Default)]
struct FeedInner {
    next_id: u64,
    subscribers: HashMap<u64, (DeltaFilter, Sender<RecordDelta>)>,
}

/// In-memory change feed for tests and demos. The production feed is the
/// hosted store's realtime listener, adapted to this interface by glue code.
#[derive(Clone, Default)]
pub struct InMemoryChangeFeed {
    inner: Arc<Mutex<FeedInner>>,
}

impl InMemoryChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a delta to every matching subscriber.
    pub fn publish(&self, delta: RecordDelta) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.subscribers.retain(|_, (filter, sender)| {
            if !filter.accepts(&delta) {
                return true;
            }
            sender.send(delta.clone()).is_ok()
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().map(|i| i.subscribers.len()).unwrap_or(0)
    }
}

impl ChangeFeed for InMemoryChangeFeed {
    fn subscribe(&self, filter: DeltaFilter) -> Subscription {
        let (sender, receiver) = channel();
        let id = {
            let mut inner = self.inner.lock().expect("feed lock");
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.insert(id, (filter, sender));
            id
        };
        let inner = Arc::clone(&self.inner);
        Subscription {
            receiver,
            cancel: Box::new(move || {
                if let Ok(mut inner) = inner.lock() {
                    inner.subscribers.remove(&id);
                }
            }),
        }
    }
}
