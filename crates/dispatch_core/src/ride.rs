//! Ride records and the lifecycle state machine.
//!
//! Transitions are pure with respect to the record: given the record and the
//! operation, the result is deterministic. Callers own retry policy; nothing
//! here retries. The legal paths are
//! `Pending -> Accepted -> InProgress -> Completed`, with `Cancelled`
//! reachable from `Pending` or `Accepted` only.

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

/// Declared urgency class of a request. Unrecognized classes fall back to
/// `Normal` when parsed from a raw document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityClass {
    Normal,
    Exam,
    Emergency,
}

impl PriorityClass {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "emergency" => PriorityClass::Emergency,
            "exam" => PriorityClass::Exam,
            _ => PriorityClass::Normal,
        }
    }
}

/// A named location with optional resolved coordinates. Requests arrive with
/// location names; coordinates are attached from the zone registry when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub point: Option<GeoPoint>,
}

impl NamedPoint {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            point: None,
        }
    }

    pub fn with_point(name: &str, point: GeoPoint) -> Self {
        Self {
            name: name.to_string(),
            point: Some(point),
        }
    }
}

/// The assigned driver sub-record, resolved once at assignment time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedDriver {
    pub driver_id: String,
    pub driver_name: String,
    pub vehicle_number: String,
}

/// Canonical ride record. Owned by the requesting rider for its lifetime,
/// mutated only through the transition methods below, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRecord {
    pub id: String,
    pub rider_id: String,
    pub rider_name: String,
    pub pickup: NamedPoint,
    pub destination: NamedPoint,
    pub priority: PriorityClass,
    pub priority_score: i64,
    pub status: RideStatus,
    /// Creation instant (epoch ms). Immutable.
    pub requested_at: u64,
    pub assigned_driver: Option<AssignedDriver>,
    pub assigned_at: Option<u64>,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub cancelled_at: Option<u64>,
}

impl RideRecord {
    /// Create a ride in `Pending`, stamping `requested_at`.
    pub fn submit(
        id: &str,
        rider_id: &str,
        rider_name: &str,
        pickup: NamedPoint,
        destination: NamedPoint,
        priority: PriorityClass,
        requested_at: u64,
    ) -> Result<Self, DispatchError> {
        if pickup.name.trim().is_empty() || destination.name.trim().is_empty() {
            return Err(DispatchError::Validation(
                "pickup and destination are required".to_string(),
            ));
        }
        if pickup.name == destination.name {
            return Err(DispatchError::Validation(format!(
                "pickup and destination are identical: {}",
                pickup.name
            )));
        }
        if let Some(p) = pickup.point {
            p.validate()?;
        }
        if let Some(p) = destination.point {
            p.validate()?;
        }
        Ok(Self {
            id: id.to_string(),
            rider_id: rider_id.to_string(),
            rider_name: rider_name.to_string(),
            pickup,
            destination,
            priority,
            priority_score: crate::ranking::priority_score(priority),
            status: RideStatus::Pending,
            requested_at,
            assigned_driver: None,
            assigned_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        })
    }

    /// `Pending -> Accepted`. A ride that is no longer pending (cancelled, or
    /// already taken by a concurrent dispatcher) is a [`DispatchError::Conflict`].
    pub fn assign(&mut self, driver: AssignedDriver, now: u64) -> Result<(), DispatchError> {
        if self.status != RideStatus::Pending {
            return Err(DispatchError::Conflict {
                expected: RideStatus::Pending,
                actual: self.status,
            });
        }
        self.assigned_driver = Some(driver);
        self.assigned_at = Some(now.max(self.requested_at));
        self.status = RideStatus::Accepted;
        Ok(())
    }

    /// `Accepted -> InProgress`.
    pub fn start(&mut self, now: u64) -> Result<(), DispatchError> {
        if self.status != RideStatus::Accepted {
            return Err(DispatchError::InvalidTransition {
                from: self.status,
                operation: "start",
            });
        }
        self.started_at = Some(now.max(self.assigned_at.unwrap_or(self.requested_at)));
        self.status = RideStatus::InProgress;
        Ok(())
    }

    /// `InProgress -> Completed`.
    pub fn complete(&mut self, completion_time: u64) -> Result<(), DispatchError> {
        if self.status != RideStatus::InProgress {
            return Err(DispatchError::InvalidTransition {
                from: self.status,
                operation: "complete",
            });
        }
        self.completed_at = Some(completion_time.max(self.started_at.unwrap_or(self.requested_at)));
        self.status = RideStatus::Completed;
        Ok(())
    }

    /// `Pending|Accepted -> Cancelled`. An in-progress ride can only reach
    /// `Completed`; cancelling it is an [`DispatchError::InvalidTransition`].
    pub fn cancel(&mut self, now: u64) -> Result<(), DispatchError> {
        match self.status {
            RideStatus::Pending | RideStatus::Accepted => {
                // Invariant: assigned_driver is set iff Accepted/InProgress/Completed.
                self.assigned_driver = None;
                self.cancelled_at = Some(now.max(self.requested_at));
                self.status = RideStatus::Cancelled;
                Ok(())
            }
            other => Err(DispatchError::InvalidTransition {
                from: other,
                operation: "cancel",
            }),
        }
    }
}
