//! Test helpers for common fixtures, shared across test files.

use crate::geo::GeoPoint;
use crate::ingest::{DriverRecord, DriverStatus, LocationSample};
use crate::ride::{NamedPoint, PriorityClass, RideRecord};
use crate::routing::Waypoint;

/// Main Gate, the canonical campus test location.
pub const TEST_POINT: GeoPoint = GeoPoint {
    lat: 13.1344,
    lng: 77.5681,
};

pub fn main_gate() -> Waypoint {
    Waypoint::new("Main Gate", 13.1344, 77.5681)
}

pub fn lab_block() -> Waypoint {
    Waypoint::new("Lab Block", 13.1340, 77.5685)
}

pub fn hostel_area() -> Waypoint {
    Waypoint::new("Hostel Area", 13.1354, 77.5667)
}

/// A pending campus ride between two registry zones.
pub fn test_ride(id: &str, priority: PriorityClass, requested_at: u64) -> RideRecord {
    RideRecord::submit(
        id,
        "stu-1",
        "Ravi",
        NamedPoint::named("Main Gate"),
        NamedPoint::named("Lab Block"),
        priority,
        requested_at,
    )
    .expect("test ride should validate")
}

/// An idle driver parked at the Main Gate.
pub fn test_driver(id: &str) -> DriverRecord {
    DriverRecord {
        id: id.to_string(),
        name: format!("Driver {id}"),
        vehicle_number: format!("KA-01-{id}"),
        vehicle_type: "bus".to_string(),
        capacity: 20,
        status: DriverStatus::Idle,
        location: Some(LocationSample {
            point: TEST_POINT,
            timestamp_ms: 0,
            speed_kmh: None,
            heading_deg: None,
        }),
        location_encoding: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_internally_consistent() {
        let ride = test_ride("ride-1", PriorityClass::Emergency, 5);
        assert_eq!(ride.priority_score, 100);
        assert_ne!(ride.pickup.name, ride.destination.name);

        let driver = test_driver("7");
        assert_eq!(driver.status, DriverStatus::Idle);
        assert!(driver.location.is_some());
    }
}
