//! Ingestion boundary: raw hosted-store documents normalized to canonical
//! records, exactly once.
//!
//! The surrounding product accumulated duck-typed record shapes over time:
//! driver names sometimes top-level, sometimes nested under `assignedDriver`;
//! driver coordinates either a structured pair or a formatted string like
//! `"13.135° N, 77.566° E"`. Everything past this module works with one
//! canonical shape. Which coordinate encoding is authoritative was never
//! resolved upstream, so a record that arrived with the legacy string is
//! flagged rather than silently coerced.

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::{parse_coordinate_string, GeoPoint};
use crate::ride::{AssignedDriver, NamedPoint, PriorityClass, RideRecord, RideStatus};

/// Driver availability as reported by the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    Idle,
    Active,
    Offline,
}

impl DriverStatus {
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        match raw {
            "idle" => Ok(DriverStatus::Idle),
            "active" => Ok(DriverStatus::Active),
            "offline" => Ok(DriverStatus::Offline),
            other => Err(DispatchError::Validation(format!(
                "unknown driver status {other:?}"
            ))),
        }
    }
}

/// Which encoding a driver's coordinates arrived in. `LegacyString` marks a
/// data-quality issue for operators; the values are still used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateEncoding {
    Structured,
    LegacyString,
}

/// Latest telemetry sample for a driver. Overwritten by newer samples only;
/// stale samples are dropped, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub point: GeoPoint,
    pub timestamp_ms: u64,
    pub speed_kmh: Option<f64>,
    pub heading_deg: Option<f64>,
}

/// Last-write-wins merge by sample timestamp.
pub fn latest_sample(current: Option<LocationSample>, incoming: LocationSample) -> LocationSample {
    match current {
        Some(existing) if existing.timestamp_ms > incoming.timestamp_ms => existing,
        _ => incoming,
    }
}

/// Canonical driver record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub id: String,
    pub name: String,
    pub vehicle_number: String,
    pub vehicle_type: String,
    pub capacity: u32,
    pub status: DriverStatus,
    pub location: Option<LocationSample>,
    pub location_encoding: Option<CoordinateEncoding>,
}

// ---------------------------------------------------------------------------
// Raw document shapes
// ---------------------------------------------------------------------------

/// Coordinates as they appear in the wild: a structured pair under either
/// field-naming convention, or the legacy formatted string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinates {
    Geo { latitude: f64, longitude: f64 },
    LatLng { lat: f64, lng: f64 },
    Legacy(String),
}

impl RawCoordinates {
    fn resolve(&self) -> Result<(GeoPoint, CoordinateEncoding), DispatchError> {
        let (point, encoding) = match self {
            RawCoordinates::Geo {
                latitude,
                longitude,
            } => (
                GeoPoint::new(*latitude, *longitude),
                CoordinateEncoding::Structured,
            ),
            RawCoordinates::LatLng { lat, lng } => {
                (GeoPoint::new(*lat, *lng), CoordinateEncoding::Structured)
            }
            RawCoordinates::Legacy(s) => {
                (parse_coordinate_string(s)?, CoordinateEncoding::LegacyString)
            }
        };
        point.validate()?;
        Ok((point, encoding))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub coordinates: RawCoordinates,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDriverDoc {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_location: Option<RawLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssignedDriver {
    pub driver_id: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRideDoc {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub student_name: Option<String>,
    pub pickup: String,
    pub destination: String,
    #[serde(default)]
    pub pickup_coords: Option<RawCoordinates>,
    #[serde(default)]
    pub destination_coords: Option<RawCoordinates>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub request_time_ms: Option<u64>,
    #[serde(default)]
    pub priority: Option<String>,
    // Duck-typed driver fields: sometimes top-level, sometimes nested.
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub assigned_driver: Option<RawAssignedDriver>,
    #[serde(default)]
    pub assigned_time_ms: Option<u64>,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub completed_time_ms: Option<u64>,
    #[serde(default)]
    pub cancelled_at_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn parse_ride_status(raw: Option<&str>) -> Result<RideStatus, DispatchError> {
    match raw.unwrap_or("pending") {
        "pending" => Ok(RideStatus::Pending),
        // Two historical names for the same state.
        "accepted" | "assigned" => Ok(RideStatus::Accepted),
        "in-progress" => Ok(RideStatus::InProgress),
        "completed" => Ok(RideStatus::Completed),
        "cancelled" => Ok(RideStatus::Cancelled),
        other => Err(DispatchError::Validation(format!(
            "unknown ride status {other:?}"
        ))),
    }
}

fn optional_point(raw: &Option<RawCoordinates>) -> Result<Option<GeoPoint>, DispatchError> {
    match raw {
        Some(coords) => Ok(Some(coords.resolve()?.0)),
        None => Ok(None),
    }
}

/// Normalize a raw ride document into the canonical [`RideRecord`].
///
/// The assigned-driver sub-object wins over the scattered top-level fields;
/// driver fields on a ride that is not in a driver-holding status are stale
/// remnants and are dropped to restore the record invariant.
pub fn normalize_ride(doc: &RawRideDoc) -> Result<RideRecord, DispatchError> {
    if doc.pickup.trim().is_empty() || doc.destination.trim().is_empty() {
        return Err(DispatchError::Validation(
            "pickup and destination are required".to_string(),
        ));
    }
    if doc.pickup == doc.destination {
        return Err(DispatchError::Validation(format!(
            "pickup and destination are identical: {}",
            doc.pickup
        )));
    }

    let status = parse_ride_status(doc.status.as_deref())?;
    let priority = PriorityClass::parse(doc.priority.as_deref().unwrap_or("normal"));

    let assigned_driver = if matches!(
        status,
        RideStatus::Accepted | RideStatus::InProgress | RideStatus::Completed
    ) {
        let resolved = match (&doc.assigned_driver, &doc.driver_id) {
            (Some(nested), _) => Some(AssignedDriver {
                driver_id: nested.driver_id.clone(),
                driver_name: nested
                    .driver_name
                    .clone()
                    .or_else(|| doc.driver_name.clone())
                    .unwrap_or_else(|| "Driver".to_string()),
                vehicle_number: nested
                    .vehicle_number
                    .clone()
                    .or_else(|| doc.vehicle_number.clone())
                    .unwrap_or_default(),
            }),
            (None, Some(driver_id)) => Some(AssignedDriver {
                driver_id: driver_id.clone(),
                driver_name: doc
                    .driver_name
                    .clone()
                    .unwrap_or_else(|| "Driver".to_string()),
                vehicle_number: doc.vehicle_number.clone().unwrap_or_default(),
            }),
            (None, None) => None,
        };
        match resolved {
            Some(driver) => Some(driver),
            None => {
                return Err(DispatchError::Validation(format!(
                    "ride {} is {status:?} but carries no driver",
                    doc.id
                )))
            }
        }
    } else {
        None
    };

    Ok(RideRecord {
        id: doc.id.clone(),
        rider_id: doc.student_id.clone(),
        rider_name: doc
            .student_name
            .clone()
            .unwrap_or_else(|| "Student".to_string()),
        pickup: NamedPoint {
            name: doc.pickup.clone(),
            point: optional_point(&doc.pickup_coords)?,
        },
        destination: NamedPoint {
            name: doc.destination.clone(),
            point: optional_point(&doc.destination_coords)?,
        },
        priority,
        priority_score: crate::ranking::priority_score(priority),
        status,
        requested_at: doc.request_time_ms.unwrap_or(0),
        assigned_driver,
        assigned_at: doc.assigned_time_ms,
        started_at: doc.started_at_ms,
        completed_at: doc.completed_time_ms,
        cancelled_at: doc.cancelled_at_ms,
    })
}

/// Normalize a raw driver document into the canonical [`DriverRecord`].
pub fn normalize_driver(doc: &RawDriverDoc) -> Result<DriverRecord, DispatchError> {
    let status = DriverStatus::parse(doc.status.as_deref().unwrap_or("idle"))?;

    let (location, location_encoding) = match &doc.current_location {
        Some(raw) => {
            let (point, encoding) = raw.coordinates.resolve()?;
            (
                Some(LocationSample {
                    point,
                    timestamp_ms: raw.timestamp_ms.unwrap_or(0),
                    speed_kmh: raw.speed,
                    heading_deg: raw.heading,
                }),
                Some(encoding),
            )
        }
        None => (None, None),
    };

    Ok(DriverRecord {
        id: doc.id.clone(),
        name: doc.name.clone().unwrap_or_else(|| "Driver".to_string()),
        vehicle_number: doc.vehicle_number.clone().unwrap_or_default(),
        vehicle_type: doc.vehicle_type.clone().unwrap_or_else(|| "bus".to_string()),
        capacity: doc.capacity.unwrap_or(20),
        status,
        location,
        location_encoding,
    })
}

// ---------------------------------------------------------------------------
// Location-sharing sessions
// ---------------------------------------------------------------------------

/// Explicit per-session location-sharing state.
///
/// Each logical session (a driver's device, a test) owns its state and its
/// platform watch handle; there is no process-wide tracking flag, so sessions
/// cannot observe each other.
#[derive(Debug, Default)]
pub struct TrackingSession {
    watch_handle: Option<u64>,
}

impl TrackingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin sharing, taking ownership of the platform watch handle.
    pub fn start(&mut self, watch_handle: u64) -> Result<(), DispatchError> {
        if self.watch_handle.is_some() {
            return Err(DispatchError::Validation(
                "location sharing already active for this session".to_string(),
            ));
        }
        self.watch_handle = Some(watch_handle);
        Ok(())
    }

    /// Stop sharing. Returns the watch handle so the caller can clear it with
    /// the platform; `None` if the session was not tracking.
    pub fn stop(&mut self) -> Option<u64> {
        self.watch_handle.take()
    }

    pub fn is_tracking(&self) -> bool {
        self.watch_handle.is_some()
    }
}
