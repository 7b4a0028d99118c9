//! Campus zone registry: named geographic areas with centroid coordinates.
//!
//! The registry is static reference data, read-only to the engine. Demand
//! samples are attributed to the nearest zone centroid.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::{haversine_km, GeoPoint};

/// A named geographic area used as the unit of demand aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub centroid: GeoPoint,
}

impl Zone {
    pub fn new(name: &str, lat: f64, lng: f64) -> Self {
        Self {
            name: name.to_string(),
            centroid: GeoPoint::new(lat, lng),
        }
    }
}

/// Static mapping from zone/location name to centroid coordinate.
#[derive(Debug, Clone, Default, Resource)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
}

impl ZoneRegistry {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    /// The campus demand zones used by the operations dashboard.
    pub fn campus_default() -> Self {
        Self::new(vec![
            Zone::new("Main Gate", 13.13440, 77.56811),
            Zone::new("Hostel Area", 13.13543, 77.56668),
            Zone::new("Lab Block", 13.13401, 77.56855),
            Zone::new("Girls Hostel", 13.10646, 77.57173),
        ])
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn names(&self) -> Vec<String> {
        self.zones.iter().map(|z| z.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Result<&Zone, DispatchError> {
        self.zones
            .iter()
            .find(|z| z.name == name)
            .ok_or_else(|| DispatchError::NotFound(format!("zone {name}")))
    }

    /// Classify a point by nearest centroid. `None` only for an empty registry.
    pub fn nearest_zone(&self, point: GeoPoint) -> Option<&Zone> {
        let mut best: Option<(&Zone, f64)> = None;
        for zone in &self.zones {
            let d = haversine_km(point, zone.centroid);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((zone, d));
            }
        }
        best.map(|(zone, _)| zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_zone_picks_closest_centroid() {
        let registry = ZoneRegistry::campus_default();
        // A point right on the Hostel Area centroid.
        let zone = registry
            .nearest_zone(GeoPoint::new(13.13543, 77.56668))
            .expect("zone");
        assert_eq!(zone.name, "Hostel Area");
    }

    #[test]
    fn unknown_zone_is_not_found() {
        let registry = ZoneRegistry::campus_default();
        assert!(matches!(
            registry.get("Moon Base"),
            Err(DispatchError::NotFound(_))
        ));
    }

    #[test]
    fn empty_registry_has_no_nearest_zone() {
        let registry = ZoneRegistry::default();
        assert!(registry.nearest_zone(GeoPoint::new(0.0, 0.0)).is_none());
    }
}
