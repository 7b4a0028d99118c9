//! Route sequencing: pluggable planner trait plus the shipping greedy
//! nearest-neighbor implementation.
//!
//! The planner is stored as a `Box<dyn RoutePlanner>` ECS resource so the
//! engine is not tied to one implementation, but the nearest-neighbor
//! heuristic is the behavioural contract: it is O(n²) in the stop count and
//! can produce a longer tour than the optimal Hamiltonian path. Swapping in
//! an exact solver would change observable ETAs and is deliberately avoided.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::{haversine_km, GeoPoint};

/// Fixed average shuttle speed used for ETA estimation (km/h).
pub const AVERAGE_SPEED_KMH: f64 = 20.0;

/// A resolved route waypoint. Unlike request locations, waypoints always
/// carry coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub point: GeoPoint,
}

impl Waypoint {
    pub fn new(name: &str, lat: f64, lng: f64) -> Self {
        Self {
            name: name.to_string(),
            point: GeoPoint::new(lat, lng),
        }
    }
}

/// An ordered visiting sequence with total distance and estimated time.
/// Produced fresh per call; never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// start, visited stops in chosen order, end.
    pub waypoints: Vec<Waypoint>,
    pub distance_km: f64,
    pub time_minutes: f64,
}

/// Travel time in minutes at the fixed average speed.
pub fn travel_minutes(distance_km: f64) -> f64 {
    distance_km / AVERAGE_SPEED_KMH * 60.0
}

/// Trait for route sequencing backends. Implementations must be `Send + Sync`
/// so the planner can be stored as a shared ECS resource.
pub trait RoutePlanner: Send + Sync {
    /// Order `stops` into a visiting sequence from `start` to `end`.
    fn plan(
        &self,
        start: &Waypoint,
        end: &Waypoint,
        stops: &[Waypoint],
    ) -> Result<RoutePlan, DispatchError>;
}

/// ECS resource wrapping a boxed route planner.
#[derive(Resource)]
pub struct RoutePlannerResource(pub Box<dyn RoutePlanner>);

impl std::ops::Deref for RoutePlannerResource {
    type Target = dyn RoutePlanner;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Greedy nearest-neighbor sequencing: start at `start`, repeatedly visit the
/// closest remaining stop, then append `end` (unless it coincides with the
/// final position).
#[derive(Debug, Default)]
pub struct NearestNeighborPlanner;

impl RoutePlanner for NearestNeighborPlanner {
    fn plan(
        &self,
        start: &Waypoint,
        end: &Waypoint,
        stops: &[Waypoint],
    ) -> Result<RoutePlan, DispatchError> {
        start.point.validate()?;
        end.point.validate()?;
        for stop in stops {
            stop.point.validate()?;
        }

        let mut remaining: Vec<Waypoint> = stops.to_vec();
        let mut route: Vec<Waypoint> = Vec::with_capacity(stops.len() + 2);
        let mut current = start.clone();
        route.push(current.clone());

        while !remaining.is_empty() {
            let mut nearest_index = 0;
            let mut nearest_distance = haversine_km(current.point, remaining[0].point);
            for (i, candidate) in remaining.iter().enumerate().skip(1) {
                let d = haversine_km(current.point, candidate.point);
                if d < nearest_distance {
                    nearest_distance = d;
                    nearest_index = i;
                }
            }
            let next = remaining.remove(nearest_index);
            route.push(next.clone());
            current = next;
        }

        // Do not duplicate the end point if the tour already finishes there.
        if end.name != current.name {
            route.push(end.clone());
        }

        let mut distance_km = 0.0;
        for leg in route.windows(2) {
            distance_km += haversine_km(leg[0].point, leg[1].point);
        }

        Ok(RoutePlan {
            waypoints: route,
            distance_km,
            time_minutes: travel_minutes(distance_km),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_gate() -> Waypoint {
        Waypoint::new("Main Gate", 13.1344, 77.5681)
    }

    fn lab_block() -> Waypoint {
        Waypoint::new("Lab Block", 13.1340, 77.5685)
    }

    fn hostel_area() -> Waypoint {
        Waypoint::new("Hostel Area", 13.1354, 77.5667)
    }

    #[test]
    fn single_stop_is_inserted_between_endpoints() {
        let plan = NearestNeighborPlanner
            .plan(&main_gate(), &lab_block(), &[hostel_area()])
            .expect("plan");

        let names: Vec<&str> = plan.waypoints.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Main Gate", "Hostel Area", "Lab Block"]);

        let expected = haversine_km(main_gate().point, hostel_area().point)
            + haversine_km(hostel_area().point, lab_block().point);
        assert!((plan.distance_km - expected).abs() < 1e-12);
        assert!((plan.time_minutes - expected / AVERAGE_SPEED_KMH * 60.0).abs() < 1e-12);
    }

    #[test]
    fn zero_stops_yields_direct_route() {
        let plan = NearestNeighborPlanner
            .plan(&main_gate(), &lab_block(), &[])
            .expect("plan");
        assert_eq!(plan.waypoints.len(), 2);
        assert!(
            (plan.distance_km - haversine_km(main_gate().point, lab_block().point)).abs() < 1e-12
        );
    }

    #[test]
    fn end_equal_to_final_stop_is_not_duplicated() {
        let plan = NearestNeighborPlanner
            .plan(&main_gate(), &lab_block(), &[hostel_area(), lab_block()])
            .expect("plan");
        let names: Vec<&str> = plan.waypoints.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Main Gate", "Hostel Area", "Lab Block"]);
    }

    #[test]
    fn every_stop_appears_exactly_once() {
        let stops = vec![
            hostel_area(),
            Waypoint::new("Library", 13.1330, 77.5700),
            Waypoint::new("Sports Complex", 13.1360, 77.5650),
            Waypoint::new("Cafeteria", 13.1348, 77.5690),
        ];
        let plan = NearestNeighborPlanner
            .plan(&main_gate(), &lab_block(), &stops)
            .expect("plan");

        assert_eq!(plan.waypoints.first().unwrap().name, "Main Gate");
        assert_eq!(plan.waypoints.last().unwrap().name, "Lab Block");
        for stop in &stops {
            let count = plan
                .waypoints
                .iter()
                .filter(|w| w.name == stop.name)
                .count();
            assert_eq!(count, 1, "stop {} visited {} times", stop.name, count);
        }
    }

    #[test]
    fn total_distance_at_least_direct_distance() {
        let stops = vec![hostel_area(), Waypoint::new("Library", 13.1330, 77.5700)];
        let plan = NearestNeighborPlanner
            .plan(&main_gate(), &lab_block(), &stops)
            .expect("plan");
        let direct = haversine_km(main_gate().point, lab_block().point);
        assert!(plan.distance_km >= direct - 1e-12);
    }

    #[test]
    fn greedy_visits_closest_stop_first() {
        // Cafeteria is much closer to Main Gate than Girls Hostel; the greedy
        // tour must pick it first even though the reverse order is shorter
        // overall in some layouts.
        let near = Waypoint::new("Cafeteria", 13.1346, 77.5683);
        let far = Waypoint::new("Girls Hostel", 13.10646, 77.57173);
        let plan = NearestNeighborPlanner
            .plan(&main_gate(), &lab_block(), &[far.clone(), near.clone()])
            .expect("plan");
        let names: Vec<&str> = plan.waypoints.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Main Gate", "Cafeteria", "Girls Hostel", "Lab Block"]
        );
    }

    #[test]
    fn rejects_invalid_stop_coordinates() {
        let bad = Waypoint::new("Nowhere", 120.0, 200.0);
        assert!(NearestNeighborPlanner
            .plan(&main_gate(), &lab_block(), &[bad])
            .is_err());
    }
}
