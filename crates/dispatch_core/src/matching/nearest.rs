use bevy_ecs::prelude::Entity;
use h3o::CellIndex;

use crate::geo::haversine_km;
use crate::routing::AVERAGE_SPEED_KMH;
use crate::spatial::point_for_cell;

use super::policy::AssignmentPolicy;

/// Estimate pickup ETA in milliseconds at the fixed shuttle speed.
pub fn estimate_pickup_eta_ms(distance_km: f64) -> u64 {
    if distance_km <= 0.0 {
        return 1000;
    }
    let eta_hours = distance_km / AVERAGE_SPEED_KMH;
    (eta_hours * 3600.0 * 1000.0).max(1000.0) as u64
}

/// Nearest-driver policy: the idle driver with the smallest pickup Haversine
/// distance within the match radius wins.
///
/// Deterministic and cheap (O(n) per ride); the default for per-submission
/// assignment where batch optimization has nothing to trade off.
#[derive(Debug, Default)]
pub struct NearestDriverAssignment;

impl AssignmentPolicy for NearestDriverAssignment {
    fn select_driver(
        &self,
        _ride_entity: Entity,
        pickup_cell: CellIndex,
        idle_drivers: &[(Entity, CellIndex)],
        match_radius: u32,
    ) -> Option<Entity> {
        let pickup = point_for_cell(pickup_cell);
        let mut best: Option<(Entity, f64)> = None;

        for &(driver_entity, driver_cell) in idle_drivers {
            let grid_dist = pickup_cell.grid_distance(driver_cell).unwrap_or(i32::MAX);
            if grid_dist < 0 || grid_dist > match_radius as i32 {
                continue;
            }
            let distance_km = haversine_km(pickup, point_for_cell(driver_cell));
            if best.map_or(true, |(_, best_d)| distance_km < best_d) {
                best = Some((driver_entity, distance_km));
            }
        }

        best.map(|(entity, _)| entity)
    }
}
