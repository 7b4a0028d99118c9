//! Hungarian (Kuhn-Munkres) batch assignment: maximum-weight bipartite
//! matching over a distance + pickup-ETA cost, minimizing total cost across
//! the whole batch instead of greedily per ride.

use bevy_ecs::prelude::Entity;
use h3o::CellIndex;
use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use crate::geo::haversine_km;
use crate::spatial::point_for_cell;

use super::nearest::{estimate_pickup_eta_ms, NearestDriverAssignment};
use super::policy::AssignmentPolicy;
use super::types::AssignmentPair;

/// Scale factor to convert f64 score to i64 for the assignment algorithm.
const SCALE: f64 = 1_000_000.0;

/// Weight for pairs outside the match radius (never selected).
/// Must be worse than any feasible score but not so extreme that negating and
/// summing overflows i64.
const INFEASIBLE: i64 = -1_000_000_000_000_i64;

/// Simple matrix type implementing pathfinding's Weights for i64.
struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

/// Global batch assignment. Single-ride selection delegates to
/// [`NearestDriverAssignment`]; small batches use a greedy pass where the
/// O(n³) Hungarian overhead buys nothing.
#[derive(Debug)]
pub struct HungarianAssignment {
    eta_weight: f64,
    fallback: NearestDriverAssignment,
}

impl HungarianAssignment {
    pub fn new(eta_weight: f64) -> Self {
        Self {
            eta_weight,
            fallback: NearestDriverAssignment,
        }
    }

    fn score_pairing(&self, pickup_distance_km: f64, pickup_eta_ms: u64) -> f64 {
        -pickup_distance_km - (pickup_eta_ms as f64 / 1000.0) * self.eta_weight
    }

    fn score_cells(&self, ride_cell: CellIndex, driver_cell: CellIndex) -> f64 {
        let distance_km = haversine_km(point_for_cell(ride_cell), point_for_cell(driver_cell));
        self.score_pairing(distance_km, estimate_pickup_eta_ms(distance_km))
    }

    fn score_to_weight(score: f64) -> i64 {
        let w = score * SCALE;
        if w >= i64::MAX as f64 {
            i64::MAX
        } else if w <= i64::MIN as f64 {
            i64::MIN
        } else {
            w as i64
        }
    }

    fn within_radius(a: CellIndex, b: CellIndex, match_radius: u32) -> bool {
        let grid_dist = a.grid_distance(b).unwrap_or(i32::MAX);
        grid_dist >= 0 && grid_dist <= match_radius as i32
    }

    /// Greedy batch for small inputs (O(n*m)): best remaining driver per ride.
    fn greedy_batch(
        &self,
        rides: &[(Entity, CellIndex)],
        idle_drivers: &[(Entity, CellIndex)],
        match_radius: u32,
    ) -> Vec<AssignmentPair> {
        let mut results = Vec::new();
        let mut used = std::collections::HashSet::new();

        for &(ride_entity, ride_cell) in rides {
            let mut best: Option<(Entity, f64)> = None;
            for &(driver_entity, driver_cell) in idle_drivers {
                if used.contains(&driver_entity)
                    || !Self::within_radius(ride_cell, driver_cell, match_radius)
                {
                    continue;
                }
                let score = self.score_cells(ride_cell, driver_cell);
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((driver_entity, score));
                }
            }
            if let Some((driver_entity, _)) = best {
                used.insert(driver_entity);
                results.push(AssignmentPair {
                    ride_entity,
                    driver_entity,
                });
            }
        }

        results
    }
}

impl Default for HungarianAssignment {
    fn default() -> Self {
        Self::new(super::DEFAULT_ETA_WEIGHT)
    }
}

impl AssignmentPolicy for HungarianAssignment {
    fn select_driver(
        &self,
        ride_entity: Entity,
        pickup_cell: CellIndex,
        idle_drivers: &[(Entity, CellIndex)],
        match_radius: u32,
    ) -> Option<Entity> {
        self.fallback
            .select_driver(ride_entity, pickup_cell, idle_drivers, match_radius)
    }

    fn select_batch(
        &self,
        rides: &[(Entity, CellIndex)],
        idle_drivers: &[(Entity, CellIndex)],
        match_radius: u32,
    ) -> Vec<AssignmentPair> {
        if rides.is_empty() || idle_drivers.is_empty() {
            return Vec::new();
        }

        if rides.len() <= 10 && idle_drivers.len() <= 20 {
            return self.greedy_batch(rides, idle_drivers, match_radius);
        }

        // Kuhn-Munkres requires rows <= columns; use the smaller set as rows.
        let rides_as_rows = rides.len() <= idle_drivers.len();
        let (rows, cols) = if rides_as_rows {
            (rides.len(), idle_drivers.len())
        } else {
            (idle_drivers.len(), rides.len())
        };

        let mut matrix = vec![vec![INFEASIBLE; cols]; rows];
        let mut has_feasible = false;

        for (ride_idx, &(_, ride_cell)) in rides.iter().enumerate() {
            for (driver_idx, &(_, driver_cell)) in idle_drivers.iter().enumerate() {
                if !Self::within_radius(ride_cell, driver_cell, match_radius) {
                    continue;
                }
                let weight = Self::score_to_weight(self.score_cells(ride_cell, driver_cell));
                let (i, j) = if rides_as_rows {
                    (ride_idx, driver_idx)
                } else {
                    (driver_idx, ride_idx)
                };
                matrix[i][j] = weight;
                has_feasible = true;
            }
        }

        // kuhn_munkres panics on an all-infeasible matrix; bail out early.
        if !has_feasible {
            return Vec::new();
        }

        let weights = I64Weights(matrix);
        let (_total, assignments) = kuhn_munkres(&weights);

        let mut results = Vec::new();
        for (row, &col) in assignments.iter().enumerate() {
            if weights.at(row, col) <= INFEASIBLE {
                continue;
            }
            let (ride_idx, driver_idx) = if rides_as_rows { (row, col) } else { (col, row) };
            results.push(AssignmentPair {
                ride_entity: rides[ride_idx].0,
                driver_entity: idle_drivers[driver_idx].0,
            });
        }
        results
    }
}
