//! Telemetry / KPIs: counters, completed-ride records, demand history and
//! the forecast board for the operations dashboard.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource};

use crate::forecast::{DemandSample, ForecastResult};
use crate::ingest::DriverStatus;
use crate::ride::RideStatus;

/// One completed ride, recorded at completion. Timestamps are engine ms; use
/// the helper methods for derived KPIs.
#[derive(Debug, Clone)]
pub struct CompletedRideRecord {
    pub ride_entity: Entity,
    pub driver_entity: Option<Entity>,
    pub ride_id: String,
    pub zone: String,
    pub requested_at: u64,
    pub assigned_at: u64,
    pub started_at: u64,
    pub completed_at: u64,
}

impl CompletedRideRecord {
    /// Time from submission to driver assignment.
    pub fn time_to_assign(&self) -> u64 {
        self.assigned_at.saturating_sub(self.requested_at)
    }

    /// Time from assignment to pickup (ride started).
    pub fn time_to_start(&self) -> u64 {
        self.started_at.saturating_sub(self.assigned_at)
    }

    /// Time from pickup to dropoff.
    pub fn ride_duration(&self) -> u64 {
        self.completed_at.saturating_sub(self.started_at)
    }
}

/// Engine-wide counters and completed-ride log.
#[derive(Debug, Default, Resource)]
pub struct DispatchTelemetry {
    pub completed_rides: Vec<CompletedRideRecord>,
    pub assignments_total: u64,
    pub cancellations_total: u64,
    /// Transitions rejected by the state machine (e.g. cancelling an
    /// in-progress ride, losing an assignment race).
    pub rejected_transitions_total: u64,
    pub validation_failures_total: u64,
    /// Notification deliveries that failed and were discarded.
    pub notification_failures_total: u64,
    /// Driver documents that arrived with the legacy coordinate string.
    pub legacy_coordinate_records_total: u64,
    /// Telemetry samples dropped because a newer sample was already stored.
    pub stale_telemetry_dropped_total: u64,
}

/// Aggregated counts at a point in time.
#[derive(Debug, Clone, Default)]
pub struct DispatchCounts {
    pub rides_pending: usize,
    pub rides_accepted: usize,
    pub rides_in_progress: usize,
    pub rides_completed: usize,
    pub rides_cancelled: usize,
    pub drivers_idle: usize,
    pub drivers_active: usize,
    pub drivers_offline: usize,
}

impl DispatchCounts {
    pub fn add_ride(&mut self, status: RideStatus) {
        match status {
            RideStatus::Pending => self.rides_pending += 1,
            RideStatus::Accepted => self.rides_accepted += 1,
            RideStatus::InProgress => self.rides_in_progress += 1,
            RideStatus::Completed => self.rides_completed += 1,
            RideStatus::Cancelled => self.rides_cancelled += 1,
        }
    }

    pub fn add_driver(&mut self, status: DriverStatus) {
        match status {
            DriverStatus::Idle => self.drivers_idle += 1,
            DriverStatus::Active => self.drivers_active += 1,
            DriverStatus::Offline => self.drivers_offline += 1,
        }
    }
}

/// Snapshot of engine state at a specific timestamp (engine ms).
#[derive(Debug, Clone)]
pub struct DispatchSnapshot {
    pub timestamp_ms: u64,
    pub counts: DispatchCounts,
    pub pending_queue_len: usize,
}

/// Snapshot capture configuration.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SnapshotConfig {
    pub interval_ms: u64,
    pub max_snapshots: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_snapshots: 10_000,
        }
    }
}

/// Rolling snapshot buffer.
#[derive(Debug, Default, Resource)]
pub struct DispatchSnapshots {
    pub snapshots: VecDeque<DispatchSnapshot>,
    pub last_snapshot_at: Option<u64>,
}

/// Append-only demand history consumed by the forecaster.
#[derive(Debug, Default, Resource)]
pub struct DemandHistory {
    samples: Vec<DemandSample>,
}

impl DemandHistory {
    pub fn record(&mut self, sample: DemandSample) {
        self.samples.push(sample);
    }

    pub fn extend(&mut self, samples: impl IntoIterator<Item = DemandSample>) {
        self.samples.extend(samples);
    }

    /// The full history as a read snapshot for a forecast cycle.
    pub fn samples(&self) -> &[DemandSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Latest per-zone forecasts. Each cycle's results fully supersede the
/// previous cycle's; the history log feeds exports and backtests.
#[derive(Debug, Default, Resource)]
pub struct ForecastBoard {
    pub results: Vec<ForecastResult>,
    pub cycle_count: u64,
    pub last_cycle_at: Option<u64>,
    pub history: Vec<(u64, ForecastResult)>,
}

impl ForecastBoard {
    pub fn publish(&mut self, results: Vec<ForecastResult>, now_ms: u64) {
        self.history
            .extend(results.iter().cloned().map(|r| (now_ms, r)));
        self.results = results;
        self.cycle_count += 1;
        self.last_cycle_at = Some(now_ms);
    }

    pub fn for_zone(&self, zone: &str) -> Option<&ForecastResult> {
        self.results.iter().find(|r| r.zone == zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::Trend;

    fn result(zone: &str, predicted: i64) -> ForecastResult {
        ForecastResult {
            zone: zone.to_string(),
            current_demand: 5,
            predicted_demand: predicted,
            confidence: 40,
            trend: Trend::Stable,
            anomaly: false,
        }
    }

    #[test]
    fn forecast_board_supersedes_previous_cycle() {
        let mut board = ForecastBoard::default();
        board.publish(vec![result("Main Gate", 8), result("Lab Block", 3)], 1_000);
        board.publish(vec![result("Main Gate", 12)], 2_000);

        assert_eq!(board.results.len(), 1);
        assert_eq!(board.for_zone("Main Gate").unwrap().predicted_demand, 12);
        assert!(board.for_zone("Lab Block").is_none());
        assert_eq!(board.cycle_count, 2);
        assert_eq!(board.history.len(), 3);
        assert_eq!(board.last_cycle_at, Some(2_000));
    }

    #[test]
    fn completed_ride_kpis() {
        let record = CompletedRideRecord {
            ride_entity: Entity::from_raw(1),
            driver_entity: None,
            ride_id: "ride-1".to_string(),
            zone: "Main Gate".to_string(),
            requested_at: 1_000,
            assigned_at: 3_000,
            started_at: 8_000,
            completed_at: 20_000,
        };
        assert_eq!(record.time_to_assign(), 2_000);
        assert_eq!(record.time_to_start(), 5_000);
        assert_eq!(record.ride_duration(), 12_000);
    }
}
