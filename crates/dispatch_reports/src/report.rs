//! The daily operations report: the numbers the admin dashboard cards show.

use std::collections::BTreeMap;

use serde::Serialize;

use dispatch_core::forecast::DemandSample;
use dispatch_core::telemetry::{CompletedRideRecord, DispatchCounts};

/// Requests attributed to one zone over the report window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneDemand {
    pub zone: String,
    pub requests: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpsReport {
    pub rides_pending: usize,
    pub rides_accepted: usize,
    pub rides_in_progress: usize,
    pub rides_completed: usize,
    pub rides_cancelled: usize,
    /// Completed over all terminal rides, 0.0 when nothing terminated yet.
    pub completion_rate: f64,
    pub avg_time_to_assign_ms: f64,
    pub median_time_to_assign_ms: f64,
    pub p90_time_to_assign_ms: f64,
    pub avg_ride_duration_ms: f64,
    /// Sorted by request count, busiest zone first.
    pub zone_demand: Vec<ZoneDemand>,
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}

fn percentile(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64 - 1.0) * pct).round() as usize;
    sorted[rank.min(sorted.len() - 1)] as f64
}

/// Build the report from the engine's telemetry, the latest state counts and
/// the demand history window.
pub fn build_ops_report(
    completed: &[CompletedRideRecord],
    counts: &DispatchCounts,
    samples: &[DemandSample],
) -> OpsReport {
    let mut assign_times: Vec<u64> = completed.iter().map(|r| r.time_to_assign()).collect();
    assign_times.sort_unstable();
    let durations: Vec<u64> = completed.iter().map(|r| r.ride_duration()).collect();

    let terminal = counts.rides_completed + counts.rides_cancelled;
    let completion_rate = if terminal == 0 {
        0.0
    } else {
        counts.rides_completed as f64 / terminal as f64
    };

    let mut per_zone: BTreeMap<&str, u64> = BTreeMap::new();
    for sample in samples {
        *per_zone.entry(sample.zone.as_str()).or_default() += sample.count.round() as u64;
    }
    let mut zone_demand: Vec<ZoneDemand> = per_zone
        .into_iter()
        .map(|(zone, requests)| ZoneDemand {
            zone: zone.to_string(),
            requests,
        })
        .collect();
    zone_demand.sort_by(|a, b| b.requests.cmp(&a.requests).then(a.zone.cmp(&b.zone)));

    OpsReport {
        rides_pending: counts.rides_pending,
        rides_accepted: counts.rides_accepted,
        rides_in_progress: counts.rides_in_progress,
        rides_completed: counts.rides_completed,
        rides_cancelled: counts.rides_cancelled,
        completion_rate,
        avg_time_to_assign_ms: mean(&assign_times),
        median_time_to_assign_ms: percentile(&assign_times, 0.5),
        p90_time_to_assign_ms: percentile(&assign_times, 0.9),
        avg_ride_duration_ms: mean(&durations),
        zone_demand,
    }
}
