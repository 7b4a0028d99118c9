//! Forecast backtesting: replay a zone's history and score the forecaster
//! against the hours it had not yet seen.

use rayon::prelude::*;
use serde::Serialize;

use dispatch_core::error::DispatchError;
use dispatch_core::forecast::{forecast_zone, DemandSample};
use dispatch_core::patterns::HOUR_MS;

/// Hourly buckets the forecaster must have seen before the first evaluation.
const DEFAULT_WARMUP_BUCKETS: usize = 24;

/// Accuracy summary for one (zone, horizon) pair.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub zone: String,
    pub horizon_hours: u64,
    pub evaluations: usize,
    /// Mean absolute error in requests per hour.
    pub mae: f64,
    /// Mean absolute percentage error (actuals floored at 1 request).
    pub mape: f64,
}

/// One hourly bucket: (hour index since epoch, total requests).
fn hourly_buckets(samples: &[DemandSample], zone: &str) -> Vec<(i64, f64)> {
    let mut filtered: Vec<&DemandSample> = samples.iter().filter(|s| s.zone == zone).collect();
    filtered.sort_by_key(|s| s.timestamp_ms);

    let mut buckets: Vec<(i64, f64)> = Vec::new();
    for sample in filtered {
        let hour = sample.timestamp_ms.div_euclid(HOUR_MS);
        match buckets.last_mut() {
            Some((last, total)) if *last == hour => *total += sample.count,
            _ => buckets.push((hour, sample.count)),
        }
    }
    buckets
}

/// Walk the zone's history forward: at each evaluation point, forecast
/// `horizon_hours` ahead using only the samples already observed, then score
/// against the bucket that actually materialized.
pub fn backtest_zone(
    samples: &[DemandSample],
    zone: &str,
    horizon_hours: u64,
) -> Result<BacktestResult, DispatchError> {
    let buckets = hourly_buckets(samples, zone);
    let horizon = horizon_hours as usize;
    // `<=` so at least one evaluation remains past the warmup window.
    if buckets.len() <= DEFAULT_WARMUP_BUCKETS + horizon {
        return Err(DispatchError::InsufficientData {
            zone: zone.to_string(),
            samples: samples.iter().filter(|s| s.zone == zone).count(),
        });
    }

    let mut abs_err_sum = 0.0;
    let mut pct_err_sum = 0.0;
    let mut evaluations = 0usize;

    for i in DEFAULT_WARMUP_BUCKETS..buckets.len() - horizon {
        let now_ms = buckets[i].0 * HOUR_MS;
        let seen: Vec<DemandSample> = samples
            .iter()
            .filter(|s| s.zone == zone && s.timestamp_ms < now_ms)
            .cloned()
            .collect();

        let predicted = forecast_zone(&seen, zone, now_ms, horizon_hours).predicted_demand as f64;
        let actual = buckets[i + horizon].1;

        abs_err_sum += (predicted - actual).abs();
        pct_err_sum += (predicted - actual).abs() / actual.max(1.0);
        evaluations += 1;
    }

    Ok(BacktestResult {
        zone: zone.to_string(),
        horizon_hours,
        evaluations,
        mae: abs_err_sum / evaluations as f64,
        mape: pct_err_sum / evaluations as f64 * 100.0,
    })
}

/// Backtest every (zone, horizon) pair in parallel. Zones without enough
/// history are skipped; that outcome is visible as a missing row, not a panic.
pub fn backtest_sweep(
    samples: &[DemandSample],
    zones: &[String],
    horizons: &[u64],
) -> Vec<BacktestResult> {
    let combos: Vec<(String, u64)> = zones
        .iter()
        .flat_map(|zone| horizons.iter().map(move |&h| (zone.clone(), h)))
        .collect();

    combos
        .par_iter()
        .filter_map(|(zone, horizon)| backtest_zone(samples, zone, *horizon).ok())
        .collect()
}
