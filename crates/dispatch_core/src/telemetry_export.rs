use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Int64Array, StringArray, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::forecast::Trend;
use crate::telemetry::{DispatchSnapshots, DispatchTelemetry, ForecastBoard};

pub fn write_completed_rides_parquet<P: AsRef<Path>>(
    path: P,
    telemetry: &DispatchTelemetry,
) -> Result<(), Box<dyn Error>> {
    let rides = &telemetry.completed_rides;
    let mut ride_ids = Vec::with_capacity(rides.len());
    let mut zones = Vec::with_capacity(rides.len());
    let mut ride_entities = Vec::with_capacity(rides.len());
    let mut driver_entities: Vec<Option<u64>> = Vec::with_capacity(rides.len());
    let mut requested_at = Vec::with_capacity(rides.len());
    let mut assigned_at = Vec::with_capacity(rides.len());
    let mut started_at = Vec::with_capacity(rides.len());
    let mut completed_at = Vec::with_capacity(rides.len());

    for record in rides {
        ride_ids.push(record.ride_id.clone());
        zones.push(record.zone.clone());
        ride_entities.push(record.ride_entity.to_bits());
        driver_entities.push(record.driver_entity.map(|e| e.to_bits()));
        requested_at.push(record.requested_at);
        assigned_at.push(record.assigned_at);
        started_at.push(record.started_at);
        completed_at.push(record.completed_at);
    }

    let schema = Schema::new(vec![
        Field::new("ride_id", DataType::Utf8, false),
        Field::new("zone", DataType::Utf8, false),
        Field::new("ride_entity", DataType::UInt64, false),
        Field::new("driver_entity", DataType::UInt64, true),
        Field::new("requested_at", DataType::UInt64, false),
        Field::new("assigned_at", DataType::UInt64, false),
        Field::new("started_at", DataType::UInt64, false),
        Field::new("completed_at", DataType::UInt64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ride_ids)),
        Arc::new(StringArray::from(zones)),
        Arc::new(UInt64Array::from(ride_entities)),
        Arc::new(UInt64Array::from(driver_entities)),
        Arc::new(UInt64Array::from(requested_at)),
        Arc::new(UInt64Array::from(assigned_at)),
        Arc::new(UInt64Array::from(started_at)),
        Arc::new(UInt64Array::from(completed_at)),
    ];

    write_record_batch(path, schema, arrays)
}

pub fn write_snapshot_counts_parquet<P: AsRef<Path>>(
    path: P,
    snapshots: &DispatchSnapshots,
) -> Result<(), Box<dyn Error>> {
    let n = snapshots.snapshots.len();
    let mut timestamp_ms = Vec::with_capacity(n);
    let mut rides_pending = Vec::with_capacity(n);
    let mut rides_accepted = Vec::with_capacity(n);
    let mut rides_in_progress = Vec::with_capacity(n);
    let mut rides_completed = Vec::with_capacity(n);
    let mut rides_cancelled = Vec::with_capacity(n);
    let mut drivers_idle = Vec::with_capacity(n);
    let mut drivers_active = Vec::with_capacity(n);
    let mut drivers_offline = Vec::with_capacity(n);
    let mut pending_queue_len = Vec::with_capacity(n);

    for snapshot in &snapshots.snapshots {
        timestamp_ms.push(snapshot.timestamp_ms);
        rides_pending.push(snapshot.counts.rides_pending as u64);
        rides_accepted.push(snapshot.counts.rides_accepted as u64);
        rides_in_progress.push(snapshot.counts.rides_in_progress as u64);
        rides_completed.push(snapshot.counts.rides_completed as u64);
        rides_cancelled.push(snapshot.counts.rides_cancelled as u64);
        drivers_idle.push(snapshot.counts.drivers_idle as u64);
        drivers_active.push(snapshot.counts.drivers_active as u64);
        drivers_offline.push(snapshot.counts.drivers_offline as u64);
        pending_queue_len.push(snapshot.pending_queue_len as u64);
    }

    let schema = Schema::new(vec![
        Field::new("timestamp_ms", DataType::UInt64, false),
        Field::new("rides_pending", DataType::UInt64, false),
        Field::new("rides_accepted", DataType::UInt64, false),
        Field::new("rides_in_progress", DataType::UInt64, false),
        Field::new("rides_completed", DataType::UInt64, false),
        Field::new("rides_cancelled", DataType::UInt64, false),
        Field::new("drivers_idle", DataType::UInt64, false),
        Field::new("drivers_active", DataType::UInt64, false),
        Field::new("drivers_offline", DataType::UInt64, false),
        Field::new("pending_queue_len", DataType::UInt64, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(timestamp_ms)),
        Arc::new(UInt64Array::from(rides_pending)),
        Arc::new(UInt64Array::from(rides_accepted)),
        Arc::new(UInt64Array::from(rides_in_progress)),
        Arc::new(UInt64Array::from(rides_completed)),
        Arc::new(UInt64Array::from(rides_cancelled)),
        Arc::new(UInt64Array::from(drivers_idle)),
        Arc::new(UInt64Array::from(drivers_active)),
        Arc::new(UInt64Array::from(drivers_offline)),
        Arc::new(UInt64Array::from(pending_queue_len)),
    ];

    write_record_batch(path, schema, arrays)
}

/// Export the forecast history log (one row per zone per cycle).
pub fn write_forecast_history_parquet<P: AsRef<Path>>(
    path: P,
    board: &ForecastBoard,
) -> Result<(), Box<dyn Error>> {
    let n = board.history.len();
    let mut captured_at = Vec::with_capacity(n);
    let mut zones = Vec::with_capacity(n);
    let mut current_demand = Vec::with_capacity(n);
    let mut predicted_demand = Vec::with_capacity(n);
    let mut confidence = Vec::with_capacity(n);
    let mut trend = Vec::with_capacity(n);
    let mut anomaly = Vec::with_capacity(n);

    for (at, result) in &board.history {
        captured_at.push(*at);
        zones.push(result.zone.clone());
        current_demand.push(result.current_demand);
        predicted_demand.push(result.predicted_demand);
        confidence.push(result.confidence as u64);
        trend.push(trend_code(result.trend));
        anomaly.push(result.anomaly);
    }

    let schema = Schema::new(vec![
        Field::new("captured_at", DataType::UInt64, false),
        Field::new("zone", DataType::Utf8, false),
        Field::new("current_demand", DataType::Int64, false),
        Field::new("predicted_demand", DataType::Int64, false),
        Field::new("confidence", DataType::UInt64, false),
        Field::new("trend", DataType::UInt8, false),
        Field::new("anomaly", DataType::Boolean, false),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(captured_at)),
        Arc::new(StringArray::from(zones)),
        Arc::new(Int64Array::from(current_demand)),
        Arc::new(Int64Array::from(predicted_demand)),
        Arc::new(UInt64Array::from(confidence)),
        Arc::new(UInt8Array::from(trend)),
        Arc::new(BooleanArray::from(anomaly)),
    ];

    write_record_batch(path, schema, arrays)
}

fn write_record_batch<P: AsRef<Path>>(
    path: P,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> Result<(), Box<dyn Error>> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn trend_code(trend: Trend) -> u8 {
    match trend {
        Trend::Stable => 0,
        Trend::Increasing => 1,
        Trend::Decreasing => 2,
    }
}
