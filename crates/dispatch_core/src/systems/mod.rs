pub mod assignment;
pub mod driver_telemetry;
pub mod engine_started;
pub mod forecast_cycle;
pub mod ride_cancel;
pub mod ride_completed;
pub mod ride_started;
pub mod ride_submitted;
pub mod spatial_index;
pub mod telemetry_snapshot;
