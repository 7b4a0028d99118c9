mod build;
mod params;

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;

pub use build::{build_dispatch_world, enqueue_ride, push_driver_telemetry, spawn_driver};
pub use params::{
    AssignmentPolicyKind, BatchAssignConfig, DispatchParams, EngineEndTimeMs, EngineEpoch,
    ForecastCycleConfig, MatchRadius,
};

use crate::ingest::LocationSample;
use crate::ride::RideRecord;

/// Normalized ride submissions waiting for the engine, pushed by the glue
/// layer as change-feed deltas arrive.
#[derive(Debug, Default, Resource)]
pub struct SubmittedRides(pub VecDeque<RideRecord>);

/// Driver telemetry samples waiting for the engine, keyed by driver document id.
#[derive(Debug, Default, Resource)]
pub struct InboundTelemetry(pub VecDeque<(String, LocationSample)>);
