//! World construction: inserts every resource the engine systems expect.

use bevy_ecs::prelude::{Entity, World};

use crate::clock::{DispatchClock, EventKind, EventSubject};
use crate::ecs::{DriverAgent, DriverDirectory, GeoPosition, Position, RideDirectory};
use crate::ingest::{CoordinateEncoding, DriverRecord, LocationSample};
use crate::matching::{
    AssignmentPolicy, AssignmentPolicyResource, HungarianAssignment, NearestDriverAssignment,
    DEFAULT_ETA_WEIGHT,
};
use crate::notify::{CommandOutbox, NotifierResource, NullDispatcher};
use crate::ranking::PendingQueue;
use crate::ride::RideRecord;
use crate::routing::{NearestNeighborPlanner, RoutePlannerResource};
use crate::spatial::{cell_for_point, DriverSpatialIndex};
use crate::telemetry::{
    DemandHistory, DispatchSnapshots, DispatchTelemetry, ForecastBoard,
};
use crate::zones::ZoneRegistry;

use super::params::{
    AssignmentPolicyKind, BatchAssignConfig, DispatchParams, EngineEndTimeMs, EngineEpoch,
    ForecastCycleConfig, MatchRadius,
};
use super::{InboundTelemetry, SubmittedRides};

/// Build a dispatch world from parameters.
pub fn build_dispatch_world(params: &DispatchParams) -> World {
    let mut world = World::new();

    world.insert_resource(DispatchClock::default());
    world.insert_resource(DispatchTelemetry::default());
    world.insert_resource(DispatchSnapshots::default());
    world.insert_resource(params.snapshot_config);
    world.insert_resource(PendingQueue::default());
    world.insert_resource(RideDirectory::default());
    world.insert_resource(DriverDirectory::default());
    world.insert_resource(SubmittedRides::default());
    world.insert_resource(InboundTelemetry::default());
    world.insert_resource(DemandHistory::default());
    world.insert_resource(ForecastBoard::default());
    world.insert_resource(DriverSpatialIndex::new());
    world.insert_resource(CommandOutbox::default());
    world.insert_resource(NotifierResource(Box::new(NullDispatcher)));
    world.insert_resource(RoutePlannerResource(Box::new(NearestNeighborPlanner)));

    let eta_weight = params.eta_weight.unwrap_or(DEFAULT_ETA_WEIGHT);
    let policy: Box<dyn AssignmentPolicy> = match params.assignment_policy {
        AssignmentPolicyKind::Nearest => Box::new(NearestDriverAssignment),
        AssignmentPolicyKind::Hungarian => Box::new(HungarianAssignment::new(eta_weight)),
    };
    world.insert_resource(AssignmentPolicyResource::new(policy));

    world.insert_resource(
        params
            .zones
            .clone()
            .unwrap_or_else(ZoneRegistry::campus_default),
    );
    world.insert_resource(MatchRadius(params.match_radius));
    world.insert_resource(BatchAssignConfig {
        enabled: params.batch_assign_enabled,
        interval_secs: params.batch_interval_secs,
    });
    world.insert_resource(ForecastCycleConfig {
        interval_secs: params.forecast_interval_secs,
        horizon_hours: params.forecast_horizon_hours,
    });
    world.insert_resource(EngineEpoch(params.epoch_ms));
    if let Some(end_ms) = params.end_time_ms {
        world.insert_resource(EngineEndTimeMs(end_ms));
    }

    world
}

/// Register a driver in the world: spawns the agent entity with position
/// components (when the record carries a location) and indexes it. Records
/// that arrived with the legacy coordinate string are counted as a
/// data-quality signal for operators.
pub fn spawn_driver(world: &mut World, record: DriverRecord) -> Entity {
    let location = record.location;
    let driver_id = record.id.clone();

    if record.location_encoding == Some(CoordinateEncoding::LegacyString) {
        world
            .resource_mut::<DispatchTelemetry>()
            .legacy_coordinate_records_total += 1;
    }

    let entity = world
        .spawn(DriverAgent {
            record,
            current_ride: None,
        })
        .id();

    if let Some(sample) = location {
        if let Some(cell) = cell_for_point(sample.point) {
            world
                .entity_mut(entity)
                .insert((Position(cell), GeoPosition(sample.point)));
        }
    }

    world
        .resource_mut::<DriverDirectory>()
        .insert(&driver_id, entity);
    entity
}

/// Queue a normalized ride submission and schedule its `RideSubmitted` event.
pub fn enqueue_ride(world: &mut World, record: RideRecord, at_ms: u64) {
    world.resource_mut::<SubmittedRides>().0.push_back(record);
    world
        .resource_mut::<DispatchClock>()
        .schedule_at(at_ms, EventKind::RideSubmitted, None);
}

/// Queue a driver telemetry sample and schedule its `DriverTelemetry` event.
pub fn push_driver_telemetry(
    world: &mut World,
    driver_id: &str,
    sample: LocationSample,
    at_ms: u64,
) {
    world
        .resource_mut::<InboundTelemetry>()
        .0
        .push_back((driver_id.to_string(), sample));
    let subject = world
        .resource::<DriverDirectory>()
        .get(driver_id)
        .map(EventSubject::Driver);
    world
        .resource_mut::<DispatchClock>()
        .schedule_at(at_ms, EventKind::DriverTelemetry, subject);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::ingest::DriverStatus;
    use crate::scenario::DispatchParams;

    fn driver_with_encoding(encoding: Option<CoordinateEncoding>) -> DriverRecord {
        DriverRecord {
            id: "drv-1".to_string(),
            name: "Asha".to_string(),
            vehicle_number: "KA-01".to_string(),
            vehicle_type: "bus".to_string(),
            capacity: 20,
            status: DriverStatus::Idle,
            location: Some(LocationSample {
                point: GeoPoint::new(13.1344, 77.5681),
                timestamp_ms: 0,
                speed_kmh: None,
                heading_deg: None,
            }),
            location_encoding: encoding,
        }
    }

    #[test]
    fn spawned_driver_gets_position_and_directory_entry() {
        let mut world = build_dispatch_world(&DispatchParams::default());
        let entity = spawn_driver(
            &mut world,
            driver_with_encoding(Some(CoordinateEncoding::Structured)),
        );

        assert!(world.entity(entity).contains::<Position>());
        assert!(world.entity(entity).contains::<GeoPosition>());
        assert_eq!(
            world.resource::<DriverDirectory>().get("drv-1"),
            Some(entity)
        );
        assert_eq!(
            world
                .resource::<DispatchTelemetry>()
                .legacy_coordinate_records_total,
            0
        );
    }

    #[test]
    fn legacy_coordinate_records_are_counted() {
        let mut world = build_dispatch_world(&DispatchParams::default());
        spawn_driver(
            &mut world,
            driver_with_encoding(Some(CoordinateEncoding::LegacyString)),
        );
        assert_eq!(
            world
                .resource::<DispatchTelemetry>()
                .legacy_coordinate_records_total,
            1
        );
    }
}

