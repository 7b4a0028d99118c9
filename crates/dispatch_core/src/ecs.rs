use std::collections::HashMap;

use bevy_ecs::prelude::{Component, Entity, Resource};
use h3o::CellIndex;

use crate::geo::GeoPoint;
use crate::ingest::DriverRecord;
use crate::ride::RideRecord;

/// ECS handle for a ride document. The record is the single source of truth
/// for lifecycle state; `zone` is the demand zone attributed at submission.
#[derive(Debug, Clone, Component)]
pub struct RideHandle {
    pub record: RideRecord,
    pub zone: String,
}

/// ECS handle for a fleet driver.
#[derive(Debug, Clone, Component)]
pub struct DriverAgent {
    pub record: DriverRecord,
    pub current_ride: Option<Entity>,
}

/// H3 cell position used by the spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Position(pub CellIndex);

/// Raw coordinates for display and distance math.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct GeoPosition(pub GeoPoint);

/// Document id -> entity lookup for rides.
#[derive(Debug, Default, Resource)]
pub struct RideDirectory {
    by_id: HashMap<String, Entity>,
}

impl RideDirectory {
    pub fn insert(&mut self, id: &str, entity: Entity) {
        self.by_id.insert(id.to_string(), entity);
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Document id -> entity lookup for drivers.
#[derive(Debug, Default, Resource)]
pub struct DriverDirectory {
    by_id: HashMap<String, Entity>,
}

impl DriverDirectory {
    pub fn insert(&mut self, id: &str, entity: Entity) {
        self.by_id.insert(id.to_string(), entity);
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
