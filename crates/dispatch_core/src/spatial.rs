//! Spatial indexing: H3-based driver lookups for assignment.
//!
//! Driver telemetry is snapped to H3 resolution-9 cells (~240m, a good fit
//! for a campus) and indexed cell -> entity so candidate queries around a
//! pickup point are O(1) per cell instead of a scan over the fleet.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use bevy_ecs::prelude::{Entity, Resource};
use h3o::{CellIndex, LatLng, Resolution};
use lru::LruCache;

use crate::geo::GeoPoint;

/// Index resolution for driver positions.
pub const DRIVER_CELL_RESOLUTION: Resolution = Resolution::Nine;

/// Snap a point to its H3 cell. `None` for coordinates H3 rejects.
pub fn cell_for_point(point: GeoPoint) -> Option<CellIndex> {
    LatLng::new(point.lat, point.lng)
        .ok()
        .map(|ll| ll.to_cell(DRIVER_CELL_RESOLUTION))
}

/// Centroid of a cell as a [`GeoPoint`].
pub fn point_for_cell(cell: CellIndex) -> GeoPoint {
    let ll: LatLng = cell.into();
    GeoPoint::new(ll.lat(), ll.lng())
}

/// Grid disk cache for candidate queries.
struct GridDiskCache {
    cache: Mutex<LruCache<(CellIndex, u32), Vec<CellIndex>>>,
}

impl GridDiskCache {
    fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(1_000).expect("cache size must be non-zero"),
            )),
        }
    }

    fn get_or_compute(&self, origin: CellIndex, k: u32) -> Vec<CellIndex> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            // Fallback: compute without cache if mutex poisoned
            Err(_) => return origin.grid_disk::<Vec<_>>(k),
        };
        cache
            .get_or_insert((origin, k), || origin.grid_disk::<Vec<_>>(k))
            .clone()
    }
}

static GRID_DISK_CACHE: OnceLock<GridDiskCache> = OnceLock::new();

/// Cells within `k` grid distance of `origin`, cached.
pub fn grid_disk_cached(origin: CellIndex, k: u32) -> Vec<CellIndex> {
    GRID_DISK_CACHE
        .get_or_init(GridDiskCache::new)
        .get_or_compute(origin, k)
}

/// Spatial index over the driver fleet.
///
/// Maintains cell -> driver entity mappings plus the reverse map for
/// incremental updates as telemetry arrives or drivers change status.
#[derive(Debug, Resource, Default)]
pub struct DriverSpatialIndex {
    drivers_by_cell: HashMap<CellIndex, Vec<Entity>>,
    driver_to_cell: HashMap<Entity, CellIndex>,
}

impl DriverSpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity, cell: CellIndex) {
        if let Some(old) = self.driver_to_cell.get(&entity).copied() {
            if old == cell {
                return;
            }
            self.detach(entity, old);
        }
        self.drivers_by_cell.entry(cell).or_default().push(entity);
        self.driver_to_cell.insert(entity, cell);
    }

    pub fn remove(&mut self, entity: Entity) {
        if let Some(cell) = self.driver_to_cell.remove(&entity) {
            self.detach_from_cell_map(entity, cell);
        }
    }

    fn detach(&mut self, entity: Entity, cell: CellIndex) {
        self.driver_to_cell.remove(&entity);
        self.detach_from_cell_map(entity, cell);
    }

    fn detach_from_cell_map(&mut self, entity: Entity, cell: CellIndex) {
        if let Some(entities) = self.drivers_by_cell.get_mut(&cell) {
            entities.retain(|&e| e != entity);
            if entities.is_empty() {
                self.drivers_by_cell.remove(&cell);
            }
        }
    }

    pub fn cell_of(&self, entity: Entity) -> Option<CellIndex> {
        self.driver_to_cell.get(&entity).copied()
    }

    /// All indexed drivers in the given cells, with their cells.
    pub fn drivers_in_cells(&self, cells: &[CellIndex]) -> Vec<(Entity, CellIndex)> {
        let mut result = Vec::new();
        for cell in cells {
            if let Some(entities) = self.drivers_by_cell.get(cell) {
                result.extend(entities.iter().map(|&e| (e, *cell)));
            }
        }
        result
    }

    /// Drivers within `k` grid distance of `origin`.
    pub fn drivers_near(&self, origin: CellIndex, k: u32) -> Vec<(Entity, CellIndex)> {
        self.drivers_in_cells(&grid_disk_cached(origin, k))
    }

    /// Every indexed driver with its cell.
    pub fn all_drivers(&self) -> Vec<(Entity, CellIndex)> {
        self.driver_to_cell.iter().map(|(&e, &c)| (e, c)).collect()
    }

    pub fn len(&self) -> usize {
        self.driver_to_cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.driver_to_cell.is_empty()
    }

    pub fn clear(&mut self) {
        self.drivers_by_cell.clear();
        self.driver_to_cell.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::World;

    fn campus_cell() -> CellIndex {
        cell_for_point(GeoPoint::new(13.1344, 77.5681)).expect("cell")
    }

    #[test]
    fn snap_and_unsnap_round_trips_nearby() {
        let point = GeoPoint::new(13.1344, 77.5681);
        let cell = cell_for_point(point).expect("cell");
        let back = point_for_cell(cell);
        // Resolution 9 cells are ~240m; the centroid stays well within one.
        assert!(crate::geo::haversine_km(point, back) < 0.3);
    }

    #[test]
    fn insert_move_and_remove_keep_index_consistent() {
        let mut world = World::new();
        let driver = world.spawn(()).id();
        let mut index = DriverSpatialIndex::new();

        let cell = campus_cell();
        index.insert(driver, cell);
        assert_eq!(index.cell_of(driver), Some(cell));
        assert_eq!(index.drivers_in_cells(&[cell]).len(), 1);

        let neighbor = cell
            .grid_disk::<Vec<_>>(1)
            .into_iter()
            .find(|c| *c != cell)
            .expect("neighbor");
        index.insert(driver, neighbor);
        assert_eq!(index.cell_of(driver), Some(neighbor));
        assert!(index.drivers_in_cells(&[cell]).is_empty());

        index.remove(driver);
        assert!(index.is_empty());
        assert!(index.drivers_in_cells(&[neighbor]).is_empty());
    }

    #[test]
    fn drivers_near_finds_neighbors_within_k() {
        let mut world = World::new();
        let near = world.spawn(()).id();
        let far = world.spawn(()).id();
        let mut index = DriverSpatialIndex::new();

        let origin = campus_cell();
        let neighbor = origin
            .grid_disk::<Vec<_>>(1)
            .into_iter()
            .find(|c| *c != origin)
            .expect("neighbor");
        // Girls Hostel is ~3km away, far outside a k=1 disk.
        let distant = cell_for_point(GeoPoint::new(13.10646, 77.57173)).expect("cell");

        index.insert(near, neighbor);
        index.insert(far, distant);

        let found = index.drivers_near(origin, 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, near);
    }

    #[test]
    fn reinserting_same_cell_does_not_duplicate() {
        let mut world = World::new();
        let driver = world.spawn(()).id();
        let mut index = DriverSpatialIndex::new();
        let cell = campus_cell();
        index.insert(driver, cell);
        index.insert(driver, cell);
        assert_eq!(index.drivers_in_cells(&[cell]).len(), 1);
    }
}
