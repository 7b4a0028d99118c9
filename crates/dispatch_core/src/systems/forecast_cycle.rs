use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{DispatchClock, EventKind, ONE_SEC_MS};
use crate::forecast::forecast_zones;
use crate::scenario::{EngineEpoch, ForecastCycleConfig};
use crate::telemetry::{DemandHistory, ForecastBoard};
use crate::zones::ZoneRegistry;

/// Stateless forecast recomputation on a fixed cadence. Reads a snapshot of
/// the demand history and publishes a fresh result set that fully supersedes
/// the previous cycle, then reschedules itself.
pub fn forecast_cycle_system(
    mut clock: ResMut<DispatchClock>,
    config: Res<ForecastCycleConfig>,
    epoch: Res<EngineEpoch>,
    registry: Res<ZoneRegistry>,
    history: Res<DemandHistory>,
    mut board: ResMut<ForecastBoard>,
) {
    let now = clock.now();
    let results = forecast_zones(
        history.samples(),
        &registry.names(),
        epoch.real_ms(now),
        config.horizon_hours,
    );
    board.publish(results, now);

    clock.schedule_in(
        config.interval_secs * ONE_SEC_MS,
        EventKind::ForecastCycle,
        None,
    );
}
