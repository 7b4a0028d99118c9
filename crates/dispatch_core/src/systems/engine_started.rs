use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{DispatchClock, EventKind, ONE_SEC_MS};
use crate::scenario::{BatchAssignConfig, ForecastCycleConfig};

/// Kicks off the recurring cadences: the batch assignment pass and the
/// forecast cycle. Both reschedule themselves afterwards.
pub fn engine_started_system(
    mut clock: ResMut<DispatchClock>,
    batch: Res<BatchAssignConfig>,
    forecast: Res<ForecastCycleConfig>,
) {
    if batch.enabled {
        clock.schedule_in(batch.interval_secs * ONE_SEC_MS, EventKind::BatchAssign, None);
    }
    clock.schedule_in(
        forecast.interval_secs * ONE_SEC_MS,
        EventKind::ForecastCycle,
        None,
    );
}
