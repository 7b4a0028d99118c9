use bevy_ecs::prelude::Resource;

use crate::telemetry::SnapshotConfig;
use crate::zones::ZoneRegistry;

/// Default epoch: 2024-01-01 00:00 UTC, a Monday. Engine time 0 maps here.
const DEFAULT_EPOCH_MS: i64 = 1_704_067_200_000;

/// Max H3 grid distance (cells) for matching a ride to a driver.
/// Resolution-9 cells are ~240m across, so 8 cells covers the whole campus.
#[derive(Debug, Clone, Copy, Resource)]
pub struct MatchRadius(pub u32);

impl Default for MatchRadius {
    fn default() -> Self {
        Self(8)
    }
}

/// Batch assignment: run a global pass every N seconds in addition to the
/// per-submission attempt.
#[derive(Debug, Clone, Copy, Resource)]
pub struct BatchAssignConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for BatchAssignConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
        }
    }
}

/// Forecast cadence and horizon for the operations dashboard.
#[derive(Debug, Clone, Copy, Resource)]
pub struct ForecastCycleConfig {
    pub interval_secs: u64,
    pub horizon_hours: u64,
}

impl Default for ForecastCycleConfig {
    fn default() -> Self {
        Self {
            // The dashboard refreshes every five minutes.
            interval_secs: 300,
            horizon_hours: 1,
        }
    }
}

/// Wall-clock instant corresponding to engine time 0.
#[derive(Debug, Clone, Copy, Resource)]
pub struct EngineEpoch(pub i64);

impl EngineEpoch {
    /// Engine ms -> epoch ms.
    pub fn real_ms(&self, engine_ms: u64) -> i64 {
        self.0.saturating_add(engine_ms as i64)
    }
}

impl Default for EngineEpoch {
    fn default() -> Self {
        Self(DEFAULT_EPOCH_MS)
    }
}

/// Engine end time in milliseconds. When present, the runner stops once the
/// next event would be at or past this timestamp.
#[derive(Debug, Clone, Copy, Resource)]
pub struct EngineEndTimeMs(pub u64);

/// Which driver-selection policy to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentPolicyKind {
    Nearest,
    #[default]
    Hungarian,
}

/// Parameters for building a dispatch world.
#[derive(Debug, Clone)]
pub struct DispatchParams {
    pub epoch_ms: i64,
    pub match_radius: u32,
    pub batch_assign_enabled: bool,
    pub batch_interval_secs: u64,
    pub forecast_interval_secs: u64,
    pub forecast_horizon_hours: u64,
    pub snapshot_config: SnapshotConfig,
    /// Optional end time in ms. If set, the runner stops when the next event
    /// is at or after this time.
    pub end_time_ms: Option<u64>,
    pub assignment_policy: AssignmentPolicyKind,
    /// ETA weight for scored policies. If `None`, the default weight is used.
    pub eta_weight: Option<f64>,
    /// Zone registry override. Defaults to the campus registry.
    pub zones: Option<ZoneRegistry>,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            epoch_ms: DEFAULT_EPOCH_MS,
            match_radius: MatchRadius::default().0,
            batch_assign_enabled: true,
            batch_interval_secs: BatchAssignConfig::default().interval_secs,
            forecast_interval_secs: ForecastCycleConfig::default().interval_secs,
            forecast_horizon_hours: ForecastCycleConfig::default().horizon_hours,
            snapshot_config: SnapshotConfig::default(),
            end_time_ms: None,
            assignment_policy: AssignmentPolicyKind::default(),
            eta_weight: None,
            zones: None,
        }
    }
}

impl DispatchParams {
    pub fn with_epoch_ms(mut self, epoch_ms: i64) -> Self {
        self.epoch_ms = epoch_ms;
        self
    }

    pub fn with_match_radius(mut self, radius: u32) -> Self {
        self.match_radius = radius;
        self
    }

    pub fn with_batch_assign(mut self, enabled: bool, interval_secs: u64) -> Self {
        self.batch_assign_enabled = enabled;
        self.batch_interval_secs = interval_secs;
        self
    }

    pub fn with_forecast_cycle(mut self, interval_secs: u64, horizon_hours: u64) -> Self {
        self.forecast_interval_secs = interval_secs;
        self.forecast_horizon_hours = horizon_hours;
        self
    }

    pub fn with_end_time_ms(mut self, end_ms: u64) -> Self {
        self.end_time_ms = Some(end_ms);
        self
    }

    pub fn with_assignment_policy(mut self, kind: AssignmentPolicyKind) -> Self {
        self.assignment_policy = kind;
        self
    }

    pub fn with_zones(mut self, zones: ZoneRegistry) -> Self {
        self.zones = Some(zones);
        self
    }
}
