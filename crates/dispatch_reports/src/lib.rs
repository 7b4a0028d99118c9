//! Operations reporting and forecast backtesting for the campus dispatch
//! engine.
//!
//! Builds the daily report the admin portal shows (ride totals, completion
//! rate, wait-time KPIs, per-zone demand) and evaluates forecast accuracy by
//! replaying a zone's history hour by hour. Backtests across zones and
//! horizons run in parallel.
//!
//! # Quick Start
//!
//! ```no_run
//! use dispatch_core::patterns::synthetic_demand_history;
//! use dispatch_reports::{backtest_sweep, export_backtest_csv};
//!
//! let zones = vec!["Main Gate".to_string(), "Lab Block".to_string()];
//! let history = synthetic_demand_history(&zones, 14, 1_704_067_200_000, 42);
//! let results = backtest_sweep(&history, &zones, &[1, 24]);
//! export_backtest_csv(&results, "backtests.csv").unwrap();
//! ```

pub mod backtest;
pub mod export;
pub mod report;

pub use backtest::{backtest_sweep, backtest_zone, BacktestResult};
pub use export::{
    export_backtest_csv, export_backtest_json, export_ops_report_json, export_zone_demand_csv,
};
pub use report::{build_ops_report, OpsReport, ZoneDemand};
