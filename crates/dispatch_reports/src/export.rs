//! Report export to CSV and JSON.

use std::error::Error;
use std::fs::File;
use std::path::Path;

use crate::backtest::BacktestResult;
use crate::report::OpsReport;

fn ensure_not_empty<T>(rows: &[T]) -> Result<(), Box<dyn Error>> {
    if rows.is_empty() {
        return Err("nothing to export".into());
    }
    Ok(())
}

/// Export backtest results to CSV, one row per (zone, horizon).
pub fn export_backtest_csv(
    results: &[BacktestResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn Error>> {
    ensure_not_empty(results)?;
    let mut writer = csv::Writer::from_path(path)?;
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export backtest results as a JSON array.
pub fn export_backtest_json(
    results: &[BacktestResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}

/// Export the full operations report as JSON.
pub fn export_ops_report_json(
    report: &OpsReport,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

/// Export the report's per-zone demand table to CSV.
pub fn export_zone_demand_csv(
    report: &OpsReport,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn Error>> {
    ensure_not_empty(&report.zone_demand)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in &report.zone_demand {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build_ops_report;
    use dispatch_core::telemetry::DispatchCounts;
    use tempfile::NamedTempFile;

    fn results() -> Vec<BacktestResult> {
        vec![BacktestResult {
            zone: "Main Gate".to_string(),
            horizon_hours: 1,
            evaluations: 100,
            mae: 2.5,
            mape: 31.0,
        }]
    }

    #[test]
    fn backtest_csv_contains_header_and_row() {
        let file = NamedTempFile::new().unwrap();
        export_backtest_csv(&results(), file.path()).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("zone,horizon_hours,evaluations,mae,mape"));
        assert!(contents.contains("Main Gate,1,100,2.5,31.0"));
    }

    #[test]
    fn backtest_csv_refuses_empty_input() {
        let file = NamedTempFile::new().unwrap();
        assert!(export_backtest_csv(&[], file.path()).is_err());
    }

    #[test]
    fn backtest_json_round_trips() {
        let file = NamedTempFile::new().unwrap();
        export_backtest_json(&results(), file.path()).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("\"zone\": \"Main Gate\""));
    }

    #[test]
    fn ops_report_json_exports() {
        let report = build_ops_report(&[], &DispatchCounts::default(), &[]);
        let file = NamedTempFile::new().unwrap();
        export_ops_report_json(&report, file.path()).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("completion_rate"));
    }
}
