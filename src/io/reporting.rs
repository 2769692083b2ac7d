// src/io/reporting.rs

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::DataError;
use crate::simulation::engine::SeriesResult;
use crate::simulation::report::PolicyComparison;

pub const COMPARISON_FILE: &str = "simulation_comparison.csv";
pub const DETAILED_FILE: &str = "simulation_detailed_results.csv";

/// Writes `rows` to a CSV file, one serialized record per line.
///
/// # Arguments
/// * `path` - Destination file, e.g. "results/simulation_comparison.csv".
/// * `rows` - Anything serde can flatten into a record.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    info!(rows = rows.len(), path = %path.display(), "wrote csv");
    Ok(())
}

/// One row per policy.
pub fn write_comparison(dir: &Path, rows: &[PolicyComparison]) -> Result<(), DataError> {
    write_csv(&dir.join(COMPARISON_FILE), rows)
}

/// One row per simulated (series, policy).
pub fn write_detailed_results(dir: &Path, results: &[SeriesResult]) -> Result<(), DataError> {
    write_csv(&dir.join(DETAILED_FILE), results)
}
