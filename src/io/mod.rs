pub mod demand;
pub mod prices;
pub mod reporting;

use crate::error::DataError;

/// Position of `name` in the header row.
fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn require_column(headers: &csv::StringRecord, name: &'static str) -> Result<usize, DataError> {
    column(headers, name).ok_or(DataError::MissingColumn(name))
}

fn field<'r>(record: &'r csv::StringRecord, index: usize, row: usize, name: &str) -> Result<&'r str, DataError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| malformed(row, format!("missing value for '{name}'")))
}

fn malformed(row: usize, message: impl Into<String>) -> DataError {
    DataError::MalformedRow {
        row,
        message: message.into(),
    }
}

/// A finite, non-negative number from a cell.
fn non_negative(raw: &str, row: usize, name: &str) -> Result<f64, DataError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| malformed(row, format!("bad {name} '{raw}'")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(malformed(row, format!("{name} must be a finite number >= 0, got {value}")));
    }
    Ok(value)
}
