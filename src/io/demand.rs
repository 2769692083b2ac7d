// src/io/demand.rs

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::error::DataError;
use crate::io::{column, field, malformed, non_negative, require_column};
use crate::model::series::{DemandPoint, DemandSeries, SeriesKey};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column positions in the header row.
struct Columns {
    store_id: usize,
    product_id: usize,
    date: usize,
    demand: usize,
    category_id: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, DataError> {
        Ok(Self {
            store_id: require_column(headers, "store_id")?,
            product_id: require_column(headers, "product_id")?,
            date: require_column(headers, "date")?,
            demand: require_column(headers, "demand")?,
            category_id: column(headers, "category_id"),
        })
    }
}

/// Reads `store_id,product_id,date,demand[,category_id]` rows into one daily
/// series per store-product pair, sorted by key.
pub fn read_demand<R: Read>(reader: R) -> Result<Vec<DemandSeries>, DataError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns = Columns::from_headers(rdr.headers()?)?;

    let mut grouped: BTreeMap<SeriesKey, (Option<u32>, Vec<DemandPoint>)> = BTreeMap::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let row = i + 2;

        let store_id = field(&record, columns.store_id, row, "store_id")?;
        let product_id = field(&record, columns.product_id, row, "product_id")?;
        if store_id.is_empty() || product_id.is_empty() {
            return Err(malformed(row, "empty store_id or product_id"));
        }

        let raw_date = field(&record, columns.date, row, "date")?;
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|e| malformed(row, format!("bad date '{raw_date}': {e}")))?;

        let demand = non_negative(field(&record, columns.demand, row, "demand")?, row, "demand")?;

        let category_id = match columns.category_id.and_then(|idx| record.get(idx)).map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|_| malformed(row, format!("bad category_id '{raw}'")))?,
            ),
        };

        let entry = grouped
            .entry(SeriesKey::new(store_id, product_id))
            .or_insert_with(|| (None, Vec::new()));
        if entry.0.is_none() {
            entry.0 = category_id;
        }
        entry.1.push(DemandPoint { date, demand });
    }

    Ok(grouped
        .into_iter()
        .map(|(key, (category_id, points))| DemandSeries::from_observations(key, category_id, points))
        .collect())
}

pub fn load_demand_csv(path: impl AsRef<Path>) -> Result<Vec<DemandSeries>, DataError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let series = read_demand(file)?;
    info!(path = %path.display(), series = series.len(), "loaded demand history");
    Ok(series)
}

// ---------------------------------------------------------------------------
// Synthetic demand
// ---------------------------------------------------------------------------

/// Every day has the same demand. Useful for checking steady-state behavior.
pub fn generate_constant_demand(days: usize, value: f64) -> Vec<f64> {
    vec![value; days]
}

/// Daily demand drawn from a Normal distribution, rounded and clamped at zero.
pub fn generate_normal_demand<R: Rng>(rng: &mut R, days: usize, mean: f64, std_dev: f64) -> Result<Vec<f64>, DataError> {
    let normal = Normal::new(mean, std_dev).map_err(|e| DataError::Synthetic(e.to_string()))?;
    Ok((0..days).map(|_| normal.sample(rng).round().max(0.0)).collect())
}

/// Weekly cycle around `base` with Normal noise on top.
///
/// Weekends (days 5 and 6 of each week) run `amplitude` above base, the
/// rest of the week slightly below.
pub fn generate_weekly_seasonal_demand<R: Rng>(
    rng: &mut R,
    days: usize,
    base: f64,
    amplitude: f64,
    noise: f64,
) -> Result<Vec<f64>, DataError> {
    let normal = Normal::new(0.0, noise).map_err(|e| DataError::Synthetic(e.to_string()))?;
    Ok((0..days)
        .map(|day| {
            let level = if day % 7 >= 5 {
                base + amplitude
            } else {
                base - amplitude * 0.4
            };
            (level + normal.sample(rng)).round().max(0.0)
        })
        .collect())
}

/// Categories cycled through by the synthetic generator.
const SYNTHETIC_CATEGORIES: [u32; 5] = [28, 11, 5, 4, 30];

/// `count` deterministic series of `days` days starting at `start`.
///
/// Series `i` is constant when `i % 3 == 0`, Normal when `i % 3 == 1`,
/// weekly-seasonal otherwise.
pub fn synthetic_series(count: usize, days: usize, start: NaiveDate, seed: u64) -> Result<Vec<DemandSeries>, DataError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(count);

    for i in 0..count {
        let mean = rng.gen_range(5.0..30.0_f64).round();
        let values = match i % 3 {
            0 => generate_constant_demand(days, mean),
            1 => generate_normal_demand(&mut rng, days, mean, mean * 0.3)?,
            _ => generate_weekly_seasonal_demand(&mut rng, days, mean, mean * 0.5, mean * 0.15)?,
        };

        let key = SeriesKey::new(format!("store_{}", i % 4 + 1), format!("product_{}", i + 1));
        let category = SYNTHETIC_CATEGORIES[i % SYNTHETIC_CATEGORIES.len()];
        let points = values.into_iter().enumerate().map(|(day, demand)| DemandPoint {
            date: start + Duration::days(day as i64),
            demand,
        });
        out.push(DemandSeries::from_observations(key, Some(category), points));
    }

    info!(count, days, seed, "generated synthetic demand");
    Ok(out)
}
