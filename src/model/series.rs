// src/model/series.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identifies one store-product series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub store_id: String,
    pub product_id: String,
}

impl SeriesKey {
    pub fn new(store_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            product_id: product_id.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.store_id, self.product_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub date: NaiveDate,
    pub demand: f64,
}

/// Daily demand for one store-product, ascending by date with no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    pub key: SeriesKey,
    pub category_id: Option<u32>,
    points: Arc<[DemandPoint]>,
}

impl DemandSeries {
    /// Builds a daily series from raw observations.
    ///
    /// Observations on the same date are summed; dates missing between the
    /// first and last observation become zero-demand days.
    pub fn from_observations(
        key: SeriesKey,
        category_id: Option<u32>,
        observations: impl IntoIterator<Item = DemandPoint>,
    ) -> Self {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for obs in observations {
            *by_date.entry(obs.date).or_insert(0.0) += obs.demand;
        }

        let mut points = Vec::with_capacity(by_date.len());
        if let (Some(&first), Some(&last)) = (by_date.keys().next(), by_date.keys().next_back()) {
            let mut date = first;
            while date <= last {
                points.push(DemandPoint {
                    date,
                    demand: by_date.get(&date).copied().unwrap_or(0.0),
                });
                date += Duration::days(1);
            }
        }

        Self {
            key,
            category_id,
            points: points.into(),
        }
    }

    pub fn points(&self) -> &[DemandPoint] {
        &self.points
    }

    /// The same points as [`points`](Self::points), shared rather than copied.
    pub fn shared_points(&self) -> Arc<[DemandPoint]> {
        Arc::clone(&self.points)
    }

    /// Splits into (history, simulation window): the last `horizon_days` days
    /// are simulated, everything before is history.
    pub fn split_for_simulation(&self, horizon_days: usize) -> (&[DemandPoint], &[DemandPoint]) {
        let points = self.points();
        points.split_at(points.len().saturating_sub(horizon_days))
    }
}
