// src/forecast/mod.rs

//! Demand forecasting seam.
//!
//! The simulation only sees [`ForecastProvider`]; the model behind it is
//! outside this crate. Baseline forecasters double as providers for demo runs
//! and supply the moving-average fallback.

pub mod baseline;
pub mod bounded;
pub mod metrics;

use std::fmt::Debug;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ForecastError;
use crate::model::series::{DemandPoint, SeriesKey};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_demand: f64,
}

/// One forecast lookup: `horizon_days` days starting at `start`, given the
/// actual demand observed before `start`.
///
/// The request shares the series' points and only records how many of them
/// count as observed, so cloning it never copies history.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub key: SeriesKey,
    pub start: NaiveDate,
    pub horizon_days: u32,
    points: Arc<[DemandPoint]>,
    observed: usize,
}

impl ForecastRequest {
    pub fn new(
        key: SeriesKey,
        start: NaiveDate,
        horizon_days: u32,
        points: Arc<[DemandPoint]>,
        observed: usize,
    ) -> Self {
        let observed = observed.min(points.len());
        Self {
            key,
            start,
            horizon_days,
            points,
            observed,
        }
    }

    /// Demand observed before `start`, oldest first.
    pub fn history(&self) -> &[DemandPoint] {
        &self.points[..self.observed]
    }
}

pub trait ForecastProvider: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn forecast(&self, request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError>;
}

/// Total predicted demand over a forecast.
pub fn total_demand(points: &[ForecastPoint]) -> f64 {
    points.iter().map(|p| p.predicted_demand.max(0.0)).sum()
}
