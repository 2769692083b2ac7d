// src/forecast/baseline.rs

//! Naive baseline forecasters.

use chrono::Duration;

use crate::error::ForecastError;
use crate::forecast::{ForecastPoint, ForecastProvider, ForecastRequest};
use crate::model::series::DemandPoint;

/// Mean of the last `window` observations, or `None` with no history.
pub fn trailing_mean(history: &[DemandPoint], window: usize) -> Option<f64> {
    if history.is_empty() || window == 0 {
        return None;
    }
    let tail = &history[history.len().saturating_sub(window)..];
    Some(tail.iter().map(|p| p.demand).sum::<f64>() / tail.len() as f64)
}

fn flat_forecast(request: &ForecastRequest, values: impl Fn(usize) -> f64) -> Vec<ForecastPoint> {
    (0..request.horizon_days as usize)
        .map(|i| ForecastPoint {
            date: request.start + Duration::days(i as i64),
            predicted_demand: values(i),
        })
        .collect()
}

fn no_history(request: &ForecastRequest) -> ForecastError {
    ForecastError::unavailable(format!("no demand history for {}", request.key))
}

/// Repeats the trailing mean of the last `window` days.
#[derive(Debug, Clone)]
pub struct MovingAverageForecaster {
    window: usize,
    name: String,
}

impl MovingAverageForecaster {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            name: format!("moving_average_{window}"),
        }
    }
}

impl Default for MovingAverageForecaster {
    fn default() -> Self {
        Self::new(7)
    }
}

impl ForecastProvider for MovingAverageForecaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn forecast(&self, request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError> {
        let mean = trailing_mean(request.history(), self.window).ok_or_else(|| no_history(request))?;
        Ok(flat_forecast(request, |_| mean))
    }
}

/// Replays the last full season (e.g. same weekday last week).
#[derive(Debug, Clone)]
pub struct SeasonalNaiveForecaster {
    season_length: usize,
    name: String,
}

impl SeasonalNaiveForecaster {
    pub fn new(season_length: usize) -> Self {
        Self {
            season_length: season_length.max(1),
            name: format!("seasonal_naive_{season_length}"),
        }
    }
}

impl ForecastProvider for SeasonalNaiveForecaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn forecast(&self, request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError> {
        let history = request.history();
        if history.is_empty() {
            return Err(no_history(request));
        }
        let season = &history[history.len().saturating_sub(self.season_length)..];
        Ok(flat_forecast(request, |i| season[i % season.len()].demand))
    }
}

/// Repeats the last observed value.
#[derive(Debug, Clone, Default)]
pub struct LastValueForecaster;

impl ForecastProvider for LastValueForecaster {
    fn name(&self) -> &str {
        "last_value"
    }

    fn forecast(&self, request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError> {
        let last = request.history().last().ok_or_else(|| no_history(request))?.demand;
        Ok(flat_forecast(request, |_| last))
    }
}
