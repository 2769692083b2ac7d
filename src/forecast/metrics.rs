// src/forecast/metrics.rs

//! Forecast accuracy metrics.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    pub mae: f64,
    pub rmse: f64,
    /// Percent. `None` when every actual is zero.
    pub mape: Option<f64>,
    /// Percent. `None` when total actual demand is zero.
    pub wape: Option<f64>,
    /// Mean signed error; positive means over-forecasting.
    pub bias: f64,
}

fn pairs<'a>(actual: &'a [f64], predicted: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    actual.iter().copied().zip(predicted.iter().copied())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(pairs(actual, predicted).map(|(a, p)| (a - p).abs()))
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(pairs(actual, predicted).map(|(a, p)| (a - p).powi(2))).sqrt()
}

pub fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let errors: Vec<f64> = pairs(actual, predicted)
        .filter(|(a, _)| *a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    if errors.is_empty() {
        return None;
    }
    Some(mean(errors.into_iter()) * 100.0)
}

pub fn wape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    let total: f64 = actual.iter().take(predicted.len()).sum();
    if total == 0.0 {
        return None;
    }
    let abs_error: f64 = pairs(actual, predicted).map(|(a, p)| (a - p).abs()).sum();
    Some(abs_error / total * 100.0)
}

pub fn bias(actual: &[f64], predicted: &[f64]) -> f64 {
    mean(pairs(actual, predicted).map(|(a, p)| p - a))
}

/// All metrics over paired observations. Extra entries on either side are ignored.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> ForecastAccuracy {
    ForecastAccuracy {
        mae: mae(actual, predicted),
        rmse: rmse(actual, predicted),
        mape: mape(actual, predicted),
        wape: wape(actual, predicted),
        bias: bias(actual, predicted),
    }
}
