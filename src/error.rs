// src/error.rs

//! Error model.
//!
//! Configuration and data-shape errors are fatal and abort a run. Inventory,
//! policy and forecast errors are per-series: the engine converts them into a
//! [`SkipReason`] and the batch carries on.

use thiserror::Error;

/// Failures raised by the expiry-cohort tracker.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InventoryError {
    /// A non-positive (or non-finite) quantity was passed to an inventory mutation.
    #[error("invalid quantity: {0} (must be > 0)")]
    InvalidQuantity(f64),

    /// `consume` asked for more than the tracker holds.
    #[error("insufficient inventory: requested {requested:.3}, available {available:.3}")]
    InsufficientInventory { requested: f64, available: f64 },
}

/// Failures raised by order and markdown policies.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    /// A negative or non-finite demand/inventory figure reached a policy function.
    #[error("invalid input: {field} = {value}")]
    InvalidInput { field: &'static str, value: f64 },
}

impl PolicyError {
    pub fn invalid(field: &'static str, value: f64) -> Self {
        Self::InvalidInput { field, value }
    }
}

/// Forecast lookup failures. Both variants are recoverable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForecastError {
    #[error("forecast unavailable: {0}")]
    Unavailable(String),

    #[error("forecast timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

impl ForecastError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Invalid configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Malformed or unreadable demand or price data. Always fatal.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: {message}")]
    MalformedRow { row: usize, message: String },

    #[error("invalid synthetic demand parameters: {0}")]
    Synthetic(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single store-product series was left out of the results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SkipReason {
    #[error("insufficient history: {available} days (need {required})")]
    InsufficientHistory { available: usize, required: usize },

    #[error("no days to simulate")]
    EmptyHorizon,

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("no forecast and no history to fall back on")]
    NoForecast,
}
