// src/simulation/config.rs

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::strategy::markdown::DEFAULT_PRICE_ELASTICITY;
use crate::strategy::optimization::safety_factor_for_service_level;

/// One step of the markdown schedule: stock with at most `days_before_expiry`
/// days left is discounted by `discount_percent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkdownBucket {
    pub days_before_expiry: i64,
    pub discount_percent: f64,
}

impl MarkdownBucket {
    pub const fn new(days_before_expiry: i64, discount_percent: f64) -> Self {
        Self {
            days_before_expiry,
            discount_percent,
        }
    }
}

/// Replenishment and markdown parameters, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub target_coverage_days: u32,
    pub min_order_quantity: f64,
    pub max_order_quantity: f64,
    pub case_pack_size: u32,
    /// z-score applied to the forecast uncertainty.
    pub safety_factor: f64,
    /// Forecast uncertainty as a fraction of the forecast, used when the
    /// caller has no better estimate.
    pub uncertainty_coefficient: f64,
    pub markdown_buckets: Vec<MarkdownBucket>,
    /// No markdown below this much stock on hand.
    pub min_inventory_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            target_coverage_days: 7,
            min_order_quantity: 1.0,
            max_order_quantity: 1000.0,
            case_pack_size: 1,
            safety_factor: 1.65,
            uncertainty_coefficient: 0.30,
            markdown_buckets: vec![
                MarkdownBucket::new(3, 20.0),
                MarkdownBucket::new(2, 35.0),
                MarkdownBucket::new(1, 50.0),
            ],
            min_inventory_threshold: 5.0,
        }
    }
}

impl PolicyConfig {
    /// Replaces the safety factor with the z-score of a target service level
    /// (e.g. 0.95 gives about 1.65).
    pub fn with_service_level(mut self, service_level: f64) -> Self {
        self.safety_factor = safety_factor_for_service_level(service_level);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_coverage_days == 0 {
            return Err(ConfigError::invalid("target_coverage_days must be >= 1"));
        }
        if self.case_pack_size == 0 {
            return Err(ConfigError::invalid("case_pack_size must be >= 1"));
        }
        if !(self.min_order_quantity.is_finite() && self.min_order_quantity >= 0.0) {
            return Err(ConfigError::invalid("min_order_quantity must be a finite number >= 0"));
        }
        if !(self.max_order_quantity.is_finite() && self.max_order_quantity > 0.0) {
            return Err(ConfigError::invalid("max_order_quantity must be a finite number > 0"));
        }
        if self.min_order_quantity > self.max_order_quantity {
            return Err(ConfigError::invalid(format!(
                "min_order_quantity ({}) exceeds max_order_quantity ({})",
                self.min_order_quantity, self.max_order_quantity
            )));
        }
        if !(self.safety_factor.is_finite() && self.safety_factor >= 0.0) {
            return Err(ConfigError::invalid("safety_factor must be a finite number >= 0"));
        }
        if !(self.uncertainty_coefficient.is_finite() && self.uncertainty_coefficient >= 0.0) {
            return Err(ConfigError::invalid("uncertainty_coefficient must be a finite number >= 0"));
        }
        if !(self.min_inventory_threshold.is_finite() && self.min_inventory_threshold >= 0.0) {
            return Err(ConfigError::invalid("min_inventory_threshold must be a finite number >= 0"));
        }

        let mut seen = Vec::with_capacity(self.markdown_buckets.len());
        for bucket in &self.markdown_buckets {
            if bucket.days_before_expiry < 0 {
                return Err(ConfigError::invalid(format!(
                    "markdown bucket days_before_expiry must be >= 0, got {}",
                    bucket.days_before_expiry
                )));
            }
            if !(bucket.discount_percent > 0.0 && bucket.discount_percent <= 100.0) {
                return Err(ConfigError::invalid(format!(
                    "markdown bucket discount_percent must be in (0, 100], got {}",
                    bucket.discount_percent
                )));
            }
            if seen.contains(&bucket.days_before_expiry) {
                return Err(ConfigError::invalid(format!(
                    "duplicate markdown bucket for {} days before expiry",
                    bucket.days_before_expiry
                )));
            }
            seen.push(bucket.days_before_expiry);
        }

        let mut sorted = self.markdown_buckets.clone();
        sorted.sort_by_key(|b| b.days_before_expiry);
        if sorted
            .windows(2)
            .any(|pair| pair[1].discount_percent > pair[0].discount_percent)
        {
            return Err(ConfigError::invalid(
                "markdown discounts must not increase further from expiry",
            ));
        }
        Ok(())
    }
}

/// Parameters of the fixed-threshold heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeuristicConfig {
    pub reorder_point: f64,
    pub order_quantity: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            reorder_point: 20.0,
            order_quantity: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Trailing days of each series that are simulated; earlier days are history.
    pub horizon_days: usize,
    pub initial_inventory: f64,
    /// Look-ahead of each day's forecast.
    pub forecast_window_days: u32,
    /// Stock within this many days of expiry is checked for markdown.
    pub markdown_window_days: i64,
    pub price_elasticity: f64,
    /// Shelf life for series without a category.
    pub default_shelf_life_days: i64,
    /// Series with fewer history days are skipped.
    pub min_history_days: usize,
    pub forecast_timeout_ms: u64,
    /// Threads serving forecast lookups.
    pub forecast_workers: usize,
    /// Lookups allowed to wait for a forecast worker before new ones fail fast.
    pub forecast_queue_capacity: usize,
    /// Worker threads used to fan out across series.
    pub workers: usize,
    pub policy: PolicyConfig,
    pub heuristic: HeuristicConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            initial_inventory: 50.0,
            forecast_window_days: 7,
            markdown_window_days: 3,
            price_elasticity: DEFAULT_PRICE_ELASTICITY,
            default_shelf_life_days: 5,
            min_history_days: 7,
            forecast_timeout_ms: 2_000,
            forecast_workers: 2,
            forecast_queue_capacity: 64,
            workers: 1,
            policy: PolicyConfig::default(),
            heuristic: HeuristicConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config; fields left out take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon_days == 0 {
            return Err(ConfigError::invalid("horizon_days must be >= 1"));
        }
        if !(self.initial_inventory.is_finite() && self.initial_inventory >= 0.0) {
            return Err(ConfigError::invalid("initial_inventory must be a finite number >= 0"));
        }
        if self.forecast_window_days == 0 {
            return Err(ConfigError::invalid("forecast_window_days must be >= 1"));
        }
        if self.markdown_window_days < 0 {
            return Err(ConfigError::invalid("markdown_window_days must be >= 0"));
        }
        if !(self.price_elasticity.is_finite() && self.price_elasticity <= 0.0) {
            return Err(ConfigError::invalid("price_elasticity must be a finite number <= 0"));
        }
        if self.default_shelf_life_days < 1 {
            return Err(ConfigError::invalid("default_shelf_life_days must be >= 1"));
        }
        if self.forecast_timeout_ms == 0 {
            return Err(ConfigError::invalid("forecast_timeout_ms must be > 0"));
        }
        if self.forecast_workers == 0 || self.forecast_queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "forecast_workers and forecast_queue_capacity must be >= 1",
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers must be >= 1"));
        }
        if !(self.heuristic.reorder_point.is_finite() && self.heuristic.reorder_point >= 0.0) {
            return Err(ConfigError::invalid("heuristic.reorder_point must be a finite number >= 0"));
        }
        if !(self.heuristic.order_quantity.is_finite() && self.heuristic.order_quantity > 0.0) {
            return Err(ConfigError::invalid("heuristic.order_quantity must be a finite number > 0"));
        }
        self.policy.validate()
    }
}
