// src/simulation/economics.rs

use std::collections::HashMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::model::series::SeriesKey;
use crate::strategy::optimization::newsvendor_service_level;

/// Price and cost of one unit. Only used for markdown revenue and loss
/// accounting, never for order sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitEconomics {
    pub unit_price: f64,
    pub unit_cost: f64,
}

impl Default for UnitEconomics {
    fn default() -> Self {
        Self {
            unit_price: 10.0,
            unit_cost: 5.0,
        }
    }
}

pub trait UnitEconomicsProvider: Debug + Send + Sync {
    fn unit_economics(&self, key: &SeriesKey) -> UnitEconomics;
}

/// Per-product overrides on top of a global default.
#[derive(Debug, Clone, Default)]
pub struct TableEconomics {
    default: UnitEconomics,
    by_product: HashMap<String, UnitEconomics>,
}

impl TableEconomics {
    pub fn new(default: UnitEconomics) -> Self {
        Self {
            default,
            by_product: HashMap::new(),
        }
    }

    pub fn with_product(mut self, product_id: impl Into<String>, economics: UnitEconomics) -> Self {
        self.by_product.insert(product_id.into(), economics);
        self
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.by_product.contains_key(product_id)
    }

    pub fn product_count(&self) -> usize {
        self.by_product.len()
    }

    /// Newsvendor service level averaged over the listed products, or the
    /// default's when none are listed. One level drives every series.
    pub fn newsvendor_service_level(&self) -> f64 {
        if self.by_product.is_empty() {
            return newsvendor_service_level(self.default.unit_price, self.default.unit_cost);
        }
        let total: f64 = self
            .by_product
            .values()
            .map(|e| newsvendor_service_level(e.unit_price, e.unit_cost))
            .sum();
        total / self.by_product.len() as f64
    }
}

impl UnitEconomicsProvider for TableEconomics {
    fn unit_economics(&self, key: &SeriesKey) -> UnitEconomics {
        self.by_product
            .get(&key.product_id)
            .copied()
            .unwrap_or(self.default)
    }
}
