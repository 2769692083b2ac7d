// src/strategy/implementations.rs

use std::sync::Arc;

use crate::error::PolicyError;
use crate::simulation::config::{HeuristicConfig, PolicyConfig};
use crate::strategy::order_up_to::OrderUpToPolicy;
use crate::strategy::traits::{OrderContext, OrderPolicy};

// =========================================================================
// 1. Fixed Threshold Policy (Heuristic)
// =========================================================================

/// The store-manager rule of thumb: when stock drops below a reorder point,
/// order a fixed quantity. Ignores forecasts and shelf life, never marks down.
#[derive(Debug, Clone)]
pub struct FixedThresholdPolicy {
    reorder_point: f64,
    order_quantity: f64,
}

impl FixedThresholdPolicy {
    pub const NAME: &'static str = "heuristic";

    pub fn new(reorder_point: f64, order_quantity: f64) -> Self {
        Self {
            reorder_point,
            order_quantity,
        }
    }

    pub fn from_config(config: &HeuristicConfig) -> Self {
        Self::new(config.reorder_point, config.order_quantity)
    }
}

impl OrderPolicy for FixedThresholdPolicy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn calculate_order(&self, context: &OrderContext) -> Result<f64, PolicyError> {
        context.validate()?;
        if context.current_inventory < self.reorder_point {
            Ok(self.order_quantity)
        } else {
            Ok(0.0)
        }
    }
}

// =========================================================================
// 2. Forecast Driven Policy (Order-Up-To + Markdown)
// =========================================================================

/// Sizes orders from the demand forecast with the shelf-life constrained
/// order-up-to rule and discounts near-expiry stock.
#[derive(Debug, Clone)]
pub struct ForecastDrivenPolicy {
    order_up_to: OrderUpToPolicy,
}

impl ForecastDrivenPolicy {
    pub const NAME: &'static str = "model_based";

    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self {
            order_up_to: OrderUpToPolicy::new(config),
        }
    }
}

impl OrderPolicy for ForecastDrivenPolicy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies_markdown(&self) -> bool {
        true
    }

    fn calculate_order(&self, context: &OrderContext) -> Result<f64, PolicyError> {
        self.order_up_to.calculate_order_quantity(context)
    }
}
