// src/strategy/order_up_to.rs

use std::sync::Arc;

use crate::error::PolicyError;
use crate::simulation::config::PolicyConfig;
use crate::strategy::traits::OrderContext;

/// Slack for float noise when checking a rounded order against its limit.
const LIMIT_EPSILON: f64 = 1e-9;

/// Order-up-to replenishment, constrained by shelf life.
///
/// # Formula
/// Target = CoverageDays * Demand + SafetyFactor * Uncertainty
/// Order  = Target - (OnHand - Expiring) - Inbound
///
/// The result is then capped by what can still be sold before expiry and by
/// `max_order_quantity`, floored at `min_order_quantity` when positive, and
/// rounded to whole case packs.
#[derive(Debug, Clone)]
pub struct OrderUpToPolicy {
    config: Arc<PolicyConfig>,
}

impl OrderUpToPolicy {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }

    /// Target stock level for the coverage window.
    pub fn target_stock(&self, context: &OrderContext) -> f64 {
        let c = &*self.config;
        let uncertainty = context
            .forecast_uncertainty
            .unwrap_or(context.forecasted_demand * c.uncertainty_coefficient);

        let expected = match context.demand_horizon_days {
            Some(_) => context.forecasted_demand,
            None => f64::from(c.target_coverage_days) * context.forecasted_demand,
        };
        expected + c.safety_factor * uncertainty
    }

    /// Recommended order quantity. Pure: no state is touched.
    ///
    /// Hard limits (the shelf-life cap and `max_order_quantity`) always win
    /// over the minimum order and over case-pack rounding: a pack that would
    /// cross a limit is rounded down instead of up.
    pub fn calculate_order_quantity(&self, context: &OrderContext) -> Result<f64, PolicyError> {
        context.validate()?;
        let c = &*self.config;

        let available = context.current_inventory - context.expiring_units;
        let raw = (self.target_stock(context) - available - context.inbound_orders).max(0.0);

        let mut limit = c.max_order_quantity;
        if let Some(max_sellable) = context.max_sellable_before_expiry {
            let headroom = (max_sellable - available - context.inbound_orders).max(0.0);
            limit = limit.min(headroom);
        }

        let mut order = raw.min(limit);
        if order > 0.0 {
            order = order.max(c.min_order_quantity).min(limit);
        }

        if c.case_pack_size > 1 && order > 0.0 {
            let pack = f64::from(c.case_pack_size);
            let rounded_up = (order / pack).ceil() * pack;
            order = if rounded_up <= limit + LIMIT_EPSILON {
                rounded_up
            } else {
                ((limit + LIMIT_EPSILON) / pack).floor() * pack
            };
        }

        Ok(order)
    }
}
