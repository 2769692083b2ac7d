// src/strategy/traits.rs

use std::fmt::Debug;

use crate::error::PolicyError;

/// Everything a policy may look at when sizing one replenishment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderContext {
    /// Expected demand. Per day, unless `demand_horizon_days` is set, in which
    /// case it is the total over that many days.
    pub forecasted_demand: f64,
    /// On-hand stock.
    pub current_inventory: f64,
    /// Confirmed deliveries arriving within the coverage window.
    pub inbound_orders: f64,
    /// On-hand units that expire before they can count as useful stock.
    pub expiring_units: f64,
    /// Standard deviation of the forecast error, when known.
    pub forecast_uncertainty: Option<f64>,
    /// Shelf-life ceiling on stock after the order arrives.
    pub max_sellable_before_expiry: Option<f64>,
    pub demand_horizon_days: Option<u32>,
}

impl OrderContext {
    /// Rejects negative or non-finite figures.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let required = [
            ("forecasted_demand", self.forecasted_demand),
            ("current_inventory", self.current_inventory),
            ("inbound_orders", self.inbound_orders),
            ("expiring_units", self.expiring_units),
        ];
        let optional = [
            ("forecast_uncertainty", self.forecast_uncertainty),
            ("max_sellable_before_expiry", self.max_sellable_before_expiry),
        ];

        let values = required
            .into_iter()
            .chain(optional.into_iter().filter_map(|(name, v)| v.map(|v| (name, v))));
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::invalid(field, value));
            }
        }
        Ok(())
    }
}

/// A replenishment policy variant the simulation can evaluate.
///
/// Policies are shared read-only across series, hence `Send + Sync` and `&self`.
pub trait OrderPolicy: Debug + Send + Sync {
    /// Name used to key results, e.g. `"heuristic"`.
    fn name(&self) -> &str;

    /// Whether near-expiry stock is discounted while this policy runs.
    fn applies_markdown(&self) -> bool {
        false
    }

    /// How much to order today. Never negative.
    fn calculate_order(&self, context: &OrderContext) -> Result<f64, PolicyError>;
}
