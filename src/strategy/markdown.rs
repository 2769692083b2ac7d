// src/strategy/markdown.rs

use std::sync::Arc;

use serde::Serialize;

use crate::simulation::config::{MarkdownBucket, PolicyConfig};

/// Elasticity used when the caller has no estimate of its own.
pub const DEFAULT_PRICE_ELASTICITY: f64 = -2.0;

/// A discount recommendation for near-expiry stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Markdown {
    pub discount_percent: f64,
    pub reason: &'static str,
    /// The schedule asked for more than the margin; the discount was clamped
    /// to sell at cost.
    pub at_cost_price: bool,
    pub discount_to_reach_cost: f64,
    /// Cost written off if the stock does not sell at all.
    pub potential_loss_if_not_sold: f64,
    /// Revenue given up by selling all the stock at the discounted price.
    pub loss_from_discount: f64,
    pub current_price: Option<f64>,
    pub cost_per_unit: Option<f64>,
    pub discounted_price: Option<f64>,
}

/// Outcome of a markdown that has run its course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkdownEffectiveness {
    pub units_sold: f64,
    pub units_available: f64,
    pub sell_through_rate: f64,
    pub waste_rate: f64,
    pub revenue: f64,
    pub cost: f64,
    pub margin: f64,
    pub waste_cost: f64,
    pub total_profit: f64,
    pub discount_percent: f64,
}

/// Days-to-expiry driven discounting.
///
/// Buckets are matched soonest-expiry first: the first bucket (ascending by
/// `days_before_expiry`) with `days_before_expiry >= days_until_expiry` wins.
/// An item past the smallest bucket therefore still gets that bucket's
/// discount rather than an escalated one.
#[derive(Debug, Clone)]
pub struct MarkdownPolicy {
    config: Arc<PolicyConfig>,
    buckets: Vec<MarkdownBucket>,
}

impl MarkdownPolicy {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        let mut buckets = config.markdown_buckets.clone();
        buckets.sort_by_key(|b| b.days_before_expiry);
        Self { config, buckets }
    }

    /// Discount percentage (0-100) for stock `days_until_expiry` days from
    /// expiry. `min_threshold` overrides the configured minimum inventory.
    pub fn get_discount_for_expiry(
        &self,
        days_until_expiry: i64,
        current_inventory: f64,
        min_threshold: Option<f64>,
    ) -> f64 {
        let threshold = min_threshold.unwrap_or(self.config.min_inventory_threshold);
        if current_inventory < threshold {
            return 0.0;
        }

        self.buckets
            .iter()
            .find(|b| b.days_before_expiry >= days_until_expiry)
            .map(|b| b.discount_percent)
            .unwrap_or(0.0)
    }

    /// Full recommendation, or `None` when no discount applies.
    ///
    /// With both price and cost known the discount never takes the price
    /// below cost. When the price does not exceed cost there is no margin to
    /// give up and nothing is recommended.
    pub fn recommend_markdown(
        &self,
        days_until_expiry: i64,
        current_inventory: f64,
        current_price: Option<f64>,
        cost_per_unit: Option<f64>,
    ) -> Option<Markdown> {
        let mut discount = self.get_discount_for_expiry(days_until_expiry, current_inventory, None);
        if discount <= 0.0 {
            return None;
        }

        let mut at_cost_price = false;
        let mut discount_to_reach_cost = 0.0;
        let mut potential_loss_if_not_sold = 0.0;
        let mut loss_from_discount = 0.0;
        let mut discounted_price = None;

        if let (Some(price), Some(cost)) = (current_price, cost_per_unit) {
            if price > 0.0 && cost > 0.0 {
                discount_to_reach_cost = (price - cost) / price * 100.0;
                if discount >= discount_to_reach_cost {
                    at_cost_price = true;
                    discount = discount_to_reach_cost;
                }
                if discount <= 0.0 {
                    return None;
                }

                let new_price = price * (1.0 - discount / 100.0);
                potential_loss_if_not_sold = current_inventory * cost;
                loss_from_discount = current_inventory * (price - new_price);
                discounted_price = Some(new_price);
            }
        }

        Some(Markdown {
            discount_percent: discount,
            reason: "Near expiry",
            at_cost_price,
            discount_to_reach_cost,
            potential_loss_if_not_sold,
            loss_from_discount,
            current_price,
            cost_per_unit,
            discounted_price,
        })
    }

    /// Demand after a discount, from a constant price elasticity.
    ///
    /// new = base * (1 + elasticity * -discount/100), floored at 0. A zero
    /// discount returns `base_demand` unchanged.
    pub fn estimate_demand_uplift(base_demand: f64, discount_percent: f64, price_elasticity: f64) -> f64 {
        if discount_percent == 0.0 {
            return base_demand;
        }
        let price_change = -discount_percent / 100.0;
        (base_demand * (1.0 + price_elasticity * price_change)).max(0.0)
    }

    pub fn calculate_markdown_effectiveness(
        units_sold: f64,
        units_available: f64,
        discount_percent: f64,
        unit_cost: f64,
        unit_price: f64,
    ) -> MarkdownEffectiveness {
        let sell_through_rate = if units_available > 0.0 {
            units_sold / units_available
        } else {
            0.0
        };

        let discounted_price = unit_price * (1.0 - discount_percent / 100.0);
        let revenue = units_sold * discounted_price;
        let cost = units_sold * unit_cost;
        let margin = revenue - cost;
        let waste_cost = (units_available - units_sold) * unit_cost;

        MarkdownEffectiveness {
            units_sold,
            units_available,
            sell_through_rate,
            waste_rate: 1.0 - sell_through_rate,
            revenue,
            cost,
            margin,
            waste_cost,
            total_profit: margin - waste_cost,
            discount_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn policy() -> MarkdownPolicy {
        MarkdownPolicy::new(Arc::new(PolicyConfig::default()))
    }

    #[test]
    fn default_schedule() {
        let p = policy();
        assert_eq!(p.get_discount_for_expiry(1, 10.0, None), 50.0);
        assert_eq!(p.get_discount_for_expiry(2, 10.0, None), 35.0);
        assert_eq!(p.get_discount_for_expiry(3, 10.0, None), 20.0);
        assert_eq!(p.get_discount_for_expiry(4, 10.0, None), 0.0);
    }

    #[test]
    fn below_threshold_gets_no_markdown() {
        let p = policy();
        assert_eq!(p.get_discount_for_expiry(1, 4.0, None), 0.0);
        assert_eq!(p.get_discount_for_expiry(1, 4.0, Some(2.0)), 50.0);
    }

    #[test]
    fn expired_item_with_only_a_wide_bucket_keeps_that_discount() {
        // Only a 3-day bucket: a 0-day item is not escalated, it gets 20%.
        let config = PolicyConfig {
            markdown_buckets: vec![MarkdownBucket::new(3, 20.0)],
            ..PolicyConfig::default()
        };
        let p = MarkdownPolicy::new(Arc::new(config));
        assert_eq!(p.get_discount_for_expiry(0, 10.0, None), 20.0);
    }

    #[test]
    fn unsorted_buckets_are_matched_soonest_first() {
        let config = PolicyConfig {
            markdown_buckets: vec![MarkdownBucket::new(5, 10.0), MarkdownBucket::new(1, 40.0)],
            ..PolicyConfig::default()
        };
        let p = MarkdownPolicy::new(Arc::new(config));
        assert_eq!(p.get_discount_for_expiry(1, 10.0, None), 40.0);
        assert_eq!(p.get_discount_for_expiry(2, 10.0, None), 10.0);
    }

    #[test]
    fn recommendation_clamps_to_cost() {
        // 50% asked, margin only 40%.
        let rec = policy().recommend_markdown(1, 10.0, Some(10.0), Some(6.0)).unwrap();
        assert!(rec.at_cost_price);
        assert_relative_eq!(rec.discount_percent, 40.0, epsilon = 1e-9);
        assert_relative_eq!(rec.discounted_price.unwrap(), 6.0, epsilon = 1e-9);
        assert_relative_eq!(rec.potential_loss_if_not_sold, 60.0);
        assert_relative_eq!(rec.loss_from_discount, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn recommendation_within_margin_is_untouched() {
        let rec = policy().recommend_markdown(3, 10.0, Some(10.0), Some(5.0)).unwrap();
        assert!(!rec.at_cost_price);
        assert_relative_eq!(rec.discount_percent, 20.0);
        assert_relative_eq!(rec.discounted_price.unwrap(), 8.0, epsilon = 1e-9);
        assert_relative_eq!(rec.loss_from_discount, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn no_recommendation_without_discount_or_margin() {
        let p = policy();
        assert!(p.recommend_markdown(10, 10.0, Some(10.0), Some(5.0)).is_none());
        assert!(p.recommend_markdown(1, 10.0, Some(5.0), Some(5.0)).is_none());

        let rec = p.recommend_markdown(2, 10.0, None, None).unwrap();
        assert_relative_eq!(rec.discount_percent, 35.0);
        assert_eq!(rec.discounted_price, None);
    }

    #[test]
    fn uplift_from_elasticity() {
        assert_eq!(MarkdownPolicy::estimate_demand_uplift(12.5, 0.0, -2.0), 12.5);
        assert_relative_eq!(MarkdownPolicy::estimate_demand_uplift(10.0, 20.0, -2.0), 14.0);
        // A positive elasticity can push demand below zero: floored.
        assert_eq!(MarkdownPolicy::estimate_demand_uplift(10.0, 80.0, 2.0), 0.0);
    }

    #[test]
    fn effectiveness_accounts_for_waste() {
        let e = MarkdownPolicy::calculate_markdown_effectiveness(8.0, 10.0, 50.0, 5.0, 10.0);
        assert_relative_eq!(e.sell_through_rate, 0.8);
        assert_relative_eq!(e.waste_rate, 0.2, epsilon = 1e-12);
        assert_relative_eq!(e.revenue, 40.0);
        assert_relative_eq!(e.margin, 0.0);
        assert_relative_eq!(e.waste_cost, 10.0);
        assert_relative_eq!(e.total_profit, -10.0);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Schedules whose discount never grows with distance from expiry.
        fn schedule() -> impl Strategy<Value = Vec<MarkdownBucket>> {
            prop::collection::btree_map(0i64..10, 1.0f64..100.0, 1..5).prop_map(|m| {
                let mut discounts: Vec<f64> = m.values().copied().collect();
                discounts.sort_by(|a, b| b.total_cmp(a));
                m.keys()
                    .copied()
                    .zip(discounts)
                    .map(|(days, discount)| MarkdownBucket::new(days, discount))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn discount_never_grows_with_days_to_expiry(
                buckets in schedule(),
                inventory in 0.0f64..50.0,
                threshold in 0.0f64..20.0,
                days in 0i64..12,
            ) {
                let config = PolicyConfig {
                    markdown_buckets: buckets,
                    min_inventory_threshold: threshold,
                    ..PolicyConfig::default()
                };
                let p = MarkdownPolicy::new(Arc::new(config));
                let near = p.get_discount_for_expiry(days, inventory, None);
                let far = p.get_discount_for_expiry(days + 1, inventory, None);
                prop_assert!(far <= near);
                if inventory < threshold {
                    prop_assert_eq!(near, 0.0);
                }
            }

            #[test]
            fn discounted_price_never_below_cost(
                days in 0i64..5,
                price in 0.5f64..100.0,
                cost_share in 0.01f64..1.5,
            ) {
                let cost = price * cost_share;
                if let Some(rec) = policy().recommend_markdown(days, 10.0, Some(price), Some(cost)) {
                    let discounted = rec.discounted_price.unwrap();
                    prop_assert!(discounted + 1e-9 >= cost);
                }
            }

            #[test]
            fn uplift_is_non_negative(base in 0.0f64..1000.0, discount in 0.0f64..=100.0) {
                prop_assert!(MarkdownPolicy::estimate_demand_uplift(base, discount, DEFAULT_PRICE_ELASTICITY) >= 0.0);
            }
        }
    }
}
