// src/model/cohort.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::InventoryError;

/// Quantities below this are treated as zero when draining cohorts.
const QUANTITY_EPSILON: f64 = 1e-9;

/// A batch of stock sharing a single expiry date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiryCohort {
    pub expiry_date: NaiveDate,
    pub quantity: f64,
}

impl ExpiryCohort {
    /// Whole days left before expiry as seen from `today`, clamped at 0.
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days().max(0)
    }
}

/// Perishable stock for one store-product, held as dated cohorts.
///
/// Days-to-expiry is never stored: it is derived from `current_date` each time
/// it is asked for, so moving the clock with [`advance_to`](Self::advance_to)
/// is all it takes to age every cohort.
#[derive(Debug, Clone)]
pub struct ExpiryCohortTracker {
    current_date: NaiveDate,
    cohorts: Vec<ExpiryCohort>,
}

impl ExpiryCohortTracker {
    pub fn new(current_date: NaiveDate) -> Self {
        Self {
            current_date,
            cohorts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Receives stock (initial load or a fulfilled order) as a new cohort.
    pub fn add_inventory(&mut self, quantity: f64, expiry_date: NaiveDate) -> Result<(), InventoryError> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        self.cohorts.push(ExpiryCohort {
            expiry_date,
            quantity,
        });
        Ok(())
    }

    /// Moves the clock. Every cohort's days-to-expiry follows from the new date.
    pub fn advance_to(&mut self, date: NaiveDate) {
        self.current_date = date;
    }

    pub fn days_until_expiry(&self, cohort: &ExpiryCohort) -> i64 {
        cohort.days_until_expiry(self.current_date)
    }

    /// Units whose days-to-expiry falls in `[0, days_ahead]`.
    pub fn expiring_within(&self, days_ahead: i64) -> f64 {
        self.cohorts
            .iter()
            .filter(|c| (0..=days_ahead).contains(&self.days_until_expiry(c)))
            .map(|c| c.quantity)
            .sum()
    }

    /// Smallest days-to-expiry among non-empty cohorts expiring within `days_ahead`.
    pub fn nearest_expiry_within(&self, days_ahead: i64) -> Option<i64> {
        self.cohorts
            .iter()
            .filter(|c| c.quantity > 0.0)
            .map(|c| self.days_until_expiry(c))
            .filter(|d| *d <= days_ahead)
            .min()
    }

    pub fn total_quantity(&self) -> f64 {
        self.cohorts.iter().map(|c| c.quantity).sum()
    }

    /// Quantity keyed by days-to-expiry.
    pub fn inventory_by_days_until_expiry(&self) -> BTreeMap<i64, f64> {
        let mut out = BTreeMap::new();
        for cohort in &self.cohorts {
            *out.entry(self.days_until_expiry(cohort)).or_insert(0.0) += cohort.quantity;
        }
        out
    }

    /// Removes `quantity` units, earliest expiry first.
    ///
    /// A cohort is drained completely before the next one is touched. Fails
    /// without mutating anything if the tracker holds less than `quantity`.
    pub fn consume(&mut self, quantity: f64) -> Result<(), InventoryError> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        let available = self.total_quantity();
        if quantity > available + QUANTITY_EPSILON {
            return Err(InventoryError::InsufficientInventory {
                requested: quantity,
                available,
            });
        }

        self.cohorts.sort_by_key(|c| c.expiry_date);

        let mut remaining = quantity;
        for cohort in self.cohorts.iter_mut() {
            if remaining <= 0.0 {
                break;
            }
            let take = cohort.quantity.min(remaining);
            cohort.quantity -= take;
            remaining -= take;
        }

        self.cohorts.retain(|c| c.quantity > QUANTITY_EPSILON);
        Ok(())
    }

    /// Removes and returns every cohort at (or past) its expiry date.
    ///
    /// Call after the day's sales have been applied; the returned quantity is
    /// that day's waste.
    pub fn purge_expired(&mut self) -> Vec<ExpiryCohort> {
        let today = self.current_date;
        let (expired, live): (Vec<_>, Vec<_>) = self
            .cohorts
            .drain(..)
            .partition(|c| c.days_until_expiry(today) == 0);
        self.cohorts = live;
        expired
    }

    /// Shelf-life ceiling: how much of the current stock can still be sold
    /// before it spoils at `daily_demand_rate`, looking `coverage_days` ahead.
    pub fn max_sellable_before_expiry(&self, daily_demand_rate: f64, coverage_days: i64) -> f64 {
        let capacity: f64 = self
            .cohorts
            .iter()
            .map(|c| {
                let days = self.days_until_expiry(c).min(coverage_days).max(0);
                c.quantity.min(daily_demand_rate * days as f64)
            })
            .sum();
        capacity.min(self.total_quantity())
    }
}
