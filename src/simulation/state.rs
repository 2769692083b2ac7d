// src/simulation/state.rs

use chrono::NaiveDate;

use crate::error::InventoryError;
use crate::model::cohort::ExpiryCohortTracker;

/// Running state of one store-product series under one policy.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub inventory_on_hand: f64,
    pub tracker: ExpiryCohortTracker,
    pub initial_inventory: f64,

    // Running totals
    pub total_demand: f64,
    pub total_ordered: f64,
    pub total_sold: f64,
    pub total_waste: f64,
    pub total_stockouts: f64,
    pub total_markdown_sales: f64,
    pub total_markdown_revenue: f64,
}

impl SimulationState {
    /// Opens a series with `initial_inventory` units expiring after `shelf_life_days`.
    pub fn new(start: NaiveDate, initial_inventory: f64, shelf_life_days: i64) -> Result<Self, InventoryError> {
        let mut tracker = ExpiryCohortTracker::new(start);
        if initial_inventory > 0.0 {
            tracker.add_inventory(initial_inventory, start + chrono::Duration::days(shelf_life_days))?;
        }
        Ok(Self {
            inventory_on_hand: initial_inventory,
            tracker,
            initial_inventory,
            total_demand: 0.0,
            total_ordered: 0.0,
            total_sold: 0.0,
            total_waste: 0.0,
            total_stockouts: 0.0,
            total_markdown_sales: 0.0,
            total_markdown_revenue: 0.0,
        })
    }

    /// Books a delivery into both the on-hand figure and the cohorts.
    pub fn receive(&mut self, quantity: f64, expiry_date: NaiveDate) -> Result<(), InventoryError> {
        self.tracker.add_inventory(quantity, expiry_date)?;
        self.inventory_on_hand += quantity;
        self.total_ordered += quantity;
        Ok(())
    }

    /// Serves `demand` from stock, oldest expiry first. Returns units sold.
    pub fn fulfill(&mut self, demand: f64) -> Result<f64, InventoryError> {
        let sales = demand.min(self.inventory_on_hand).max(0.0);
        let stockout = (demand - self.inventory_on_hand).max(0.0);

        self.tracker.consume(sales)?;
        self.inventory_on_hand -= sales;

        self.total_demand += demand;
        self.total_sold += sales;
        self.total_stockouts += stockout;
        Ok(sales)
    }

    /// Writes off every cohort expiring today. Returns the wasted units.
    pub fn spoil(&mut self) -> f64 {
        let waste: f64 = self.tracker.purge_expired().iter().map(|c| c.quantity).sum();
        self.inventory_on_hand -= waste;
        self.total_waste += waste;
        waste
    }

    /// initial + ordered - sold - waste - on hand. Zero up to float noise.
    pub fn conservation_gap(&self) -> f64 {
        self.initial_inventory + self.total_ordered - self.total_sold - self.total_waste - self.inventory_on_hand
    }
}
