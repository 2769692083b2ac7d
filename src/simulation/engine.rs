// src/simulation/engine.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SkipReason;
use crate::forecast::baseline::trailing_mean;
use crate::forecast::metrics;
use crate::forecast::{self, ForecastProvider, ForecastRequest};
use crate::model::series::{DemandSeries, SeriesKey};
use crate::model::shelf_life::shelf_life_days;
use crate::simulation::config::SimulationConfig;
use crate::simulation::economics::UnitEconomicsProvider;
use crate::simulation::state::SimulationState;
use crate::strategy::markdown::MarkdownPolicy;
use crate::strategy::traits::{OrderContext, OrderPolicy};

/// Trailing window of the moving-average fallback.
const FALLBACK_WINDOW_DAYS: usize = 7;

/// Largest conservation gap put down to float noise.
const CONSERVATION_TOLERANCE: f64 = 1e-6;

/// Cooperative stop signal, checked between series.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one store-product series under one policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesResult {
    pub store_id: String,
    pub product_id: String,
    pub policy: String,
    pub days_simulated: usize,
    pub shelf_life_days: i64,
    pub total_demand: f64,
    pub total_ordered: f64,
    pub total_sold: f64,
    pub total_waste: f64,
    pub total_stockouts: f64,
    pub total_markdown_sales: f64,
    pub total_markdown_revenue: f64,
    pub final_inventory: f64,
    pub service_level: f64,
    pub waste_rate: f64,
    pub service_level_pct: f64,
    pub waste_pct: f64,
    pub stockout_pct: f64,
    /// Markdown sales over markdown sales plus waste.
    pub markdown_sell_through_pct: f64,
    /// Wasted units at unit cost.
    pub waste_cost: f64,
    /// Markdown margin less the cost of waste.
    pub markdown_profit: f64,
    pub forecast_fallback_days: usize,
    pub forecast_wape_pct: Option<f64>,
    pub forecast_bias: f64,
}

/// Percent, rounded to two decimals.
pub fn pct(ratio: f64) -> f64 {
    (ratio * 10_000.0).round() / 100.0
}

pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// A series left out of one policy's results.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSeries {
    pub key: SeriesKey,
    pub policy: String,
    pub reason: SkipReason,
}

/// Everything a batch run produced, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub policies: Vec<String>,
    pub results: Vec<SeriesResult>,
    pub skipped: Vec<SkippedSeries>,
    pub series_total: usize,
    /// Series never started because the run was cancelled.
    pub series_not_run: usize,
}

impl BatchOutcome {
    pub fn cancelled(&self) -> bool {
        self.series_not_run > 0
    }
}

/// Policy-independent inputs for one series, computed once and shared by
/// every policy.
#[derive(Debug, Clone)]
struct SeriesPlan {
    shelf_life: i64,
    /// Forecast total for the window starting on each horizon day.
    window_totals: Vec<f64>,
    fallback_days: usize,
    wape_pct: Option<f64>,
    bias: f64,
}

/// Simulates replenishment policies day by day over historical demand.
///
/// One run per (series, policy): the state of each day depends on the day
/// before, so a series is strictly sequential. Series are independent and are
/// spread over `config.workers` threads. Forecasts only see observed demand,
/// so each (series, day) is looked up once and reused by every policy.
#[derive(Debug)]
pub struct SimulationEngine {
    config: Arc<SimulationConfig>,
    forecaster: Arc<dyn ForecastProvider>,
    economics: Arc<dyn UnitEconomicsProvider>,
    markdown: MarkdownPolicy,
    cancel: CancellationToken,
}

impl SimulationEngine {
    pub fn new(
        config: Arc<SimulationConfig>,
        forecaster: Arc<dyn ForecastProvider>,
        economics: Arc<dyn UnitEconomicsProvider>,
    ) -> Self {
        let markdown = MarkdownPolicy::new(Arc::new(config.policy.clone()));
        Self {
            config,
            forecaster,
            economics,
            markdown,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs every policy over every series.
    ///
    /// Per-series failures are recorded in [`BatchOutcome::skipped`] and never
    /// abort the batch.
    pub fn run(&self, series: &[DemandSeries], policies: &[Arc<dyn OrderPolicy>]) -> BatchOutcome {
        info!(
            series = series.len(),
            policies = policies.len(),
            workers = self.config.workers,
            "starting simulation batch"
        );

        let per_series = if self.config.workers <= 1 || series.len() <= 1 {
            self.run_sequential(series, policies)
        } else {
            self.run_parallel(series, policies)
        };

        let mut outcome = BatchOutcome {
            policies: policies.iter().map(|p| p.name().to_string()).collect(),
            series_total: series.len(),
            series_not_run: series.len() - per_series.len(),
            ..BatchOutcome::default()
        };
        for (_, runs) in per_series {
            for run in runs {
                match run {
                    Ok(result) => outcome.results.push(result),
                    Err(skipped) => outcome.skipped.push(skipped),
                }
            }
        }

        if outcome.cancelled() {
            warn!(not_run = outcome.series_not_run, "simulation batch cancelled");
        }
        info!(
            results = outcome.results.len(),
            skipped = outcome.skipped.len(),
            "simulation batch finished"
        );
        outcome
    }

    fn run_sequential(
        &self,
        series: &[DemandSeries],
        policies: &[Arc<dyn OrderPolicy>],
    ) -> Vec<(usize, Vec<Result<SeriesResult, SkippedSeries>>)> {
        let mut out = Vec::with_capacity(series.len());
        for (index, s) in series.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            out.push((index, self.run_policies(s, policies)));
        }
        out
    }

    fn run_parallel(
        &self,
        series: &[DemandSeries],
        policies: &[Arc<dyn OrderPolicy>],
    ) -> Vec<(usize, Vec<Result<SeriesResult, SkippedSeries>>)> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
        for index in 0..series.len() {
            let _ = job_tx.send(index);
        }
        drop(job_tx);

        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        thread::scope(|scope| {
            for _ in 0..self.config.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok(index) = job_rx.recv() {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        let _ = result_tx.send((index, self.run_policies(&series[index], policies)));
                    }
                });
            }
        });
        drop(result_tx);

        let mut out: Vec<_> = result_rx.iter().collect();
        out.sort_by_key(|(index, _)| *index);
        out
    }

    fn run_policies(
        &self,
        series: &DemandSeries,
        policies: &[Arc<dyn OrderPolicy>],
    ) -> Vec<Result<SeriesResult, SkippedSeries>> {
        let skip = |policy: &dyn OrderPolicy, reason: SkipReason| {
            warn!(
                store_id = %series.key.store_id,
                product_id = %series.key.product_id,
                policy = policy.name(),
                %reason,
                "series skipped"
            );
            SkippedSeries {
                key: series.key.clone(),
                policy: policy.name().to_string(),
                reason,
            }
        };

        match self.prepare(series) {
            Ok(plan) => policies
                .iter()
                .map(|policy| {
                    self.simulate(series, &plan, policy.as_ref())
                        .map_err(|reason| skip(policy.as_ref(), reason))
                })
                .collect(),
            Err(reason) => policies
                .iter()
                .map(|policy| Err(skip(policy.as_ref(), reason.clone())))
                .collect(),
        }
    }

    /// Simulates one series under one policy over the last `horizon_days` days.
    pub fn run_series(&self, series: &DemandSeries, policy: &dyn OrderPolicy) -> Result<SeriesResult, SkipReason> {
        let plan = self.prepare(series)?;
        self.simulate(series, &plan, policy)
    }

    /// Checks the series can be simulated and looks up the forecast for every
    /// horizon day.
    fn prepare(&self, series: &DemandSeries) -> Result<SeriesPlan, SkipReason> {
        let config = &*self.config;
        let (history, horizon) = series.split_for_simulation(config.horizon_days);
        if horizon.is_empty() {
            return Err(SkipReason::EmptyHorizon);
        }
        if history.len() < config.min_history_days {
            return Err(SkipReason::InsufficientHistory {
                available: history.len(),
                required: config.min_history_days,
            });
        }

        let window = config.forecast_window_days;
        let points = series.shared_points();
        let mut window_totals = Vec::with_capacity(horizon.len());
        let mut predicted = Vec::with_capacity(horizon.len());
        let mut fallback_days = 0;

        for (offset, point) in horizon.iter().enumerate() {
            let request = ForecastRequest::new(
                series.key.clone(),
                point.date,
                window,
                Arc::clone(&points),
                history.len() + offset,
            );
            let total = self.forecast_window_total(&request, &mut fallback_days)?;
            window_totals.push(total);
            predicted.push(total / f64::from(window));
        }

        let actual: Vec<f64> = horizon.iter().map(|p| p.demand).collect();
        let accuracy = metrics::evaluate(&actual, &predicted);

        Ok(SeriesPlan {
            shelf_life: shelf_life_days(series.category_id, config.default_shelf_life_days),
            window_totals,
            fallback_days,
            wape_pct: accuracy.wape,
            bias: accuracy.bias,
        })
    }

    fn simulate(
        &self,
        series: &DemandSeries,
        plan: &SeriesPlan,
        policy: &dyn OrderPolicy,
    ) -> Result<SeriesResult, SkipReason> {
        let config = &*self.config;
        let (_, horizon) = series.split_for_simulation(config.horizon_days);
        let start = horizon.first().ok_or(SkipReason::EmptyHorizon)?.date;
        let economics = self.economics.unit_economics(&series.key);
        let window = config.forecast_window_days;

        let mut state = SimulationState::new(start, config.initial_inventory, plan.shelf_life)?;

        for (point, &forecast_total) in horizon.iter().zip(&plan.window_totals) {
            let today = point.date;

            // 1. Age the cohorts.
            state.tracker.advance_to(today);

            // 2. Discount stock close to expiry; the discount lifts today's demand.
            let mut demand = point.demand;
            let mut discounted_price = None;
            if policy.applies_markdown() {
                if let Some(nearest) = state.tracker.nearest_expiry_within(config.markdown_window_days) {
                    if let Some(markdown) = self.markdown.recommend_markdown(
                        nearest,
                        state.inventory_on_hand,
                        Some(economics.unit_price),
                        Some(economics.unit_cost),
                    ) {
                        demand = MarkdownPolicy::estimate_demand_uplift(
                            point.demand,
                            markdown.discount_percent,
                            config.price_elasticity,
                        );
                        discounted_price =
                            Some(economics.unit_price * (1.0 - markdown.discount_percent / 100.0));
                    }
                }
            }

            // 3. Replenish against the window forecast; deliveries land the same day.
            let daily_rate = forecast_total / f64::from(window);
            let max_sellable = if state.tracker.is_empty() {
                None
            } else {
                Some(state.tracker.max_sellable_before_expiry(daily_rate, i64::from(window)))
            };
            let context = OrderContext {
                forecasted_demand: forecast_total,
                current_inventory: state.inventory_on_hand.max(0.0),
                inbound_orders: 0.0,
                expiring_units: state.tracker.expiring_within(i64::from(window)),
                forecast_uncertainty: None,
                max_sellable_before_expiry: max_sellable,
                demand_horizon_days: Some(window),
            };
            let order_qty = policy.calculate_order(&context)?;
            if order_qty > 0.0 {
                state.receive(order_qty, today + Duration::days(plan.shelf_life))?;
            }

            // 4. Serve demand, oldest expiry first.
            let sales = state.fulfill(demand)?;
            if let Some(price) = discounted_price {
                if sales > 0.0 {
                    state.total_markdown_sales += sales;
                    state.total_markdown_revenue += sales * price;
                }
            }

            // 5. Write off what expires today.
            state.spoil();
        }

        Ok(self.finish(series, policy, horizon.len(), plan, &state))
    }

    /// Total demand expected over the request's window.
    ///
    /// Falls back to the trailing mean of observed demand when the provider
    /// fails or returns nothing, counting the day in `fallback_days`.
    fn forecast_window_total(&self, request: &ForecastRequest, fallback_days: &mut usize) -> Result<f64, SkipReason> {
        let window = f64::from(request.horizon_days);
        match self.forecaster.forecast(request) {
            Ok(points) if !points.is_empty() => {
                let daily = forecast::total_demand(&points) / points.len() as f64;
                return Ok(daily * window);
            }
            Ok(_) => debug!(series = %request.key, start = %request.start, "empty forecast, using moving average"),
            Err(err) => debug!(
                series = %request.key,
                start = %request.start,
                error = %err,
                "forecast unavailable, using moving average"
            ),
        }

        *fallback_days += 1;
        trailing_mean(request.history(), FALLBACK_WINDOW_DAYS)
            .map(|daily| daily * window)
            .ok_or(SkipReason::NoForecast)
    }

    fn finish(
        &self,
        series: &DemandSeries,
        policy: &dyn OrderPolicy,
        days_simulated: usize,
        plan: &SeriesPlan,
        state: &SimulationState,
    ) -> SeriesResult {
        let gap = state.conservation_gap();
        debug_assert!(gap.abs() < CONSERVATION_TOLERANCE, "unit conservation broken by {gap}");
        if gap.abs() >= CONSERVATION_TOLERANCE {
            warn!(series = %series.key, policy = policy.name(), gap, "units not conserved");
        }
        debug!(
            series = %series.key,
            policy = policy.name(),
            by_days_until_expiry = ?state.tracker.inventory_by_days_until_expiry(),
            "closing inventory"
        );

        let economics = self.economics.unit_economics(&series.key);
        let average_discount = if state.total_markdown_sales > 0.0 && economics.unit_price > 0.0 {
            (1.0 - state.total_markdown_revenue / (state.total_markdown_sales * economics.unit_price)) * 100.0
        } else {
            0.0
        };
        let effectiveness = MarkdownPolicy::calculate_markdown_effectiveness(
            state.total_markdown_sales,
            state.total_markdown_sales + state.total_waste,
            average_discount,
            economics.unit_cost,
            economics.unit_price,
        );

        let service_level = ratio(state.total_demand - state.total_stockouts, state.total_demand);
        let waste_rate = ratio(state.total_waste, state.total_ordered);

        SeriesResult {
            store_id: series.key.store_id.clone(),
            product_id: series.key.product_id.clone(),
            policy: policy.name().to_string(),
            days_simulated,
            shelf_life_days: plan.shelf_life,
            total_demand: state.total_demand,
            total_ordered: state.total_ordered,
            total_sold: state.total_sold,
            total_waste: state.total_waste,
            total_stockouts: state.total_stockouts,
            total_markdown_sales: state.total_markdown_sales,
            total_markdown_revenue: state.total_markdown_revenue,
            final_inventory: state.inventory_on_hand,
            service_level,
            waste_rate,
            service_level_pct: pct(service_level),
            waste_pct: pct(waste_rate),
            stockout_pct: pct(ratio(state.total_stockouts, state.total_demand)),
            markdown_sell_through_pct: pct(effectiveness.sell_through_rate),
            waste_cost: effectiveness.waste_cost,
            markdown_profit: effectiveness.total_profit,
            forecast_fallback_days: plan.fallback_days,
            forecast_wape_pct: plan.wape_pct,
            forecast_bias: plan.bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use crate::forecast::baseline::MovingAverageForecaster;
    use crate::forecast::bounded::BoundedForecaster;
    use crate::forecast::ForecastPoint;
    use crate::model::series::DemandPoint;
    use crate::simulation::economics::{TableEconomics, UnitEconomics};
    use crate::strategy::implementations::{FixedThresholdPolicy, ForecastDrivenPolicy};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use crossbeam_channel::Receiver;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    #[derive(Debug)]
    struct FailingForecaster;

    impl ForecastProvider for FailingForecaster {
        fn name(&self) -> &str {
            "failing"
        }

        fn forecast(&self, _request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError> {
            Err(ForecastError::unavailable("model offline"))
        }
    }

    /// Blocks every lookup until the gate's sender is dropped.
    #[derive(Debug)]
    struct HungForecaster {
        started: Arc<AtomicUsize>,
        gate: Receiver<()>,
    }

    impl ForecastProvider for HungForecaster {
        fn name(&self) -> &str {
            "hung"
        }

        fn forecast(&self, _request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _ = self.gate.recv();
            Err(ForecastError::unavailable("released"))
        }
    }

    /// Moving average that counts its lookups.
    #[derive(Debug, Default)]
    struct CountingForecaster {
        calls: AtomicUsize,
        inner: MovingAverageForecaster,
    }

    impl ForecastProvider for CountingForecaster {
        fn name(&self) -> &str {
            "counting"
        }

        fn forecast(&self, request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.forecast(request)
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn series(product: &str, demand: &[f64]) -> DemandSeries {
        DemandSeries::from_observations(
            SeriesKey::new("s1", product),
            None,
            demand.iter().enumerate().map(|(i, &d)| DemandPoint {
                date: start() + Duration::days(i as i64),
                demand: d,
            }),
        )
    }

    fn engine_with(config: SimulationConfig, forecaster: Arc<dyn ForecastProvider>) -> SimulationEngine {
        SimulationEngine::new(Arc::new(config), forecaster, Arc::new(TableEconomics::default()))
    }

    fn engine_priced(config: SimulationConfig, economics: TableEconomics) -> SimulationEngine {
        SimulationEngine::new(
            Arc::new(config),
            Arc::new(MovingAverageForecaster::default()),
            Arc::new(economics),
        )
    }

    fn engine(config: SimulationConfig) -> SimulationEngine {
        engine_with(config, Arc::new(MovingAverageForecaster::default()))
    }

    fn policies(config: &SimulationConfig) -> Vec<Arc<dyn OrderPolicy>> {
        vec![
            Arc::new(FixedThresholdPolicy::from_config(&config.heuristic)),
            Arc::new(ForecastDrivenPolicy::new(Arc::new(config.policy.clone()))),
        ]
    }

    fn unbalanced(result: &SeriesResult, initial: f64) -> f64 {
        initial + result.total_ordered - result.total_sold - result.total_waste - result.final_inventory
    }

    #[test]
    fn units_are_conserved_under_both_policies() {
        let config = SimulationConfig::default();
        let demand: Vec<f64> = (0..45).map(|i| 8.0 + (i % 7) as f64).collect();
        let outcome = engine(config.clone()).run(&[series("p1", &demand)], &policies(&config));

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.skipped.is_empty());
        for result in &outcome.results {
            assert_eq!(result.days_simulated, 30);
            assert_relative_eq!(unbalanced(result, config.initial_inventory), 0.0, epsilon = 1e-6);
            assert_relative_eq!(result.total_sold + result.total_stockouts, result.total_demand, epsilon = 1e-6);
        }
    }

    #[test]
    fn short_history_is_skipped_not_fatal() {
        let config = SimulationConfig::default();
        let batch = [series("short", &[5.0; 32]), series("long", &[5.0; 40])];
        let outcome = engine(config.clone()).run(&batch, &policies(&config));

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|r| r.product_id == "long"));
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::InsufficientHistory {
                available: 2,
                required: 7
            }
        );
    }

    #[test]
    fn empty_series_has_no_horizon() {
        let config = SimulationConfig::default();
        let policy = FixedThresholdPolicy::from_config(&config.heuristic);
        let err = engine(config).run_series(&series("none", &[]), &policy).unwrap_err();
        assert_eq!(err, SkipReason::EmptyHorizon);
    }

    #[test]
    fn failing_provider_falls_back_to_moving_average() {
        let config = SimulationConfig::default();
        let policy = ForecastDrivenPolicy::new(Arc::new(config.policy.clone()));
        let result = engine_with(config, Arc::new(FailingForecaster))
            .run_series(&series("p1", &[10.0; 40]), &policy)
            .unwrap();

        assert_eq!(result.forecast_fallback_days, 30);
        assert_relative_eq!(result.forecast_bias, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn hung_provider_ties_up_only_the_pool() {
        let config = SimulationConfig {
            forecast_timeout_ms: 1,
            ..SimulationConfig::default()
        };
        let started = Arc::new(AtomicUsize::new(0));
        let (release, gate) = crossbeam_channel::bounded::<()>(0);
        let pool = Arc::new(
            BoundedForecaster::start(
                Arc::new(HungForecaster {
                    started: Arc::clone(&started),
                    gate,
                }),
                StdDuration::from_millis(config.forecast_timeout_ms),
                config.forecast_workers,
                4,
            )
            .unwrap(),
        );
        let batch: Vec<DemandSeries> = (0..5).map(|k| series(&format!("p{k}"), &[6.0; 40])).collect();

        let engine = engine_with(config.clone(), pool.clone());
        let outcome = engine.run(&batch, &policies(&config));

        assert_eq!(outcome.results.len(), 10);
        assert!(outcome.results.iter().all(|r| r.forecast_fallback_days == 30));
        assert!(started.load(Ordering::SeqCst) <= config.forecast_workers);
        assert_eq!(pool.live_workers(), config.forecast_workers);
        drop(release);
    }

    #[test]
    fn forecasts_are_shared_across_policies() {
        let config = SimulationConfig::default();
        let counting = Arc::new(CountingForecaster::default());
        let batch = [series("a", &[5.0; 40]), series("b", &[7.0; 40])];

        let outcome = engine_with(config.clone(), counting.clone()).run(&batch, &policies(&config));

        assert_eq!(outcome.results.len(), 4);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2 * 30);
        assert_eq!(outcome.results[0].forecast_bias, outcome.results[1].forecast_bias);
    }

    #[test]
    fn no_history_and_no_provider_means_no_forecast() {
        let config = SimulationConfig {
            min_history_days: 0,
            ..SimulationConfig::default()
        };
        let policy = ForecastDrivenPolicy::new(Arc::new(config.policy.clone()));
        let err = engine_with(config, Arc::new(FailingForecaster))
            .run_series(&series("p1", &[10.0; 30]), &policy)
            .unwrap_err();
        assert_eq!(err, SkipReason::NoForecast);
    }

    #[test]
    fn only_the_forecast_driven_policy_marks_down() {
        let config = SimulationConfig::default();
        let outcome = engine(config.clone()).run(&[series("slow", &[2.0; 44])], &policies(&config));

        let heuristic = &outcome.results[0];
        let model = &outcome.results[1];
        assert_eq!(heuristic.policy, "heuristic");
        assert_eq!(heuristic.total_markdown_sales, 0.0);
        assert!(model.total_markdown_sales > 0.0);
        // Sold at a discount, never above list price.
        assert!(model.total_markdown_revenue < model.total_markdown_sales * 10.0);
        // Uplifted demand is what gets counted.
        assert!(model.total_demand > heuristic.total_demand);

        assert!(model.markdown_sell_through_pct > 0.0);
        assert_relative_eq!(model.waste_cost, model.total_waste * 5.0, epsilon = 1e-9);
        assert_relative_eq!(heuristic.markdown_profit, -heuristic.waste_cost, epsilon = 1e-9);
    }

    #[test]
    fn markdown_revenue_uses_the_product_price() {
        let config = SimulationConfig::default();
        let economics = TableEconomics::default().with_product(
            "slow",
            UnitEconomics {
                unit_price: 4.0,
                unit_cost: 1.0,
            },
        );
        let outcome = engine_priced(config.clone(), economics).run(&[series("slow", &[2.0; 44])], &policies(&config));

        let model = &outcome.results[1];
        assert!(model.total_markdown_sales > 0.0);
        // Between cost and list price of this product; the default price of 10 would exceed both.
        assert!(model.total_markdown_revenue < model.total_markdown_sales * 4.0);
        assert!(model.total_markdown_revenue >= model.total_markdown_sales * 1.0 - 1e-9);
        assert_relative_eq!(model.waste_cost, model.total_waste * 1.0, epsilon = 1e-9);
    }

    #[test]
    fn parallel_run_matches_sequential() {
        let sequential = SimulationConfig::default();
        let parallel = SimulationConfig {
            workers: 4,
            ..SimulationConfig::default()
        };
        let batch: Vec<DemandSeries> = (0..9)
            .map(|k| {
                let demand: Vec<f64> = (0..40).map(|i| ((i * (k + 3)) % 11) as f64).collect();
                series(&format!("p{k}"), &demand)
            })
            .collect();

        let a = engine(sequential.clone()).run(&batch, &policies(&sequential));
        let b = engine(parallel.clone()).run(&batch, &policies(&parallel));
        assert_eq!(a.results, b.results);
        assert_eq!(a.skipped, b.skipped);
    }

    #[test]
    fn cancelled_batch_reports_unrun_series() {
        let config = SimulationConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let batch = [series("a", &[5.0; 40]), series("b", &[5.0; 40])];
        let outcome = engine(config.clone())
            .with_cancellation(cancel)
            .run(&batch, &policies(&config));

        assert!(outcome.cancelled());
        assert_eq!(outcome.series_not_run, 2);
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        assert_eq!(pct(2.0 / 3.0), 66.67);
        assert_eq!(ratio(1.0, 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn conservation_holds_for_any_demand(demand in prop::collection::vec(0.0f64..40.0, 37..60)) {
            let config = SimulationConfig::default();
            let outcome = engine(config.clone()).run(&[series("p", &demand)], &policies(&config));
            prop_assert_eq!(outcome.results.len(), 2);
            for result in &outcome.results {
                prop_assert!(unbalanced(result, config.initial_inventory).abs() < 1e-6);
                prop_assert!(result.final_inventory >= -1e-9);
                prop_assert!(result.service_level >= 0.0 && result.service_level <= 1.0 + 1e-12);
            }
        }
    }
}
