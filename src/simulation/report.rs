// src/simulation/report.rs

//! Per-policy comparison of batch results.

use serde::Serialize;

use crate::simulation::engine::{pct, ratio, BatchOutcome, SeriesResult};

/// One row of the comparison table. Volumes are summed across series; the
/// `service_level` and `waste_rate` columns are means of the per-series rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyComparison {
    pub policy: String,
    pub series_simulated: usize,
    pub series_skipped: usize,
    pub total_demand: f64,
    pub total_ordered: f64,
    pub total_sold: f64,
    pub total_waste: f64,
    pub total_stockouts: f64,
    pub total_markdown_sales: f64,
    pub total_markdown_revenue: f64,
    pub service_level: f64,
    pub waste_rate: f64,
    pub service_level_pct: f64,
    pub waste_pct: f64,
    pub stockout_pct: f64,
    pub waste_after_markdown: f64,
    pub waste_after_markdown_pct: f64,
    /// Markdown sales over markdown sales plus waste, across all series.
    pub markdown_sell_through_pct: f64,
    pub waste_cost: f64,
    pub markdown_profit: f64,
}

/// How a candidate policy fares against a baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improvement {
    pub baseline: String,
    pub candidate: String,
    pub baseline_service_level_pct: f64,
    pub candidate_service_level_pct: f64,
    pub baseline_waste_pct: f64,
    pub candidate_waste_pct: f64,
    pub baseline_stockout_pct: f64,
    pub candidate_stockout_pct: f64,
    /// Relative waste reduction in percent; `None` if the baseline wasted nothing.
    pub waste_reduction_pct: Option<f64>,
    pub stockout_reduction_pct: Option<f64>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    ratio(sum, n as f64)
}

fn summarize(policy: &str, rows: &[&SeriesResult], skipped: usize) -> PolicyComparison {
    let sum = |f: fn(&SeriesResult) -> f64| rows.iter().map(|r| f(r)).sum::<f64>();

    let total_demand = sum(|r| r.total_demand);
    let total_ordered = sum(|r| r.total_ordered);
    let total_waste = sum(|r| r.total_waste);
    let total_stockouts = sum(|r| r.total_stockouts);
    let total_markdown_sales = sum(|r| r.total_markdown_sales);
    let service_level = mean(rows.iter().map(|r| r.service_level));
    let waste_after_markdown = total_waste - total_markdown_sales;

    PolicyComparison {
        policy: policy.to_string(),
        series_simulated: rows.len(),
        series_skipped: skipped,
        total_demand,
        total_ordered,
        total_sold: sum(|r| r.total_sold),
        total_waste,
        total_stockouts,
        total_markdown_sales,
        total_markdown_revenue: sum(|r| r.total_markdown_revenue),
        service_level,
        waste_rate: mean(rows.iter().map(|r| r.waste_rate)),
        service_level_pct: pct(service_level),
        waste_pct: pct(ratio(total_waste, total_ordered)),
        stockout_pct: pct(ratio(total_stockouts, total_demand)),
        waste_after_markdown,
        waste_after_markdown_pct: pct(ratio(waste_after_markdown, total_ordered)),
        markdown_sell_through_pct: pct(ratio(total_markdown_sales, total_markdown_sales + total_waste)),
        waste_cost: sum(|r| r.waste_cost),
        markdown_profit: sum(|r| r.markdown_profit),
    }
}

/// One comparison row per policy, in the order the policies were run.
pub fn compare(outcome: &BatchOutcome) -> Vec<PolicyComparison> {
    outcome
        .policies
        .iter()
        .map(|policy| {
            let rows: Vec<&SeriesResult> = outcome.results.iter().filter(|r| &r.policy == policy).collect();
            let skipped = outcome.skipped.iter().filter(|s| &s.policy == policy).count();
            summarize(policy, &rows, skipped)
        })
        .collect()
}

fn reduction(baseline: f64, candidate: f64) -> Option<f64> {
    (baseline > 0.0).then(|| (baseline - candidate) / baseline * 100.0)
}

/// Candidate vs baseline, if both appear in `rows`.
pub fn improvement(rows: &[PolicyComparison], baseline: &str, candidate: &str) -> Option<Improvement> {
    let base = rows.iter().find(|r| r.policy == baseline)?;
    let cand = rows.iter().find(|r| r.policy == candidate)?;

    Some(Improvement {
        baseline: baseline.to_string(),
        candidate: candidate.to_string(),
        baseline_service_level_pct: base.service_level_pct,
        candidate_service_level_pct: cand.service_level_pct,
        baseline_waste_pct: base.waste_pct,
        candidate_waste_pct: cand.waste_pct,
        baseline_stockout_pct: base.stockout_pct,
        candidate_stockout_pct: cand.stockout_pct,
        waste_reduction_pct: reduction(base.waste_pct, cand.waste_pct),
        stockout_reduction_pct: reduction(base.stockout_pct, cand.stockout_pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkipReason;
    use crate::model::series::SeriesKey;
    use crate::simulation::engine::SkippedSeries;
    use approx::assert_relative_eq;

    fn row(policy: &str, demand: f64, ordered: f64, waste: f64, stockouts: f64) -> SeriesResult {
        let service_level = ratio(demand - stockouts, demand);
        let waste_rate = ratio(waste, ordered);
        SeriesResult {
            store_id: "s".into(),
            product_id: "p".into(),
            policy: policy.into(),
            days_simulated: 30,
            shelf_life_days: 5,
            total_demand: demand,
            total_ordered: ordered,
            total_sold: demand - stockouts,
            total_waste: waste,
            total_stockouts: stockouts,
            total_markdown_sales: 0.0,
            total_markdown_revenue: 0.0,
            final_inventory: 0.0,
            service_level,
            waste_rate,
            service_level_pct: pct(service_level),
            waste_pct: pct(waste_rate),
            stockout_pct: pct(ratio(stockouts, demand)),
            markdown_sell_through_pct: 0.0,
            waste_cost: waste * 5.0,
            markdown_profit: -waste * 5.0,
            forecast_fallback_days: 0,
            forecast_wape_pct: None,
            forecast_bias: 0.0,
        }
    }

    fn outcome() -> BatchOutcome {
        BatchOutcome {
            policies: vec!["heuristic".into(), "model_based".into()],
            results: vec![
                row("heuristic", 100.0, 200.0, 40.0, 10.0),
                row("heuristic", 50.0, 100.0, 20.0, 0.0),
                row("model_based", 100.0, 120.0, 10.0, 5.0),
            ],
            skipped: vec![SkippedSeries {
                key: SeriesKey::new("s", "q"),
                policy: "model_based".into(),
                reason: SkipReason::NoForecast,
            }],
            series_total: 3,
            series_not_run: 0,
        }
    }

    #[test]
    fn sums_volumes_and_averages_rates() {
        let rows = compare(&outcome());
        assert_eq!(rows.len(), 2);

        let heuristic = &rows[0];
        assert_eq!(heuristic.policy, "heuristic");
        assert_eq!(heuristic.series_simulated, 2);
        assert_eq!(heuristic.series_skipped, 0);
        assert_relative_eq!(heuristic.total_demand, 150.0);
        assert_relative_eq!(heuristic.total_ordered, 300.0);
        // mean(0.9, 1.0)
        assert_relative_eq!(heuristic.service_level_pct, 95.0);
        assert_relative_eq!(heuristic.waste_pct, 20.0);
        assert_relative_eq!(heuristic.stockout_pct, 6.67);
        assert_relative_eq!(heuristic.waste_cost, 300.0);
        assert_relative_eq!(heuristic.markdown_profit, -300.0);
        assert_eq!(heuristic.markdown_sell_through_pct, 0.0);

        let model = &rows[1];
        assert_eq!(model.series_simulated, 1);
        assert_eq!(model.series_skipped, 1);
        assert_relative_eq!(model.waste_pct, 8.33);
    }

    #[test]
    fn sell_through_pools_markdown_sales_and_waste() {
        let mut outcome = outcome();
        outcome.results[2].total_markdown_sales = 30.0;
        let rows = compare(&outcome);
        // 30 / (30 + 10)
        assert_relative_eq!(rows[1].markdown_sell_through_pct, 75.0);
    }

    #[test]
    fn policy_with_no_results_still_gets_a_row() {
        let mut outcome = outcome();
        outcome.policies.push("other".into());
        let rows = compare(&outcome);
        assert_eq!(rows[2].series_simulated, 0);
        assert_eq!(rows[2].service_level_pct, 0.0);
    }

    #[test]
    fn improvement_over_baseline() {
        let rows = compare(&outcome());
        let imp = improvement(&rows, "heuristic", "model_based").unwrap();
        // (20 - 8.33) / 20
        assert_relative_eq!(imp.waste_reduction_pct.unwrap(), 58.35, epsilon = 1e-9);
        // (6.67 - 5.0) / 6.67
        assert_relative_eq!(imp.stockout_reduction_pct.unwrap(), 1.67 / 6.67 * 100.0, epsilon = 1e-9);
        assert!(improvement(&rows, "heuristic", "missing").is_none());
    }
}
