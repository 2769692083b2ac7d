mod error;
mod forecast;
mod io;
mod model;
mod observability;
mod simulation;
mod strategy;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use crate::forecast::baseline::{LastValueForecaster, MovingAverageForecaster, SeasonalNaiveForecaster};
use crate::forecast::bounded::BoundedForecaster;
use crate::forecast::ForecastProvider;
use crate::io::{demand, prices, reporting};
use crate::observability::LogFormat;
use crate::simulation::config::SimulationConfig;
use crate::simulation::economics::{TableEconomics, UnitEconomics};
use crate::simulation::engine::{CancellationToken, SimulationEngine};
use crate::simulation::report::{self, PolicyComparison};
use crate::strategy::implementations::{FixedThresholdPolicy, ForecastDrivenPolicy};
use crate::strategy::traits::OrderPolicy;

/// Extra days of synthetic history generated ahead of the simulated window.
const SYNTHETIC_HISTORY_DAYS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ForecasterKind {
    MovingAverage,
    SeasonalNaive,
    LastValue,
}

/// Compares a fixed reorder-point heuristic against forecast-driven
/// replenishment with markdowns over perishable demand history.
#[derive(Debug, Parser)]
#[command(name = "perishable-replenishment", version)]
struct Cli {
    /// Demand history CSV (store_id, product_id, date, demand[, category_id]).
    #[arg(long)]
    demand: Option<PathBuf>,

    /// JSON simulation config; missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-product prices CSV (product_id, unit_price, unit_cost). Unlisted
    /// products sell at 10 and cost 5.
    #[arg(long)]
    prices: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Series to generate when no demand file is given.
    #[arg(long, default_value_t = 12)]
    synthetic_series: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Target service level in (0, 1); overrides the configured safety factor.
    #[arg(long, conflicts_with = "newsvendor")]
    service_level: Option<f64>,

    /// Derive the service level from unit price and cost (Newsvendor critical
    /// ratio), averaged over the products in --prices.
    #[arg(long)]
    newsvendor: bool,

    #[arg(long, value_enum, default_value_t = ForecasterKind::MovingAverage)]
    forecaster: ForecasterKind,

    /// Worker threads; overrides the config.
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn load_config(cli: &Cli, economics: &TableEconomics) -> anyhow::Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(level) = cli.service_level {
        if !(level > 0.0 && level < 1.0) {
            bail!("--service-level must be between 0 and 1, got {level}");
        }
        config.policy = config.policy.with_service_level(level);
    }
    if cli.newsvendor {
        let level = economics.newsvendor_service_level();
        info!(service_level = level, "using newsvendor service level");
        config.policy = config.policy.with_service_level(level);
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    config.validate().context("invalid simulation config")?;
    Ok(config)
}

fn build_forecaster(kind: ForecasterKind, config: &SimulationConfig) -> anyhow::Result<Arc<dyn ForecastProvider>> {
    let inner: Arc<dyn ForecastProvider> = match kind {
        ForecasterKind::MovingAverage => Arc::new(MovingAverageForecaster::default()),
        ForecasterKind::SeasonalNaive => Arc::new(SeasonalNaiveForecaster::new(7)),
        ForecasterKind::LastValue => Arc::new(LastValueForecaster),
    };
    let pool = BoundedForecaster::start(
        inner,
        Duration::from_millis(config.forecast_timeout_ms),
        config.forecast_workers,
        config.forecast_queue_capacity,
    )
    .context("starting forecast workers")?;
    info!(
        workers = pool.live_workers(),
        queue = config.forecast_queue_capacity,
        timeout_ms = config.forecast_timeout_ms,
        "forecast pool started"
    );
    Ok(Arc::new(pool))
}

/// Cancels `token` on Ctrl-C. The batch stops between series and still
/// writes what it finished.
fn cancel_on_ctrl_c(token: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(error = %err, "ctrl-c handler unavailable");
                    return;
                }
            };
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    warn!("interrupt received, stopping after the running series");
                    token.cancel();
                }
                Err(err) => warn!(error = %err, "ctrl-c handler unavailable"),
            }
        });
    if let Err(err) = spawned {
        warn!(error = %err, "ctrl-c handler unavailable");
    }
}

fn print_comparison(rows: &[PolicyComparison]) {
    println!("\n=== Policy Comparison ===");
    println!(
        "{:<14} {:>8} {:>8} {:>10} {:>10} {:>10} {:>12}",
        "policy", "series", "skipped", "service%", "waste%", "stockout%", "md_sales"
    );
    for row in rows {
        println!(
            "{:<14} {:>8} {:>8} {:>10.2} {:>10.2} {:>10.2} {:>12.1}",
            row.policy,
            row.series_simulated,
            row.series_skipped,
            row.service_level_pct,
            row.waste_pct,
            row.stockout_pct,
            row.total_markdown_sales,
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(cli.log_format);

    let economics = match &cli.prices {
        Some(path) => prices::load_prices_csv(path, UnitEconomics::default())
            .with_context(|| format!("loading prices from {}", path.display()))?,
        None => TableEconomics::new(UnitEconomics::default()),
    };
    let config = load_config(&cli, &economics)?;

    let series = match &cli.demand {
        Some(path) => demand::load_demand_csv(path)
            .with_context(|| format!("loading demand from {}", path.display()))?,
        None => {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid synthetic start date")?;
            let days = config.horizon_days + SYNTHETIC_HISTORY_DAYS;
            demand::synthetic_series(cli.synthetic_series, days, start, cli.seed)?
        }
    };
    if series.is_empty() {
        bail!("no demand series to simulate");
    }

    let policies: Vec<Arc<dyn OrderPolicy>> = vec![
        Arc::new(FixedThresholdPolicy::from_config(&config.heuristic)),
        Arc::new(ForecastDrivenPolicy::new(Arc::new(config.policy.clone()))),
    ];
    let forecaster = build_forecaster(cli.forecaster, &config)?;
    info!(forecaster = forecaster.name(), "forecast provider ready");

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let engine = SimulationEngine::new(Arc::new(config), forecaster, Arc::new(economics)).with_cancellation(cancel);
    let outcome = engine.run(&series, &policies);
    let comparison = report::compare(&outcome);

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    reporting::write_comparison(&cli.output_dir, &comparison)?;
    reporting::write_detailed_results(&cli.output_dir, &outcome.results)?;

    print_comparison(&comparison);
    println!(
        "\nSeries: {} total, {} results, {} skipped, {} not run",
        outcome.series_total,
        outcome.results.len(),
        outcome.skipped.len(),
        outcome.series_not_run
    );

    if let Some(imp) = report::improvement(
        &comparison,
        FixedThresholdPolicy::NAME,
        ForecastDrivenPolicy::NAME,
    ) {
        println!("\n=== {} vs {} ===", imp.candidate, imp.baseline);
        println!(
            "Service level: {:.2}% -> {:.2}%",
            imp.baseline_service_level_pct, imp.candidate_service_level_pct
        );
        println!("Waste:         {:.2}% -> {:.2}%", imp.baseline_waste_pct, imp.candidate_waste_pct);
        println!(
            "Stockouts:     {:.2}% -> {:.2}%",
            imp.baseline_stockout_pct, imp.candidate_stockout_pct
        );
        match imp.waste_reduction_pct {
            Some(r) => println!("Waste reduction: {r:.1}%"),
            None => println!("Waste reduction: n/a (baseline had no waste)"),
        }
        if let Some(r) = imp.stockout_reduction_pct {
            println!("Stockout reduction: {r:.1}%");
        }
    }

    Ok(())
}
