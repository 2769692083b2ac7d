// src/strategy/optimization.rs

//! Safety-stock sizing helpers.
//!
//! The order-up-to policy buffers its target with `safety_factor * uncertainty`.
//! The functions here derive that factor from a target service level, or the
//! service level itself from perishable unit economics (the Newsvendor model).

/// Calculates the Critical Ratio (Target Service Level).
///
/// For a perishable item the cost of understocking is the lost margin and the
/// cost of overstocking is the unit cost written off as waste.
///
/// Formula: CR = UnderageCost / (UnderageCost + OverageCost)
pub fn calculate_critical_ratio(underage_cost: f64, overage_cost: f64) -> f64 {
    if underage_cost + overage_cost <= 0.0 {
        return 0.0;
    }
    underage_cost / (underage_cost + overage_cost)
}

/// Newsvendor service level for a perishable sold at `unit_price` and bought
/// at `unit_cost`.
pub fn newsvendor_service_level(unit_price: f64, unit_cost: f64) -> f64 {
    let margin = (unit_price - unit_cost).max(0.0);
    calculate_critical_ratio(margin, unit_cost.max(0.0))
}

/// Numerator coefficients of the rational approximation, lowest order first.
const QUANTILE_NUM: [f64; 3] = [2.515517, 0.802853, 0.010328];
/// Denominator coefficients after the leading 1, lowest order first.
const QUANTILE_DEN: [f64; 3] = [1.432788, 0.189269, 0.001308];
/// Quantiles are clamped to +/- this many standard deviations.
const QUANTILE_LIMIT: f64 = 5.0;

/// Standard normal quantile.
///
/// Rational approximation from Abramowitz & Stegun, *Handbook of
/// Mathematical Functions*, eq. 26.2.23 (absolute error below 4.5e-4).
/// The formula covers the lower tail; the upper tail follows by symmetry.
fn inverse_normal_cdf(p: f64) -> f64 {
    if p <= 0.0 {
        return -QUANTILE_LIMIT;
    }
    if p >= 1.0 {
        return QUANTILE_LIMIT;
    }

    let tail = p.min(1.0 - p);
    let t = (-2.0 * tail.ln()).sqrt();
    let num = QUANTILE_NUM.iter().rev().fold(0.0, |acc, c| acc * t + c);
    let den = 1.0 + t * QUANTILE_DEN.iter().rev().fold(0.0, |acc, c| acc * t + c);
    let z = t - num / den;

    if p < 0.5 {
        -z
    } else {
        z
    }
}

/// Safety factor (z-score) for a target service level.
///
/// Levels at or below 50% need no buffer and yield 0.
pub fn safety_factor_for_service_level(service_level: f64) -> f64 {
    if service_level <= 0.5 {
        return 0.0;
    }
    inverse_normal_cdf(service_level)
}
