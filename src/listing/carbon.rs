// Carbon savings policy for a posted listing
//
// saved = max(0, baseline - chosen), where the baseline is the estimator's
// waste-case emission raised to at least a per-serving floor.

use crate::config::MarketConfig;
use crate::pickup::round2;

/// Waste-case emission to measure savings against
pub fn waste_baseline(reported_kg: Option<f64>, servings: u32, config: &MarketConfig) -> f64 {
    let reported = match reported_kg {
        Some(kg) if kg.is_finite() && kg > 0.0 => kg,
        _ => 0.0,
    };
    let floor = config.waste_floor_kg_per_serving * f64::from(servings);
    reported.max(floor)
}

/// kg CO2e saved by choosing an alternative to disposal, to 2 decimals
pub fn carbon_saved(
    reported_baseline_kg: Option<f64>,
    chosen_action_kg: f64,
    servings: u32,
    config: &MarketConfig,
) -> f64 {
    let baseline = waste_baseline(reported_baseline_kg, servings, config);
    let chosen = if chosen_action_kg.is_finite() {
        chosen_action_kg
    } else {
        baseline
    };
    round2((baseline - chosen).max(0.0))
}
