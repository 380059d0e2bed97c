// Completion payout - how a verified pickup turns into credit

use crate::config::MarketConfig;
use serde::{Deserialize, Serialize};

/// The split of a verified pickup's credit
///
/// `total = round(kg × credits_per_kg) + bonus`, each party gets
/// `floor(total / 2)`, and an odd unit is forfeited. Rounding is half away
/// from zero, so 0.05 kg → round(0.5) = 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    total: u64,
    share: u64,
}

impl Payout {
    /// Compute the payout for a listing's carbon saving
    pub fn for_carbon_saved(carbon_saved_kg: f64, config: &MarketConfig) -> Self {
        let kg = if carbon_saved_kg.is_finite() && carbon_saved_kg > 0.0 {
            carbon_saved_kg
        } else {
            0.0
        };
        // Saturating cast: absurdly large savings cap at u64::MAX
        let credits = (kg * config.credits_per_kg).round() as u64;
        let total = credits.saturating_add(config.verification_bonus);
        Self {
            total,
            share: total / 2,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// What each of the two parties receives
    pub fn share(&self) -> u64 {
        self.share
    }

    /// The odd unit nobody receives (0 or 1)
    pub fn forfeited(&self) -> u64 {
        self.total - 2 * self.share
    }
}
