// Marketplace configuration
//
// Payout constants, sign-up grants and claim-code parameters. Everything has a
// sensible default; the builders exist for tests and for the CLI.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Tunables for the marketplace core
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Credit units awarded per kg CO2e saved on a verified pickup
    pub credits_per_kg: f64,
    /// Flat bonus added to every verified pickup
    pub verification_bonus: u64,
    /// Waste-case emission floor used when the estimator under-reports
    pub waste_floor_kg_per_serving: f64,
    /// Credit granted to a new individual account
    pub individual_signup_grant: u64,
    /// Credit granted to a new enterprise account
    pub enterprise_signup_grant: u64,
    /// Flat reward for a personal (non-shared) disposal action
    pub personal_action_reward: u64,
    /// Smallest claim code
    pub claim_code_min: u16,
    /// Largest claim code
    pub claim_code_max: u16,
    /// Draws attempted before accepting a code that collides with a live one
    pub claim_code_attempts: usize,
    /// Buffered change events per subscriber
    pub feed_capacity: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            credits_per_kg: 10.0,
            verification_bonus: 5,
            waste_floor_kg_per_serving: 0.8,
            individual_signup_grant: 100,
            enterprise_signup_grant: 0,
            personal_action_reward: 10,
            claim_code_min: 1000,
            claim_code_max: 9999,
            claim_code_attempts: 32,
            feed_capacity: 256,
        }
    }
}

impl MarketConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credits_per_kg(mut self, credits: f64) -> Self {
        self.credits_per_kg = credits;
        self
    }

    pub fn with_verification_bonus(mut self, bonus: u64) -> Self {
        self.verification_bonus = bonus;
        self
    }

    pub fn with_waste_floor(mut self, kg_per_serving: f64) -> Self {
        self.waste_floor_kg_per_serving = kg_per_serving;
        self
    }

    pub fn with_signup_grants(mut self, individual: u64, enterprise: u64) -> Self {
        self.individual_signup_grant = individual;
        self.enterprise_signup_grant = enterprise;
        self
    }

    pub fn with_personal_action_reward(mut self, reward: u64) -> Self {
        self.personal_action_reward = reward;
        self
    }

    /// Narrow the claim-code space (mostly useful to force collisions in tests)
    pub fn with_claim_code_range(mut self, min: u16, max: u16) -> Self {
        self.claim_code_min = min.min(max);
        self.claim_code_max = max.max(min);
        self
    }

    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity.max(1);
        self
    }

    /// The inclusive range claim codes are drawn from
    pub fn claim_code_range(&self) -> RangeInclusive<u16> {
        self.claim_code_min..=self.claim_code_max
    }
}
