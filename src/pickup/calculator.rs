// Pickup impact - is a trip to collect food worth its own emissions?

use crate::error::MarketError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance assumed when a listing's distance text cannot be read
pub const DEFAULT_DISTANCE_KM: f64 = 1.0;

/// How the claimant travels to the pickup
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    Walk,
    Bike,
    Transit,
    Car,
}

impl TransportMode {
    pub const ALL: [TransportMode; 4] = [
        TransportMode::Walk,
        TransportMode::Bike,
        TransportMode::Transit,
        TransportMode::Car,
    ];

    /// kg CO2e per km travelled
    pub fn emission_factor(&self) -> f64 {
        match self {
            TransportMode::Walk | TransportMode::Bike => 0.0,
            TransportMode::Transit => 0.105,
            TransportMode::Car => 0.192,
        }
    }

    pub fn is_human_powered(&self) -> bool {
        matches!(self, TransportMode::Walk | TransportMode::Bike)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMode::Walk => "walk",
            TransportMode::Bike => "bike",
            TransportMode::Transit => "transit",
            TransportMode::Car => "car",
        };
        f.write_str(name)
    }
}

impl FromStr for TransportMode {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walk" => Ok(TransportMode::Walk),
            "bike" => Ok(TransportMode::Bike),
            "transit" | "bus" => Ok(TransportMode::Transit),
            "car" => Ok(TransportMode::Car),
            other => Err(MarketError::invalid_state(format!("unknown transport mode '{}'", other))),
        }
    }
}

/// Outcome of weighing a pickup trip against the food it rescues
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickupAnalysis {
    pub travel_emissions: f64,
    pub net_impact: f64,
    pub is_worth_it: bool,
}

impl PickupAnalysis {
    /// Same analysis with figures rounded to 2 decimals for display.
    /// `is_worth_it` keeps the verdict from the unrounded numbers.
    pub fn rounded(&self) -> Self {
        Self {
            travel_emissions: round2(self.travel_emissions),
            net_impact: round2(self.net_impact),
            is_worth_it: self.is_worth_it,
        }
    }
}

/// Stateless calculator
pub struct PickupImpactCalculator;

impl PickupImpactCalculator {
    /// Net carbon effect of a round trip of `distance_km` each way
    pub fn analyze(carbon_saved: f64, distance_km: f64, mode: TransportMode) -> PickupAnalysis {
        let distance = if distance_km.is_finite() && distance_km > 0.0 {
            distance_km
        } else {
            0.0
        };
        let round_trip = 2.0 * distance;
        let travel_emissions = round_trip * mode.emission_factor();
        let net_impact = carbon_saved - travel_emissions;
        PickupAnalysis {
            travel_emissions,
            net_impact,
            is_worth_it: net_impact > 0.0,
        }
    }

    /// Analyze every mode at once, in `TransportMode::ALL` order
    pub fn compare(carbon_saved: f64, distance_km: f64) -> Vec<(TransportMode, PickupAnalysis)> {
        TransportMode::ALL
            .iter()
            .map(|mode| (*mode, Self::analyze(carbon_saved, distance_km, *mode)))
            .collect()
    }
}

/// Read a distance like "0.5km" or "3 KM". Anything unreadable is 1 km.
pub fn parse_distance_km(text: &str) -> f64 {
    let cleaned = text.trim().to_ascii_lowercase();
    let number = cleaned.trim_end_matches("km").trim();
    match number.parse::<f64>() {
        Ok(km) if km.is_finite() && km > 0.0 => km,
        _ => DEFAULT_DISTANCE_KM,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
