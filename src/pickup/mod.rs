// Pickup module - travel emissions vs. rescued food

mod calculator;

pub(crate) use calculator::round2;
pub use calculator::{
    parse_distance_km, PickupAnalysis, PickupImpactCalculator, TransportMode, DEFAULT_DISTANCE_KM,
};
