// Services module - contracts for the external collaborators
// (estimation, address lookup). Failures here never reach MarketError.

mod estimation;
mod location;

pub use estimation::{
    CarbonAnalysis, CarbonEstimator, CarbonScenario, DishPrediction, Estimation, OfflineEstimator,
    Refinement, ScenarioIcon, StaticEstimator,
};
pub use location::{
    is_postal_code, AddressLookup, Locator, OfflineGazetteer, Place, StaticGazetteer, MIN_QUERY_LEN,
};

use thiserror::Error;

/// Errors from external services
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("No result for: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}
