// Carbon / dish estimation - best-effort external collaborator
//
// The core never trusts these figures blindly and never fails because the
// estimator did: every call through `Estimation` degrades to an empty result.

use crate::services::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Category tag the estimator attaches to a scenario
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioIcon {
    /// Disposal: the waste-case baseline
    Trash,
    /// Freeze for later
    Snowflake,
    Recycle,
    Bike,
    Truck,
    Leaf,
}

/// One way of dealing with surplus food
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarbonScenario {
    pub action: String,
    pub icon: ScenarioIcon,
    pub co2e_kg: f64,
    pub description: String,
    pub recommended: bool,
}

impl CarbonScenario {
    pub fn new(action: impl Into<String>, icon: ScenarioIcon, co2e_kg: f64) -> Self {
        Self {
            action: action.into(),
            icon,
            co2e_kg,
            description: String::new(),
            recommended: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    /// Disposal and freezing are handled at home rather than listed
    pub fn is_personal_action(&self) -> bool {
        matches!(self.icon, ScenarioIcon::Trash | ScenarioIcon::Snowflake)
    }
}

/// Estimator answer for a dish
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CarbonAnalysis {
    pub dish_name: String,
    pub servings: u32,
    pub scenarios: Vec<CarbonScenario>,
}

impl CarbonAnalysis {
    /// Keep at most one recommended scenario (the first one flagged)
    pub fn normalized(mut self) -> Self {
        let mut seen = false;
        for scenario in &mut self.scenarios {
            if scenario.recommended {
                if seen {
                    scenario.recommended = false;
                }
                seen = true;
            }
        }
        self
    }

    /// The disposal scenario's emission, if the estimator produced one
    pub fn waste_baseline(&self) -> Option<f64> {
        self.scenarios
            .iter()
            .find(|s| s.icon == ScenarioIcon::Trash)
            .map(|s| s.co2e_kg)
    }

    pub fn recommended(&self) -> Option<&CarbonScenario> {
        self.scenarios.iter().find(|s| s.recommended)
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// A question the estimator asks to pin down an ingredient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refinement {
    pub target_ingredient: String,
    pub options: Vec<String>,
}

/// Estimator guess at what a dish contains
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishPrediction {
    pub ingredients: Vec<String>,
    pub calories: u32,
    pub refinements: Vec<Refinement>,
}

impl DishPrediction {
    /// Answer a refinement: every ingredient mentioning the target (any case)
    /// becomes "<selection> <target>", and the question is dropped.
    pub fn apply_refinement(&mut self, target: &str, selection: &str) {
        let needle = target.to_lowercase();
        for ingredient in &mut self.ingredients {
            if ingredient.to_lowercase().contains(&needle) {
                *ingredient = format!("{} {}", selection, target);
            }
        }
        self.refinements.retain(|r| r.target_ingredient != target);
    }
}

/// Contract for the estimation service
#[async_trait]
pub trait CarbonEstimator: Send + Sync {
    /// Scenarios for disposing of or reusing `servings` of a dish
    async fn analyze(&self, dish: &str, servings: u32, locality: &str) -> Result<CarbonAnalysis, ServiceError>;

    /// Ingredients, calories and refinement questions for a free-text dish
    async fn predict_dish(&self, dish: &str) -> Result<DishPrediction, ServiceError>;
}

/// Degrading front for any estimator
pub struct Estimation<E: CarbonEstimator> {
    inner: E,
}

impl<E: CarbonEstimator> Estimation<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    /// Analysis, or an empty one when the service fails
    pub async fn analyze(&self, dish: &str, servings: u32, locality: &str) -> CarbonAnalysis {
        match self.inner.analyze(dish, servings, locality).await {
            Ok(analysis) => analysis.normalized(),
            Err(e) => {
                warn!(dish, error = %e, "carbon estimation unavailable");
                CarbonAnalysis {
                    dish_name: dish.to_string(),
                    servings,
                    scenarios: Vec::new(),
                }
            }
        }
    }

    /// Prediction, or an empty one when the service fails
    pub async fn predict_dish(&self, dish: &str) -> DishPrediction {
        if dish.trim().is_empty() {
            return DishPrediction::default();
        }
        match self.inner.predict_dish(dish).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(dish, error = %e, "dish prediction unavailable");
                DishPrediction::default()
            }
        }
    }
}

/// Estimator that is never reachable
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineEstimator;

#[async_trait]
impl CarbonEstimator for OfflineEstimator {
    async fn analyze(&self, _dish: &str, _servings: u32, _locality: &str) -> Result<CarbonAnalysis, ServiceError> {
        Err(ServiceError::Unavailable("estimator offline".to_string()))
    }

    async fn predict_dish(&self, _dish: &str) -> Result<DishPrediction, ServiceError> {
        Err(ServiceError::Unavailable("estimator offline".to_string()))
    }
}

/// Estimator answering from canned data, keyed by lowercase dish name
#[derive(Clone, Debug, Default)]
pub struct StaticEstimator {
    analyses: HashMap<String, Vec<CarbonScenario>>,
    predictions: HashMap<String, DishPrediction>,
}

impl StaticEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scenarios(mut self, dish: &str, scenarios: Vec<CarbonScenario>) -> Self {
        self.analyses.insert(dish.to_lowercase(), scenarios);
        self
    }

    pub fn with_prediction(mut self, dish: &str, prediction: DishPrediction) -> Self {
        self.predictions.insert(dish.to_lowercase(), prediction);
        self
    }
}

#[async_trait]
impl CarbonEstimator for StaticEstimator {
    async fn analyze(&self, dish: &str, servings: u32, _locality: &str) -> Result<CarbonAnalysis, ServiceError> {
        let scenarios = self
            .analyses
            .get(&dish.to_lowercase())
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(dish.to_string()))?;
        Ok(CarbonAnalysis {
            dish_name: dish.to_string(),
            servings,
            scenarios,
        })
    }

    async fn predict_dish(&self, dish: &str) -> Result<DishPrediction, ServiceError> {
        self.predictions
            .get(&dish.to_lowercase())
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(dish.to_string()))
    }
}
