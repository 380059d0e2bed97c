// Listing records - a dish offered for pickup and its lifecycle

use crate::error::MarketError;
use crate::identity::AccountId;
use crate::ids::random_id;
use crate::pickup::TransportMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

random_id!(
    /// Unique identifier for a food listing
    ListingId,
    "listing"
);

/// Lifecycle state of a listing. `Completed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    Available,
    Claimed,
    Completed,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingStatus::Available => f.write_str("available"),
            ListingStatus::Claimed => f.write_str("claimed"),
            ListingStatus::Completed => f.write_str("completed"),
        }
    }
}

/// The 4-digit secret the giver types in to confirm a handoff
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimCode(u16);

impl ClaimCode {
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for ClaimCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for ClaimCode {
    type Err = MarketError;

    /// Any malformed input is reported as an unknown code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(MarketError::CodeNotFound);
        }
        trimmed
            .parse::<u16>()
            .map(ClaimCode)
            .map_err(|_| MarketError::CodeNotFound)
    }
}

/// What the giver describes when posting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub title: String,
    pub servings: u32,
    pub location: String,
    pub image: Option<String>,
    pub distance_km: f64,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub calories_per_serving: u32,
}

impl ListingDetails {
    pub fn new(title: impl Into<String>, servings: u32, location: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            servings,
            location: location.into(),
            image: None,
            distance_km: crate::pickup::DEFAULT_DISTANCE_KM,
            tags: Vec::new(),
            ingredients: Vec::new(),
            calories_per_serving: 0,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_distance_km(mut self, km: f64) -> Self {
        self.distance_km = km;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_ingredients(mut self, ingredients: Vec<String>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn with_calories(mut self, calories_per_serving: u32) -> Self {
        self.calories_per_serving = calories_per_serving;
        self
    }
}

/// A posted listing
///
/// The claim code exists iff the listing is claimed; the claimant exists iff
/// it is claimed or completed. Carbon saved is fixed at post time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    id: ListingId,
    owner: AccountId,
    details: ListingDetails,
    carbon_saved: f64,
    status: ListingStatus,
    claimant: Option<AccountId>,
    claim_code: Option<ClaimCode>,
    pickup_method: Option<TransportMode>,
    created_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub(crate) fn new(owner: AccountId, details: ListingDetails, carbon_saved: f64) -> Self {
        Self {
            id: ListingId::generate(),
            owner,
            details,
            carbon_saved,
            status: ListingStatus::Available,
            claimant: None,
            claim_code: None,
            pickup_method: None,
            created_at: Utc::now(),
            claimed_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> ListingId {
        self.id
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn details(&self) -> &ListingDetails {
        &self.details
    }

    pub fn title(&self) -> &str {
        &self.details.title
    }

    pub fn servings(&self) -> u32 {
        self.details.servings
    }

    pub fn distance_km(&self) -> f64 {
        self.details.distance_km
    }

    /// kg CO2e avoided, never negative
    pub fn carbon_saved(&self) -> f64 {
        self.carbon_saved
    }

    pub fn status(&self) -> ListingStatus {
        self.status
    }

    pub fn claimant(&self) -> Option<&AccountId> {
        self.claimant.as_ref()
    }

    pub fn claim_code(&self) -> Option<ClaimCode> {
        self.claim_code
    }

    pub fn pickup_method(&self) -> Option<TransportMode> {
        self.pickup_method
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn claimed_at(&self) -> Option<DateTime<Utc>> {
        self.claimed_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Check the code/claimant invariants
    pub fn is_consistent(&self) -> bool {
        let code_ok = self.claim_code.is_some() == (self.status == ListingStatus::Claimed);
        let claimant_ok = self.claimant.is_some() == (self.status != ListingStatus::Available);
        code_ok && claimant_ok && self.carbon_saved >= 0.0
    }

    pub(crate) fn mark_claimed(&mut self, claimant: AccountId, code: ClaimCode, method: TransportMode) {
        self.status = ListingStatus::Claimed;
        self.claimant = Some(claimant);
        self.claim_code = Some(code);
        self.pickup_method = Some(method);
        self.claimed_at = Some(Utc::now());
    }

    pub(crate) fn mark_completed(&mut self) {
        self.status = ListingStatus::Completed;
        self.claim_code = None;
        self.completed_at = Some(Utc::now());
    }
}
