// B2B credit listings and buyer-side holdings

use crate::identity::AccountId;
use crate::ids::random_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

random_id!(
    /// Unique identifier for a credit listing on the B2B market
    CreditListingId,
    "credit listing"
);

/// Market state of a credit listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditListingStatus {
    Active,
    /// Remaining amount reached zero
    Exhausted,
}

impl fmt::Display for CreditListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditListingStatus::Active => f.write_str("active"),
            CreditListingStatus::Exhausted => f.write_str("exhausted"),
        }
    }
}

/// A batch of credits offered at a fixed unit price
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct B2BListing {
    id: CreditListingId,
    seller: AccountId,
    seller_verified: bool,
    original_amount: u64,
    remaining: u64,
    price_per_unit: u64,
    vintage: u16,
    project: String,
    status: CreditListingStatus,
    created_at: DateTime<Utc>,
}

impl B2BListing {
    pub(crate) fn new(
        seller: AccountId,
        seller_verified: bool,
        amount: u64,
        price_per_unit: u64,
        vintage: u16,
        project: impl Into<String>,
    ) -> Self {
        Self {
            id: CreditListingId::generate(),
            seller,
            seller_verified,
            original_amount: amount,
            remaining: amount,
            price_per_unit,
            vintage,
            project: project.into(),
            status: CreditListingStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> CreditListingId {
        self.id
    }

    pub fn seller(&self) -> &AccountId {
        &self.seller
    }

    pub fn seller_verified(&self) -> bool {
        self.seller_verified
    }

    pub fn original_amount(&self) -> u64 {
        self.original_amount
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn sold(&self) -> u64 {
        self.original_amount - self.remaining
    }

    pub fn price_per_unit(&self) -> u64 {
        self.price_per_unit
    }

    pub fn vintage(&self) -> u16 {
        self.vintage
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn status(&self) -> CreditListingStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.status == CreditListingStatus::Active
    }

    /// Remaining never exceeds the listed amount; exhausted exactly at zero
    pub fn is_consistent(&self) -> bool {
        self.remaining <= self.original_amount
            && (self.status == CreditListingStatus::Exhausted) == (self.remaining == 0)
    }

    /// Take `amount` off the remaining balance. Caller has checked the bound.
    pub(crate) fn fill(&mut self, amount: u64) {
        self.remaining -= amount;
        if self.remaining == 0 {
            self.status = CreditListingStatus::Exhausted;
        }
    }
}

/// Credits a buyer acquired in one fill
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditHolding {
    listing: CreditListingId,
    seller: AccountId,
    amount: u64,
    cost: u64,
    vintage: u16,
    project: String,
    retired: bool,
    acquired_at: DateTime<Utc>,
}

impl CreditHolding {
    pub(crate) fn from_fill(listing: &B2BListing, amount: u64, cost: u64, retired: bool) -> Self {
        Self {
            listing: listing.id(),
            seller: listing.seller().clone(),
            amount,
            cost,
            vintage: listing.vintage(),
            project: listing.project().to_string(),
            retired,
            acquired_at: Utc::now(),
        }
    }

    pub fn listing(&self) -> CreditListingId {
        self.listing
    }

    pub fn seller(&self) -> &AccountId {
        &self.seller
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn vintage(&self) -> u16 {
        self.vintage
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Permanently out of circulation
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

/// How a buyer's purchased credits are reported
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub active: u64,
    pub retired: u64,
    pub spent: u64,
    pub holdings: Vec<CreditHolding>,
}

impl Portfolio {
    pub fn from_holdings(holdings: Vec<CreditHolding>) -> Self {
        let mut portfolio = Portfolio::default();
        for holding in &holdings {
            if holding.is_retired() {
                portfolio.retired += holding.amount();
            } else {
                portfolio.active += holding.amount();
            }
            portfolio.spent += holding.cost();
        }
        portfolio.holdings = holdings;
        portfolio
    }

    pub fn total(&self) -> u64 {
        self.active + self.retired
    }
}
