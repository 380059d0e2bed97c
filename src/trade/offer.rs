// Trade offers - an enterprise's standing bid to a region

use crate::identity::AccountId;
use crate::ids::random_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

random_id!(
    /// Unique identifier for a trade offer
    OfferId,
    "offer"
);

/// Offer state. `Accepted` and `Rejected` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OfferStatus::Pending)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferStatus::Pending => f.write_str("pending"),
            OfferStatus::Accepted => f.write_str("accepted"),
            OfferStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// An enterprise's offer to the individuals of one region
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    id: OfferId,
    enterprise: AccountId,
    region: String,
    price: u64,
    status: OfferStatus,
    /// The individual whose acceptance settled the offer
    counterparty: Option<AccountId>,
    rejected_by: Option<AccountId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TradeOffer {
    pub(crate) fn new(enterprise: AccountId, region: impl Into<String>, price: u64) -> Self {
        let now = Utc::now();
        Self {
            id: OfferId::generate(),
            enterprise,
            region: region.into(),
            price,
            status: OfferStatus::Pending,
            counterparty: None,
            rejected_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> OfferId {
        self.id
    }

    pub fn enterprise(&self) -> &AccountId {
        &self.enterprise
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Credit units paid to the accepting individual
    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn status(&self) -> OfferStatus {
        self.status
    }

    pub fn counterparty(&self) -> Option<&AccountId> {
        self.counterparty.as_ref()
    }

    pub fn rejected_by(&self) -> Option<&AccountId> {
        self.rejected_by.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == OfferStatus::Pending
    }

    /// Whether an accepted offer counts as an inbound bid
    pub fn is_bid(&self) -> bool {
        self.status == OfferStatus::Accepted && self.counterparty.is_some()
    }

    /// Only accepted offers name a counterparty, only rejected ones a rejecter
    pub fn is_consistent(&self) -> bool {
        self.counterparty.is_some() == (self.status == OfferStatus::Accepted)
            && self.rejected_by.is_some() == (self.status == OfferStatus::Rejected)
    }

    pub(crate) fn set_price(&mut self, price: u64) {
        self.price = price;
        self.updated_at = Utc::now();
    }

    pub(crate) fn mark_accepted(&mut self, individual: AccountId) {
        self.status = OfferStatus::Accepted;
        self.counterparty = Some(individual);
        self.updated_at = Utc::now();
    }

    pub(crate) fn mark_rejected(&mut self, by: AccountId) {
        self.status = OfferStatus::Rejected;
        self.rejected_by = Some(by);
        self.updated_at = Utc::now();
    }
}
