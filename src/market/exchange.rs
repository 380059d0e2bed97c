// B2B market - fixed-price credit listings with partial fills
//
// First come, first served: each buy runs under the listing's map guard, so
// concurrent buyers of one listing see a strictly decreasing remainder and
// never drive it below zero.

use crate::error::{MarketError, MarketResult};
use crate::feed::{ChangeEvent, ChangeFeed, Collection};
use crate::identity::{AccountId, Directory};
use crate::market::listing::{B2BListing, CreditHolding, CreditListingId, Portfolio};
use crate::points::PointsLedger;
use chrono::{Datelike, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one purchase
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fill {
    pub listing: B2BListing,
    pub holding: CreditHolding,
}

/// The multi-seller credit market
#[derive(Debug)]
pub struct B2BMarket {
    listings: DashMap<CreditListingId, B2BListing>,
    holdings: DashMap<AccountId, Vec<CreditHolding>>,
    directory: Arc<Directory>,
    points: Arc<PointsLedger>,
    feed: ChangeFeed,
}

impl B2BMarket {
    pub fn new(directory: Arc<Directory>, points: Arc<PointsLedger>, feed: ChangeFeed) -> Self {
        Self {
            listings: DashMap::new(),
            holdings: DashMap::new(),
            directory,
            points,
            feed,
        }
    }

    fn notify(&self) {
        self.feed.publish(ChangeEvent::new(Collection::CreditMarket));
    }

    /// Put a batch of credits up for sale
    pub fn list(
        &self,
        seller: &AccountId,
        amount: u64,
        price_per_unit: u64,
        vintage: u16,
        project: &str,
    ) -> MarketResult<B2BListing> {
        let account = self.directory.get(seller)?;
        if amount == 0 {
            return Err(MarketError::invalid_amount("listed amount must be positive"));
        }
        if price_per_unit == 0 {
            return Err(MarketError::invalid_amount("price per unit must be positive"));
        }
        let this_year = Utc::now().year();
        if i32::from(vintage) > this_year {
            return Err(MarketError::invalid_state(format!(
                "vintage {} is in the future",
                vintage
            )));
        }

        let listing = B2BListing::new(
            seller.clone(),
            account.is_verified(),
            amount,
            price_per_unit,
            vintage,
            project.trim(),
        );
        self.listings.insert(listing.id(), listing.clone());

        info!(
            credit_listing = %listing.id(),
            seller = %seller,
            amount,
            price_per_unit,
            vintage,
            "credits listed"
        );
        self.notify();
        Ok(listing)
    }

    /// Buy part or all of a listing. `retire` takes the credits out of
    /// circulation on the buyer's side.
    pub fn buy(
        &self,
        listing_id: &CreditListingId,
        buyer: &AccountId,
        requested: u64,
        retire: bool,
    ) -> MarketResult<Fill> {
        if !self.directory.contains(buyer) {
            return Err(MarketError::AccountNotFound(buyer.to_string()));
        }
        if requested == 0 {
            return Err(MarketError::invalid_amount("requested amount must be positive"));
        }

        let fill = {
            let mut listing = self
                .listings
                .get_mut(listing_id)
                .ok_or_else(|| MarketError::CreditListingNotFound(listing_id.to_string()))?;

            if listing.seller() == buyer {
                return Err(MarketError::invalid_state("sellers cannot buy their own credits"));
            }
            if requested > listing.remaining() {
                warn!(
                    credit_listing = %listing_id,
                    requested,
                    remaining = listing.remaining(),
                    "purchase exceeds remaining credits"
                );
                return Err(MarketError::invalid_amount(format!(
                    "requested {} but only {} remain",
                    requested,
                    listing.remaining()
                )));
            }
            let cost = requested
                .checked_mul(listing.price_per_unit())
                .ok_or_else(|| MarketError::invalid_amount("purchase cost overflows"))?;

            self.points.transfer(
                buyer,
                listing.seller(),
                cost,
                &format!("B2B credits {} x{} ({})", listing_id, requested, listing.project()),
            )?;

            listing.fill(requested);
            let holding = CreditHolding::from_fill(&listing, requested, cost, retire);
            self.holdings
                .entry(buyer.clone())
                .or_default()
                .push(holding.clone());

            info!(
                credit_listing = %listing_id,
                buyer = %buyer,
                amount = requested,
                cost,
                retired = retire,
                remaining = listing.remaining(),
                status = %listing.status(),
                "credits bought"
            );
            Fill {
                listing: listing.clone(),
                holding,
            }
        };

        self.notify();
        Ok(fill)
    }

    /// Seller pulls a listing off the market
    pub fn withdraw(&self, listing_id: &CreditListingId, requester: &AccountId) -> MarketResult<B2BListing> {
        match self
            .listings
            .remove_if(listing_id, |_, listing| listing.seller() == requester)
        {
            Some((_, listing)) => {
                info!(credit_listing = %listing_id, remaining = listing.remaining(), "credit listing withdrawn");
                self.notify();
                Ok(listing)
            }
            None if self.listings.contains_key(listing_id) => {
                Err(MarketError::unauthorized("only the seller may withdraw a credit listing"))
            }
            None => Err(MarketError::CreditListingNotFound(listing_id.to_string())),
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get(&self, listing_id: &CreditListingId) -> MarketResult<B2BListing> {
        self.listings
            .get(listing_id)
            .map(|l| l.value().clone())
            .ok_or_else(|| MarketError::CreditListingNotFound(listing_id.to_string()))
    }

    /// Every listing, newest first
    pub fn all(&self) -> Vec<B2BListing> {
        let mut listings: Vec<B2BListing> = self.listings.iter().map(|l| l.value().clone()).collect();
        listings.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(&b.id())));
        listings
    }

    /// Listings that can still be bought from, cheapest first
    pub fn active(&self) -> Vec<B2BListing> {
        let mut listings: Vec<B2BListing> = self.all().into_iter().filter(|l| l.is_active()).collect();
        listings.sort_by_key(|l| l.price_per_unit());
        listings
    }

    pub fn holdings(&self, buyer: &AccountId) -> Vec<CreditHolding> {
        self.holdings
            .get(buyer)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }

    /// Purchased credits split into active and retired
    pub fn portfolio(&self, buyer: &AccountId) -> Portfolio {
        Portfolio::from_holdings(self.holdings(buyer))
    }

    pub(crate) fn export_holdings(&self) -> Vec<(AccountId, Vec<CreditHolding>)> {
        let mut all: Vec<(AccountId, Vec<CreditHolding>)> = self
            .holdings
            .iter()
            .map(|h| (h.key().clone(), h.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub(crate) fn restore_listing(&self, listing: B2BListing) -> MarketResult<()> {
        if !listing.is_consistent() {
            return Err(MarketError::invalid_state(format!(
                "persisted credit listing {} violates its invariants",
                listing.id()
            )));
        }
        self.listings.insert(listing.id(), listing);
        Ok(())
    }

    pub(crate) fn restore_holdings(&self, buyer: AccountId, holdings: Vec<CreditHolding>) {
        self.holdings.insert(buyer, holdings);
    }
}
