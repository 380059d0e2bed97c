// Trade negotiator - the broadcast / accept / reject handshake
//
// pending → accepted | rejected, both terminal. Acceptance pays the offer
// price from the enterprise to the accepting individual; if the enterprise
// cannot cover it, nothing changes and the offer stays pending.

use crate::error::{MarketError, MarketResult};
use crate::feed::{ChangeEvent, ChangeFeed, Collection};
use crate::identity::{Account, AccountId, Directory, Role};
use crate::points::PointsLedger;
use crate::trade::offer::{OfferId, OfferStatus, TradeOffer};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Owner of every trade offer
#[derive(Debug)]
pub struct TradeOfferNegotiator {
    offers: DashMap<OfferId, TradeOffer>,
    directory: Arc<Directory>,
    points: Arc<PointsLedger>,
    feed: ChangeFeed,
}

impl TradeOfferNegotiator {
    pub fn new(directory: Arc<Directory>, points: Arc<PointsLedger>, feed: ChangeFeed) -> Self {
        Self {
            offers: DashMap::new(),
            directory,
            points,
            feed,
        }
    }

    fn notify(&self, offer: &TradeOffer) {
        self.feed
            .publish(ChangeEvent::scoped(Collection::Offers, offer.region()));
        self.feed
            .publish(ChangeEvent::scoped(Collection::Bids, offer.enterprise().as_str()));
    }

    fn refuse_terminal(offer: &TradeOffer, action: &str) -> MarketResult<()> {
        if offer.status().is_terminal() {
            warn!(offer_id = %offer.id(), status = %offer.status(), action, "offer is closed");
            return Err(MarketError::invalid_state(format!(
                "cannot {} an offer that is already {}",
                action,
                offer.status()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // PROTOCOL
    // ========================================================================

    /// Publish a new pending offer to a region
    pub fn broadcast(&self, enterprise: &AccountId, region: &str, price: u64) -> MarketResult<TradeOffer> {
        let account = self.directory.get(enterprise)?;
        if !account.is_enterprise() {
            return Err(MarketError::unauthorized("only enterprises can broadcast offers"));
        }
        if price == 0 {
            return Err(MarketError::invalid_amount("offer price must be positive"));
        }
        let region = region.trim();
        if region.is_empty() {
            return Err(MarketError::invalid_state("an offer needs a target region"));
        }

        let offer = TradeOffer::new(enterprise.clone(), region, price);
        self.offers.insert(offer.id(), offer.clone());

        info!(offer_id = %offer.id(), enterprise = %enterprise, region, price, "offer broadcast");
        self.notify(&offer);
        Ok(offer)
    }

    /// Change the price of a pending offer
    pub fn update_price(&self, offer_id: &OfferId, requester: &AccountId, new_price: u64) -> MarketResult<TradeOffer> {
        let updated = {
            let mut offer = self
                .offers
                .get_mut(offer_id)
                .ok_or_else(|| MarketError::OfferNotFound(offer_id.to_string()))?;

            Self::refuse_terminal(&offer, "reprice")?;
            if offer.enterprise() != requester {
                return Err(MarketError::unauthorized("only the broadcasting enterprise may reprice"));
            }
            if new_price == 0 {
                return Err(MarketError::invalid_amount("offer price must be positive"));
            }

            let old_price = offer.price();
            offer.set_price(new_price);
            info!(offer_id = %offer_id, old_price, new_price, "offer repriced");
            offer.clone()
        };

        self.notify(&updated);
        Ok(updated)
    }

    /// Accept a pending offer and settle it
    pub fn accept(&self, offer_id: &OfferId, individual: &AccountId) -> MarketResult<TradeOffer> {
        let account = self.directory.get(individual)?;

        let accepted = {
            let mut offer = self
                .offers
                .get_mut(offer_id)
                .ok_or_else(|| MarketError::OfferNotFound(offer_id.to_string()))?;

            Self::refuse_terminal(&offer, "accept")?;
            Self::check_individual_in_region(&account, &offer)?;

            self.points.transfer(
                offer.enterprise(),
                individual,
                offer.price(),
                &format!("Trade offer {} ({})", offer_id, offer.region()),
            )?;

            offer.mark_accepted(individual.clone());
            info!(
                offer_id = %offer_id,
                enterprise = %offer.enterprise(),
                individual = %individual,
                price = offer.price(),
                "offer accepted"
            );
            offer.clone()
        };

        self.notify(&accepted);
        Ok(accepted)
    }

    /// Reject a pending offer. Either side may do this.
    pub fn reject(&self, offer_id: &OfferId, requester: &AccountId) -> MarketResult<TradeOffer> {
        let account = self.directory.get(requester)?;

        let rejected = {
            let mut offer = self
                .offers
                .get_mut(offer_id)
                .ok_or_else(|| MarketError::OfferNotFound(offer_id.to_string()))?;

            Self::refuse_terminal(&offer, "reject")?;
            if offer.enterprise() != requester {
                Self::check_individual_in_region(&account, &offer)?;
            }

            offer.mark_rejected(requester.clone());
            info!(offer_id = %offer_id, by = %requester, "offer rejected");
            offer.clone()
        };

        self.notify(&rejected);
        Ok(rejected)
    }

    fn check_individual_in_region(account: &Account, offer: &TradeOffer) -> MarketResult<()> {
        if account.role() != Role::Individual {
            return Err(MarketError::unauthorized("only individuals can answer an offer"));
        }
        if account.region() != offer.region() {
            return Err(MarketError::unauthorized(format!(
                "offer targets {}, account is in {}",
                offer.region(),
                account.region()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // VISIBILITY
    // ========================================================================

    pub fn get(&self, offer_id: &OfferId) -> MarketResult<TradeOffer> {
        self.offers
            .get(offer_id)
            .map(|o| o.value().clone())
            .ok_or_else(|| MarketError::OfferNotFound(offer_id.to_string()))
    }

    fn sorted(&self, keep: impl Fn(&TradeOffer) -> bool) -> Vec<TradeOffer> {
        let mut offers: Vec<TradeOffer> = self
            .offers
            .iter()
            .filter(|o| keep(o.value()))
            .map(|o| o.value().clone())
            .collect();
        offers.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(&b.id())));
        offers
    }

    /// Every offer an enterprise broadcast, in any state
    pub fn broadcast_by(&self, enterprise: &AccountId) -> Vec<TradeOffer> {
        self.sorted(|o| o.enterprise() == enterprise)
    }

    /// Inbound acceptances against an enterprise's offers
    pub fn bids_for(&self, enterprise: &AccountId) -> Vec<TradeOffer> {
        self.sorted(|o| o.enterprise() == enterprise && o.is_bid())
    }

    /// Pending offers addressed to a region
    pub fn pending_in_region(&self, region: &str) -> Vec<TradeOffer> {
        self.sorted(|o| o.is_pending() && o.region() == region)
    }

    /// What an account is allowed to see
    pub fn visible_to(&self, account: &Account) -> Vec<TradeOffer> {
        match account.role() {
            Role::Enterprise => self.broadcast_by(account.id()),
            Role::Individual => self.pending_in_region(account.region()),
        }
    }

    pub fn count_with_status(&self, status: OfferStatus) -> usize {
        self.offers.iter().filter(|o| o.status() == status).count()
    }

    pub fn all(&self) -> Vec<TradeOffer> {
        self.sorted(|_| true)
    }

    pub(crate) fn restore(&self, offer: TradeOffer) -> MarketResult<()> {
        if !offer.is_consistent() {
            return Err(MarketError::invalid_state(format!(
                "persisted offer {} violates its invariants",
                offer.id()
            )));
        }
        self.offers.insert(offer.id(), offer);
        Ok(())
    }
}
