// Listing ledger - owns food listings and drives available → claimed → completed
//
// Every status change is a compare-and-set under the listing's own map guard,
// so racing claims on one listing serialize while different listings never
// wait on each other. Lock order is listing first, then points books.

use crate::config::MarketConfig;
use crate::error::{MarketError, MarketResult};
use crate::feed::{ChangeEvent, ChangeFeed, Collection};
use crate::identity::AccountId;
use crate::listing::carbon;
use crate::listing::chat::{ChatBoard, ChatMessage};
use crate::listing::model::{ClaimCode, Listing, ListingDetails, ListingId, ListingStatus};
use crate::listing::verifier::ClaimVerifier;
use crate::pickup::TransportMode;
use crate::points::{Payout, PointsLedger};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A completed handoff and what it paid out
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub listing: Listing,
    pub payout: Payout,
}

/// Store of food listings and their chat threads
#[derive(Debug)]
pub struct ListingLedger {
    listings: DashMap<ListingId, Listing>,
    chats: ChatBoard,
    verifier: ClaimVerifier,
    points: Arc<PointsLedger>,
    config: MarketConfig,
    feed: ChangeFeed,
}

impl ListingLedger {
    pub fn new(points: Arc<PointsLedger>, config: MarketConfig, feed: ChangeFeed) -> Self {
        Self {
            listings: DashMap::new(),
            chats: ChatBoard::new(),
            verifier: ClaimVerifier::new(&config),
            points,
            config,
            feed,
        }
    }

    fn require_account(&self, account: &AccountId) -> MarketResult<()> {
        if self.points.has_account(account) {
            Ok(())
        } else {
            Err(MarketError::AccountNotFound(account.to_string()))
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Post a dish. `reported_baseline_kg` is the estimator's waste-case
    /// emission, if it produced one; `chosen_action_kg` is the emission of the
    /// alternative the giver picked.
    pub fn post(
        &self,
        owner: &AccountId,
        details: ListingDetails,
        reported_baseline_kg: Option<f64>,
        chosen_action_kg: f64,
    ) -> MarketResult<Listing> {
        self.require_account(owner)?;
        if details.servings == 0 {
            return Err(MarketError::invalid_amount("a listing needs at least one serving"));
        }
        if details.title.trim().is_empty() {
            return Err(MarketError::invalid_state("a listing needs a title"));
        }

        let saved = carbon::carbon_saved(reported_baseline_kg, chosen_action_kg, details.servings, &self.config);
        let listing = Listing::new(owner.clone(), details, saved);
        self.listings.insert(listing.id(), listing.clone());

        info!(
            listing_id = %listing.id(),
            owner = %owner,
            servings = listing.servings(),
            carbon_saved = saved,
            "listing posted"
        );
        self.feed.publish(ChangeEvent::new(Collection::Listings));
        Ok(listing)
    }

    /// Claim an available listing. Returns the handoff code for the claimant.
    pub fn claim(
        &self,
        listing_id: &ListingId,
        claimant: &AccountId,
        method: TransportMode,
    ) -> MarketResult<ClaimCode> {
        self.require_account(claimant)?;

        let code = {
            let mut listing = self
                .listings
                .get_mut(listing_id)
                .ok_or_else(|| MarketError::ListingNotFound(listing_id.to_string()))?;

            if listing.status() != ListingStatus::Available {
                warn!(listing_id = %listing_id, claimant = %claimant, status = %listing.status(), "claim refused");
                return Err(MarketError::invalid_state(format!(
                    "listing is {}, not available",
                    listing.status()
                )));
            }
            if listing.owner() == claimant {
                return Err(MarketError::invalid_state("owners cannot claim their own listing"));
            }

            let code = self.verifier.issue(*listing_id)?;
            listing.mark_claimed(claimant.clone(), code, method);
            code
        };

        self.chats.append(
            *listing_id,
            ChatMessage::new(claimant.clone(), format!("System: I've claimed this item via {}.", method)),
        );

        info!(listing_id = %listing_id, claimant = %claimant, method = %method, "listing claimed");
        self.feed.publish(ChangeEvent::new(Collection::Listings));
        self.feed.publish(ChangeEvent::new(Collection::Chats));
        Ok(code)
    }

    /// Confirm a handoff by its code and pay both parties.
    ///
    /// Unknown, consumed and never-issued codes all fail the same way and
    /// leave every listing untouched.
    pub fn complete(&self, code: ClaimCode) -> MarketResult<Completion> {
        self.complete_matching(code, None)
    }

    /// Like `complete`, but only for listings the given account posted. A
    /// valid code for someone else's listing is reported as not found.
    pub fn complete_as_owner(&self, code: ClaimCode, owner: &AccountId) -> MarketResult<Completion> {
        self.complete_matching(code, Some(owner))
    }

    fn complete_matching(&self, code: ClaimCode, owner: Option<&AccountId>) -> MarketResult<Completion> {
        let listing_id = self.verifier.lookup(code).ok_or_else(|| {
            debug!("claim code miss");
            MarketError::CodeNotFound
        })?;

        let completion = {
            let mut listing = self
                .listings
                .get_mut(&listing_id)
                .ok_or(MarketError::CodeNotFound)?;

            if listing.status() != ListingStatus::Claimed || listing.claim_code() != Some(code) {
                return Err(MarketError::CodeNotFound);
            }
            if owner.is_some_and(|o| o != listing.owner()) {
                debug!(listing_id = %listing_id, "claim code entered by a non-owner");
                return Err(MarketError::CodeNotFound);
            }
            let claimant = listing
                .claimant()
                .cloned()
                .ok_or_else(|| MarketError::invalid_state("claimed listing without a claimant"))?;

            let payout = Payout::for_carbon_saved(listing.carbon_saved(), &self.config);
            let title = listing.title().to_string();
            if payout.share() > 0 {
                self.points.credit_both(
                    (&claimant, &format!("Verified Pickup: {} (50% Share)", title)),
                    (listing.owner(), &format!("Food Rescued: {} (50% Share)", title)),
                    payout.share(),
                )?;
            }

            listing.mark_completed();
            self.verifier.release(code);

            info!(
                listing_id = %listing_id,
                claimant = %claimant,
                owner = %listing.owner(),
                share = payout.share(),
                forfeited = payout.forfeited(),
                "listing completed"
            );
            Completion {
                listing: listing.clone(),
                payout,
            }
        };

        self.feed.publish(ChangeEvent::new(Collection::Listings));
        Ok(completion)
    }

    /// Remove a listing in any state. Only the owner may do this.
    pub fn delete(&self, listing_id: &ListingId, requester: &AccountId) -> MarketResult<Listing> {
        let removed = self
            .listings
            .remove_if(listing_id, |_, listing| listing.owner() == requester);

        let (_, listing) = match removed {
            Some(pair) => pair,
            None => {
                return if self.listings.contains_key(listing_id) {
                    warn!(listing_id = %listing_id, requester = %requester, "delete refused");
                    Err(MarketError::unauthorized("only the owner may delete a listing"))
                } else {
                    Err(MarketError::ListingNotFound(listing_id.to_string()))
                };
            }
        };

        if let Some(code) = listing.claim_code() {
            self.verifier.release(code);
        }
        self.chats.drop_thread(listing_id);

        info!(listing_id = %listing_id, status = %listing.status(), "listing deleted");
        self.feed.publish(ChangeEvent::new(Collection::Listings));
        self.feed.publish(ChangeEvent::new(Collection::Chats));
        Ok(listing)
    }

    // ========================================================================
    // CHAT
    // ========================================================================

    /// Append a message to a listing's thread
    pub fn send_message(&self, listing_id: &ListingId, sender: &AccountId, text: &str) -> MarketResult<ChatMessage> {
        self.require_account(sender)?;
        if !self.listings.contains_key(listing_id) {
            return Err(MarketError::ListingNotFound(listing_id.to_string()));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(MarketError::invalid_state("message is empty"));
        }

        let message = ChatMessage::new(sender.clone(), text);
        self.chats.append(*listing_id, message.clone());
        debug!(listing_id = %listing_id, sender = %sender, "chat message sent");
        self.feed.publish(ChangeEvent::new(Collection::Chats));
        Ok(message)
    }

    /// The thread for a listing, oldest first
    pub fn thread(&self, listing_id: &ListingId) -> Vec<ChatMessage> {
        self.chats.thread(listing_id)
    }

    pub fn chats(&self) -> &ChatBoard {
        &self.chats
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get(&self, listing_id: &ListingId) -> MarketResult<Listing> {
        self.listings
            .get(listing_id)
            .map(|l| l.value().clone())
            .ok_or_else(|| MarketError::ListingNotFound(listing_id.to_string()))
    }

    /// All listings, newest first
    pub fn all(&self) -> Vec<Listing> {
        let mut listings: Vec<Listing> = self.listings.iter().map(|l| l.value().clone()).collect();
        listings.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(&b.id())));
        listings
    }

    pub fn with_status(&self, status: ListingStatus) -> Vec<Listing> {
        self.all().into_iter().filter(|l| l.status() == status).collect()
    }

    pub fn owned_by(&self, owner: &AccountId) -> Vec<Listing> {
        self.all().into_iter().filter(|l| l.owner() == owner).collect()
    }

    pub fn claimed_by(&self, claimant: &AccountId) -> Vec<Listing> {
        self.all()
            .into_iter()
            .filter(|l| l.claimant() == Some(claimant))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn live_codes(&self) -> usize {
        self.verifier.live_count()
    }

    /// Load a persisted listing back, re-registering its live code
    pub(crate) fn restore(&self, listing: Listing) -> MarketResult<()> {
        if !listing.is_consistent() {
            return Err(MarketError::invalid_state(format!(
                "persisted listing {} violates its invariants",
                listing.id()
            )));
        }
        if let Some(code) = listing.claim_code() {
            self.verifier.restore(code, listing.id());
        }
        self.listings.insert(listing.id(), listing);
        Ok(())
    }
}
