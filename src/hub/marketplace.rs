// Marketplace - the operation surface callers drive with a Session
//
// Wires the ledgers together, enforces role capabilities, and converts to and
// from snapshots for persistence.

use crate::config::MarketConfig;
use crate::error::{MarketError, MarketResult};
use crate::feed::{ChangeEvent, ChangeFeed, Collection, Subscription};
use crate::hub::snapshot::{MarketSnapshot, SNAPSHOT_VERSION};
use crate::identity::{Account, AccountId, Directory, Role, Session};
use crate::listing::{ChatMessage, ClaimCode, Completion, Listing, ListingDetails, ListingId, ListingLedger};
use crate::market::{B2BListing, B2BMarket, CreditListingId, Fill, Portfolio};
use crate::pickup::{PickupAnalysis, PickupImpactCalculator, TransportMode};
use crate::points::{PointsEntry, PointsLedger};
use crate::services::{CarbonAnalysis, CarbonScenario};
use crate::trade::{OfferId, TradeOffer, TradeOfferNegotiator};
use std::sync::Arc;
use tracing::info;

/// The marketplace core
pub struct Marketplace {
    config: MarketConfig,
    feed: ChangeFeed,
    directory: Arc<Directory>,
    points: Arc<PointsLedger>,
    listings: ListingLedger,
    trades: TradeOfferNegotiator,
    market: B2BMarket,
}

impl Marketplace {
    /// Create an empty marketplace
    pub fn new(config: MarketConfig) -> Self {
        let feed = ChangeFeed::new(config.feed_capacity);
        let directory = Arc::new(Directory::new());
        let points = Arc::new(PointsLedger::new(feed.clone()));
        let listings = ListingLedger::new(Arc::clone(&points), config.clone(), feed.clone());
        let trades = TradeOfferNegotiator::new(Arc::clone(&directory), Arc::clone(&points), feed.clone());
        let market = B2BMarket::new(Arc::clone(&directory), Arc::clone(&points), feed.clone());
        Self {
            config,
            feed,
            directory,
            points,
            listings,
            trades,
            market,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn listings(&self) -> &ListingLedger {
        &self.listings
    }

    pub fn points(&self) -> &PointsLedger {
        &self.points
    }

    pub fn trades(&self) -> &TradeOfferNegotiator {
        &self.trades
    }

    pub fn market(&self) -> &B2BMarket {
        &self.market
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    // ========================================================================
    // ACCOUNTS & SESSIONS
    // ========================================================================

    /// Register an account and grant its starting credit
    pub fn signup(&self, handle: &str, name: &str, region: &str, role: Role) -> MarketResult<Account> {
        let id = AccountId::new(handle)?;
        let account = self.directory.register(Account::new(id.clone(), name, region.trim(), role))?;
        self.points.open_account(&id)?;

        let grant = match role {
            Role::Individual => self.config.individual_signup_grant,
            Role::Enterprise => self.config.enterprise_signup_grant,
        };
        if grant > 0 {
            self.points.credit(&id, grant, "Account Created")?;
        }
        self.feed.publish(ChangeEvent::new(Collection::Accounts));
        Ok(account)
    }

    /// Open a session for an existing account
    pub fn session(&self, handle: &str) -> MarketResult<Session> {
        let id = AccountId::new(handle)?;
        let account = self.directory.get(&id)?;
        Ok(Session::start(&account))
    }

    /// Follow the change feed with the session's capabilities
    pub fn subscribe(&self, session: &Session) -> Subscription {
        self.feed.subscribe(session.clone())
    }

    pub fn account(&self, session: &Session) -> MarketResult<Account> {
        self.directory.get(session.account_id())
    }

    /// Rate another account (1..=5 stars)
    pub fn submit_rating(&self, session: &Session, target: &AccountId, stars: u8) -> MarketResult<f64> {
        if session.account_id() == target {
            return Err(MarketError::invalid_state("accounts cannot rate themselves"));
        }
        let rating = self.directory.rate(target, stars)?;
        self.feed.publish(ChangeEvent::new(Collection::Accounts));
        Ok(rating)
    }

    /// Record that the session's own enterprise account passed KYC
    pub fn verify_enterprise(&self, session: &Session) -> MarketResult<()> {
        session.require_enterprise("KYC verification")?;
        self.directory.verify(session.account_id())?;
        self.feed.publish(ChangeEvent::new(Collection::Accounts));
        Ok(())
    }

    /// Individual accounts, for enterprise community aggregation
    pub fn community_users(&self, session: &Session) -> MarketResult<Vec<Account>> {
        session.require_enterprise("viewing the community roster")?;
        Ok(self.directory.individuals())
    }

    // ========================================================================
    // POINTS
    // ========================================================================

    pub fn earn_points(&self, session: &Session, amount: u64, description: &str) -> MarketResult<PointsEntry> {
        self.points.credit(session.account_id(), amount, description)
    }

    /// `Ok(false)` when the balance does not cover the amount
    pub fn redeem_points(&self, session: &Session, amount: u64, description: &str) -> MarketResult<bool> {
        self.points.debit(session.account_id(), amount, description)
    }

    pub fn balance(&self, session: &Session) -> MarketResult<u64> {
        self.points.balance(session.account_id())
    }

    pub fn history(&self, session: &Session) -> MarketResult<Vec<PointsEntry>> {
        self.points.entries(session.account_id())
    }

    /// Flat reward for handling surplus at home (disposal or freezing)
    pub fn record_personal_action(&self, session: &Session, scenario: &CarbonScenario) -> MarketResult<PointsEntry> {
        if !scenario.is_personal_action() {
            return Err(MarketError::invalid_state(format!(
                "'{}' is shared through a listing, not a personal action",
                scenario.action
            )));
        }
        self.points.credit(
            session.account_id(),
            self.config.personal_action_reward,
            &format!("Action: {}", scenario.action),
        )
    }

    // ========================================================================
    // LISTINGS
    // ========================================================================

    pub fn post_listing(
        &self,
        session: &Session,
        details: ListingDetails,
        reported_baseline_kg: Option<f64>,
        chosen_action_kg: f64,
    ) -> MarketResult<Listing> {
        self.listings
            .post(session.account_id(), details, reported_baseline_kg, chosen_action_kg)
    }

    /// Post using an estimator analysis and the scenario the giver picked
    pub fn post_from_analysis(
        &self,
        session: &Session,
        details: ListingDetails,
        analysis: &CarbonAnalysis,
        chosen: &CarbonScenario,
    ) -> MarketResult<Listing> {
        if chosen.is_personal_action() {
            return Err(MarketError::invalid_state(format!(
                "'{}' is a personal action and cannot be listed",
                chosen.action
            )));
        }
        self.post_listing(session, details, analysis.waste_baseline(), chosen.co2e_kg)
    }

    pub fn claim_listing(&self, session: &Session, listing: &ListingId, method: TransportMode) -> MarketResult<ClaimCode> {
        self.listings.claim(listing, session.account_id(), method)
    }

    /// The giver confirms a handoff with the code the receiver shows them
    pub fn complete_listing(&self, session: &Session, code: &str) -> MarketResult<Completion> {
        let code: ClaimCode = code.parse()?;
        self.listings.complete_as_owner(code, session.account_id())
    }

    pub fn delete_listing(&self, session: &Session, listing: &ListingId) -> MarketResult<Listing> {
        self.listings.delete(listing, session.account_id())
    }

    pub fn send_message(&self, session: &Session, listing: &ListingId, text: &str) -> MarketResult<ChatMessage> {
        self.listings.send_message(listing, session.account_id(), text)
    }

    /// Weigh a pickup trip before claiming
    pub fn analyze_pickup(&self, listing: &ListingId, mode: TransportMode) -> MarketResult<PickupAnalysis> {
        let listing = self.listings.get(listing)?;
        Ok(PickupImpactCalculator::analyze(listing.carbon_saved(), listing.distance_km(), mode))
    }

    // ========================================================================
    // TRADE OFFERS
    // ========================================================================

    pub fn broadcast_offer(&self, session: &Session, region: &str, price: u64) -> MarketResult<TradeOffer> {
        session.require_enterprise("broadcasting an offer")?;
        self.trades.broadcast(session.account_id(), region, price)
    }

    pub fn update_offer_price(&self, session: &Session, offer: &OfferId, price: u64) -> MarketResult<TradeOffer> {
        session.require_enterprise("repricing an offer")?;
        self.trades.update_price(offer, session.account_id(), price)
    }

    pub fn accept_trade_offer(&self, session: &Session, offer: &OfferId) -> MarketResult<TradeOffer> {
        self.trades.accept(offer, session.account_id())
    }

    pub fn reject_trade_offer(&self, session: &Session, offer: &OfferId) -> MarketResult<TradeOffer> {
        self.trades.reject(offer, session.account_id())
    }

    /// Offers the session may see: its own broadcasts, or its region's pending offers
    pub fn offers(&self, session: &Session) -> MarketResult<Vec<TradeOffer>> {
        let account = self.account(session)?;
        Ok(self.trades.visible_to(&account))
    }

    pub fn pending_offer_count(&self, session: &Session) -> MarketResult<usize> {
        Ok(self.offers(session)?.iter().filter(|o| o.is_pending()).count())
    }

    /// Accepted offers against the enterprise's broadcasts
    pub fn active_bids(&self, session: &Session) -> MarketResult<Vec<TradeOffer>> {
        session.require_enterprise("viewing bids")?;
        Ok(self.trades.bids_for(session.account_id()))
    }

    // ========================================================================
    // B2B MARKET
    // ========================================================================

    pub fn create_b2b_listing(
        &self,
        session: &Session,
        amount: u64,
        price_per_unit: u64,
        vintage: u16,
        project: &str,
    ) -> MarketResult<B2BListing> {
        self.market
            .list(session.account_id(), amount, price_per_unit, vintage, project)
    }

    pub fn buy_b2b_listing(
        &self,
        session: &Session,
        listing: &CreditListingId,
        amount: u64,
        retire: bool,
    ) -> MarketResult<Fill> {
        session.require_enterprise("buying on the B2B market")?;
        self.market.buy(listing, session.account_id(), amount, retire)
    }

    pub fn withdraw_b2b_listing(&self, session: &Session, listing: &CreditListingId) -> MarketResult<B2BListing> {
        self.market.withdraw(listing, session.account_id())
    }

    pub fn b2b_listings(&self, session: &Session) -> MarketResult<Vec<B2BListing>> {
        session.require_enterprise("viewing the B2B market")?;
        Ok(self.market.active())
    }

    pub fn portfolio(&self, session: &Session) -> Portfolio {
        self.market.portfolio(session.account_id())
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    /// Capture the full state
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            version: SNAPSHOT_VERSION,
            accounts: self.directory.all(),
            ledgers: self.points.export(),
            listings: self.listings.all(),
            chats: self.listings.chats().export(),
            offers: self.trades.all(),
            credit_listings: self.market.all(),
            holdings: self.market.export_holdings(),
        }
    }

    /// Rebuild a marketplace from a snapshot
    pub fn restore(snapshot: MarketSnapshot, config: MarketConfig) -> MarketResult<Self> {
        let marketplace = Self::new(config);

        for account in snapshot.accounts {
            marketplace.directory.restore(account);
        }
        for (account, entries) in snapshot.ledgers {
            if !marketplace.directory.contains(&account) {
                return Err(MarketError::AccountNotFound(account.to_string()));
            }
            marketplace.points.restore_account(&account, entries)?;
        }
        for listing in snapshot.listings {
            marketplace.listings.restore(listing)?;
        }
        for (listing, messages) in snapshot.chats {
            marketplace.listings.chats().restore(listing, messages);
        }
        for offer in snapshot.offers {
            marketplace.trades.restore(offer)?;
        }
        for listing in snapshot.credit_listings {
            marketplace.market.restore_listing(listing)?;
        }
        for (buyer, holdings) in snapshot.holdings {
            marketplace.market.restore_holdings(buyer, holdings);
        }

        info!(
            accounts = marketplace.directory.len(),
            listings = marketplace.listings.len(),
            "marketplace restored"
        );
        Ok(marketplace)
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new(MarketConfig::default())
    }
}
