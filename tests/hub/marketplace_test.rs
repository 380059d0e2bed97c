// Marketplace Tests
// End-to-end flows through the session-driven operation surface

use replate::error::MarketError;
use replate::feed::Collection;
use replate::identity::Role;
use replate::listing::{ListingDetails, ListingStatus};
use replate::pickup::TransportMode;
use replate::services::{CarbonAnalysis, CarbonScenario, ScenarioIcon};
use replate::{MarketConfig, MarketSnapshot, Marketplace, Session};

fn signup(market: &Marketplace, handle: &str, region: &str, role: Role) -> Session {
    market.signup(handle, handle, region, role).unwrap();
    market.session(handle).unwrap()
}

fn soup() -> ListingDetails {
    ListingDetails::new("Lentil soup", 3, "12 Oak St").with_distance_km(2.0)
}

fn analysis() -> CarbonAnalysis {
    CarbonAnalysis {
        dish_name: "Lentil soup".to_string(),
        servings: 3,
        scenarios: vec![
            CarbonScenario::new("Landfill", ScenarioIcon::Trash, 3.0),
            CarbonScenario::new("Freeze it", ScenarioIcon::Snowflake, 0.3),
            CarbonScenario::new("Share with a neighbour", ScenarioIcon::Leaf, 0.2).recommended(),
        ],
    }
}

// ============================================================================
// ACCOUNTS
// ============================================================================

#[test]
fn test_signup_grants_by_role() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let acme = signup(&market, "acme", "Austin", Role::Enterprise);

    assert_eq!(market.balance(&ana).unwrap(), 100);
    assert_eq!(market.history(&ana).unwrap()[0].description(), "Account Created");
    assert_eq!(market.balance(&acme).unwrap(), 0);
    assert!(market.history(&acme).unwrap().is_empty());
}

#[test]
fn test_duplicate_signup_rejected() {
    let market = Marketplace::default();
    signup(&market, "ana", "Austin", Role::Individual);

    assert!(matches!(
        market.signup("ana", "Other", "Denver", Role::Individual),
        Err(MarketError::DuplicateAccount(_))
    ));
}

#[test]
fn test_rating_others_only() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let bo = signup(&market, "bo", "Austin", Role::Individual);

    assert_eq!(market.submit_rating(&ana, bo.account_id(), 4).unwrap(), 4.0);
    assert!(market.submit_rating(&ana, ana.account_id(), 5).is_err());
    assert!(market.submit_rating(&ana, bo.account_id(), 9).is_err());
}

#[test]
fn test_only_enterprise_sessions_verify_themselves() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let acme = signup(&market, "acme", "Austin", Role::Enterprise);

    assert!(matches!(market.verify_enterprise(&ana), Err(MarketError::Unauthorized(_))));
    assert!(!market.account(&ana).unwrap().is_verified());

    market.verify_enterprise(&acme).unwrap();
    assert!(market.account(&acme).unwrap().is_verified());
}

#[test]
fn test_community_roster_is_enterprise_only() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let acme = signup(&market, "acme", "Austin", Role::Enterprise);

    assert!(matches!(market.community_users(&ana), Err(MarketError::Unauthorized(_))));
    let roster = market.community_users(&acme).unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].id(), ana.account_id());
}

// ============================================================================
// POINTS
// ============================================================================

#[test]
fn test_redeem_beyond_balance_is_refused() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);

    assert!(!market.redeem_points(&ana, 101, "Bike repair").unwrap());
    assert!(market.redeem_points(&ana, 100, "Bike repair").unwrap());
    assert_eq!(market.balance(&ana).unwrap(), 0);
}

#[test]
fn test_personal_action_reward() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let scenarios = analysis().scenarios;

    let entry = market.record_personal_action(&ana, &scenarios[1]).unwrap();
    assert_eq!(entry.amount(), 10);
    assert_eq!(entry.description(), "Action: Freeze it");
    assert!(market.record_personal_action(&ana, &scenarios[2]).is_err());
    assert_eq!(market.balance(&ana).unwrap(), 110);
}

// ============================================================================
// FOOD LISTINGS
// ============================================================================

#[test]
fn test_full_pickup_flow() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let bo = signup(&market, "bo", "Austin", Role::Individual);

    // baseline max(3.0, 2.4) - 0.2 = 2.8 kg → 28 + 5 = 33, 16 each
    let listing = market.post_from_analysis(&ana, soup(), &analysis(), &analysis().scenarios[2]).unwrap();
    assert!((listing.carbon_saved() - 2.8).abs() < 1e-9);

    let pickup = market.analyze_pickup(&listing.id(), TransportMode::Car).unwrap();
    assert!(pickup.is_worth_it);

    let code = market.claim_listing(&bo, &listing.id(), TransportMode::Car).unwrap();
    let completion = market.complete_listing(&ana, &code.to_string()).unwrap();

    assert_eq!(completion.payout.share(), 16);
    assert_eq!(completion.listing.status(), ListingStatus::Completed);
    assert_eq!(market.balance(&ana).unwrap(), 116);
    assert_eq!(market.balance(&bo).unwrap(), 116);
}

#[test]
fn test_personal_action_cannot_be_listed() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);

    let result = market.post_from_analysis(&ana, soup(), &analysis(), &analysis().scenarios[0]);
    assert!(matches!(result, Err(MarketError::InvalidState(_))));
}

#[test]
fn test_claimant_cannot_complete_own_pickup() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let bo = signup(&market, "bo", "Austin", Role::Individual);
    let listing = market.post_listing(&ana, soup(), None, 0.0).unwrap();
    let code = market.claim_listing(&bo, &listing.id(), TransportMode::Walk).unwrap();

    assert_eq!(
        market.complete_listing(&bo, &code.to_string()).unwrap_err(),
        MarketError::CodeNotFound
    );
    assert_eq!(market.complete_listing(&ana, "abcd").unwrap_err(), MarketError::CodeNotFound);
    assert_eq!(market.balance(&bo).unwrap(), 100);
}

// ============================================================================
// TRADES AND B2B
// ============================================================================

#[test]
fn test_offer_visibility_by_role() {
    let market = Marketplace::default();
    let acme = signup(&market, "acme", "Austin", Role::Enterprise);
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let cy = signup(&market, "cy", "Denver", Role::Individual);
    market.earn_points(&acme, 500, "topup").unwrap();

    let offer = market.broadcast_offer(&acme, "Austin", 50).unwrap();
    assert!(market.broadcast_offer(&ana, "Austin", 50).is_err());

    assert_eq!(market.pending_offer_count(&ana).unwrap(), 1);
    assert_eq!(market.pending_offer_count(&cy).unwrap(), 0);

    market.accept_trade_offer(&ana, &offer.id()).unwrap();
    assert_eq!(market.pending_offer_count(&ana).unwrap(), 0);
    assert_eq!(market.active_bids(&acme).unwrap().len(), 1);
    assert_eq!(market.offers(&acme).unwrap().len(), 1);
    assert_eq!(market.balance(&ana).unwrap(), 150);
}

#[test]
fn test_b2b_requires_enterprise_buyer() {
    let market = Marketplace::default();
    let green = signup(&market, "green", "Austin", Role::Enterprise);
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let listing = market.create_b2b_listing(&green, 10, 1, 2020, "Solar").unwrap();

    assert!(matches!(
        market.buy_b2b_listing(&ana, &listing.id(), 1, false),
        Err(MarketError::Unauthorized(_))
    ));
    assert!(market.b2b_listings(&ana).is_err());
    assert_eq!(market.b2b_listings(&green).unwrap().len(), 1);
}

// ============================================================================
// CHANGE FEED
// ============================================================================

#[tokio::test]
async fn test_feed_scopes_events_to_session() {
    let market = Marketplace::default();
    let acme = signup(&market, "acme", "Austin", Role::Enterprise);
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let cy = signup(&market, "cy", "Denver", Role::Individual);

    let mut ana_feed = market.subscribe(&ana);
    let mut cy_feed = market.subscribe(&cy);
    let mut acme_feed = market.subscribe(&acme);

    market.broadcast_offer(&acme, "Austin", 10).unwrap();

    let event = ana_feed.recv().await.unwrap();
    assert_eq!(event.collection(), Collection::Offers);
    assert!(cy_feed.drain().is_empty());

    // The enterprise hears about its own bids but never about offers
    let acme_events = acme_feed.drain();
    assert!(acme_events.iter().all(|e| e.collection() == Collection::Bids));
    assert_eq!(acme_events.len(), 1);
}

#[tokio::test]
async fn test_feed_points_are_private() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let bo = signup(&market, "bo", "Austin", Role::Individual);

    let mut bo_feed = market.subscribe(&bo);
    market.earn_points(&ana, 5, "bonus").unwrap();

    assert!(bo_feed.drain().iter().all(|e| e.collection() != Collection::Points));
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[test]
fn test_snapshot_round_trip_preserves_state() {
    let market = Marketplace::default();
    let ana = signup(&market, "ana", "Austin", Role::Individual);
    let bo = signup(&market, "bo", "Austin", Role::Individual);
    let listing = market.post_listing(&ana, soup(), Some(1.0), 0.4).unwrap();
    let code = market.claim_listing(&bo, &listing.id(), TransportMode::Walk).unwrap();
    market.send_message(&bo, &listing.id(), "On my way").unwrap();

    let bytes = market.snapshot().to_bytes();
    let restored = Marketplace::restore(MarketSnapshot::from_bytes(&bytes).unwrap(), MarketConfig::default()).unwrap();

    assert_eq!(restored.snapshot(), market.snapshot());
    assert_eq!(restored.listings().live_codes(), 1);
    assert_eq!(restored.listings().thread(&listing.id()).len(), 2);

    // The live code still completes after restore
    let ana = restored.session("ana").unwrap();
    restored.complete_listing(&ana, &code.to_string()).unwrap();
    assert_eq!(restored.balance(&ana).unwrap(), 112);
}

#[test]
fn test_snapshot_version_mismatch_rejected() {
    let mut snapshot = Marketplace::default().snapshot();
    snapshot.version = 99;

    assert!(MarketSnapshot::from_bytes(&snapshot.to_bytes()).is_err());
}
