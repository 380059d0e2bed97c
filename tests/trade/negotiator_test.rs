// Trade Negotiator Tests
// Tests for the broadcast / accept / reject handshake and its settlement

use replate::error::MarketError;
use replate::feed::ChangeFeed;
use replate::identity::{Account, AccountId, Directory, Role};
use replate::points::PointsLedger;
use replate::trade::{OfferId, OfferStatus, TradeOfferNegotiator};
use std::sync::Arc;
use std::thread;

fn id(handle: &str) -> AccountId {
    AccountId::new(handle).unwrap()
}

struct Fixture {
    trades: Arc<TradeOfferNegotiator>,
    points: Arc<PointsLedger>,
}

/// acme (enterprise, 1000 points), ana and bo (Austin), cy (Denver)
fn fixture() -> Fixture {
    let feed = ChangeFeed::default();
    let directory = Arc::new(Directory::new());
    let points = Arc::new(PointsLedger::new(feed.clone()));
    for (handle, region, role) in [
        ("acme", "Austin", Role::Enterprise),
        ("ana", "Austin", Role::Individual),
        ("bo", "Austin", Role::Individual),
        ("cy", "Denver", Role::Individual),
    ] {
        directory
            .register(Account::new(id(handle), handle, region, role))
            .unwrap();
        points.open_account(&id(handle)).unwrap();
    }
    points.credit(&id("acme"), 1000, "topup").unwrap();
    let trades = Arc::new(TradeOfferNegotiator::new(directory, Arc::clone(&points), feed));
    Fixture { trades, points }
}

// ============================================================================
// BROADCAST
// ============================================================================

#[test]
fn test_broadcast_creates_pending_offer() {
    let f = fixture();

    let offer = f.trades.broadcast(&id("acme"), "Austin", 150).unwrap();

    assert_eq!(offer.status(), OfferStatus::Pending);
    assert_eq!(offer.price(), 150);
    assert_eq!(offer.region(), "Austin");
    assert!(offer.counterparty().is_none());
}

#[test]
fn test_individual_cannot_broadcast() {
    let f = fixture();

    assert!(matches!(
        f.trades.broadcast(&id("ana"), "Austin", 10),
        Err(MarketError::Unauthorized(_))
    ));
}

#[test]
fn test_zero_price_rejected() {
    let f = fixture();

    assert!(matches!(
        f.trades.broadcast(&id("acme"), "Austin", 0),
        Err(MarketError::InvalidAmount(_))
    ));
}

// ============================================================================
// ACCEPT
// ============================================================================

#[test]
fn test_accept_pays_individual() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 150).unwrap();

    let accepted = f.trades.accept(&offer.id(), &id("ana")).unwrap();

    assert_eq!(accepted.status(), OfferStatus::Accepted);
    assert_eq!(accepted.counterparty(), Some(&id("ana")));
    assert!(accepted.is_bid());
    assert_eq!(f.points.balance(&id("acme")).unwrap(), 850);
    assert_eq!(f.points.balance(&id("ana")).unwrap(), 150);
}

#[test]
fn test_accept_outside_region_unauthorized() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 150).unwrap();

    assert!(matches!(
        f.trades.accept(&offer.id(), &id("cy")),
        Err(MarketError::Unauthorized(_))
    ));
    assert!(f.trades.get(&offer.id()).unwrap().is_pending());
}

#[test]
fn test_accept_unfunded_offer_stays_pending() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 5000).unwrap();

    let result = f.trades.accept(&offer.id(), &id("ana"));

    assert!(matches!(result, Err(MarketError::InsufficientFunds { .. })));
    assert!(f.trades.get(&offer.id()).unwrap().is_pending());
    assert_eq!(f.points.balance(&id("acme")).unwrap(), 1000);
}

#[test]
fn test_unknown_offer_not_found() {
    let f = fixture();

    assert!(matches!(
        f.trades.accept(&OfferId::generate(), &id("ana")),
        Err(MarketError::OfferNotFound(_))
    ));
}

// ============================================================================
// TERMINAL STATES
// ============================================================================

#[test]
fn test_accepted_offer_is_final() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 100).unwrap();
    f.trades.accept(&offer.id(), &id("ana")).unwrap();

    assert!(matches!(f.trades.accept(&offer.id(), &id("bo")), Err(MarketError::InvalidState(_))));
    assert!(matches!(f.trades.reject(&offer.id(), &id("bo")), Err(MarketError::InvalidState(_))));
    assert!(matches!(
        f.trades.update_price(&offer.id(), &id("acme"), 50),
        Err(MarketError::InvalidState(_))
    ));
    assert_eq!(f.points.balance(&id("ana")).unwrap(), 100);
    assert_eq!(f.points.balance(&id("bo")).unwrap(), 0);
}

#[test]
fn test_rejected_offer_is_final() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 100).unwrap();
    let rejected = f.trades.reject(&offer.id(), &id("ana")).unwrap();

    assert_eq!(rejected.status(), OfferStatus::Rejected);
    assert_eq!(rejected.rejected_by(), Some(&id("ana")));
    assert!(matches!(f.trades.accept(&offer.id(), &id("bo")), Err(MarketError::InvalidState(_))));
    assert_eq!(f.points.balance(&id("acme")).unwrap(), 1000);
}

#[test]
fn test_enterprise_can_withdraw_by_rejecting() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 100).unwrap();

    let rejected = f.trades.reject(&offer.id(), &id("acme")).unwrap();
    assert_eq!(rejected.status(), OfferStatus::Rejected);
}

#[test]
fn test_concurrent_accepts_settle_once() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 100).unwrap();

    let threads: Vec<_> = ["ana", "bo"]
        .iter()
        .map(|handle| {
            let trades = Arc::clone(&f.trades);
            let taker = id(handle);
            let offer_id = offer.id();
            thread::spawn(move || trades.accept(&offer_id, &taker))
        })
        .collect();
    let wins = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|r| r.is_ok())
        .count();

    assert_eq!(wins, 1);
    assert_eq!(f.points.balance(&id("acme")).unwrap(), 900);
}

// ============================================================================
// REPRICING AND VISIBILITY
// ============================================================================

#[test]
fn test_update_price_by_owner() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 100).unwrap();

    let updated = f.trades.update_price(&offer.id(), &id("acme"), 120).unwrap();
    assert_eq!(updated.price(), 120);

    f.trades.accept(&offer.id(), &id("ana")).unwrap();
    assert_eq!(f.points.balance(&id("ana")).unwrap(), 120);
}

#[test]
fn test_update_price_by_stranger_unauthorized() {
    let f = fixture();
    let offer = f.trades.broadcast(&id("acme"), "Austin", 100).unwrap();

    assert!(matches!(
        f.trades.update_price(&offer.id(), &id("ana"), 1),
        Err(MarketError::Unauthorized(_))
    ));
    assert_eq!(f.trades.get(&offer.id()).unwrap().price(), 100);
}

#[test]
fn test_region_sees_only_pending_offers() {
    let f = fixture();
    let first = f.trades.broadcast(&id("acme"), "Austin", 100).unwrap();
    f.trades.broadcast(&id("acme"), "Austin", 200).unwrap();
    f.trades.broadcast(&id("acme"), "Denver", 300).unwrap();
    f.trades.accept(&first.id(), &id("ana")).unwrap();

    assert_eq!(f.trades.pending_in_region("Austin").len(), 1);
    assert_eq!(f.trades.pending_in_region("Denver").len(), 1);
    assert_eq!(f.trades.broadcast_by(&id("acme")).len(), 3);
    assert_eq!(f.trades.bids_for(&id("acme")).len(), 1);
    assert_eq!(f.trades.count_with_status(OfferStatus::Accepted), 1);
}
