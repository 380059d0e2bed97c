// B2B Exchange Tests
// Tests for listing, partial fills and portfolios on the credit market

use chrono::{Datelike, Utc};
use replate::error::MarketError;
use replate::feed::ChangeFeed;
use replate::identity::{Account, AccountId, Directory, Role};
use replate::market::{B2BMarket, CreditListingId, CreditListingStatus};
use replate::points::PointsLedger;
use std::sync::Arc;
use std::thread;

fn id(handle: &str) -> AccountId {
    AccountId::new(handle).unwrap()
}

/// seller "green" (verified enterprise), buyer "acme" (enterprise, 10000 points)
fn setup() -> (B2BMarket, Arc<PointsLedger>) {
    let feed = ChangeFeed::default();
    let directory = Arc::new(Directory::new());
    let points = Arc::new(PointsLedger::new(feed.clone()));
    for handle in ["green", "acme"] {
        directory
            .register(Account::new(id(handle), handle, "Austin", Role::Enterprise))
            .unwrap();
        points.open_account(&id(handle)).unwrap();
    }
    directory.verify(&id("green")).unwrap();
    points.credit(&id("acme"), 10_000, "topup").unwrap();
    (B2BMarket::new(directory, Arc::clone(&points), feed), points)
}

fn last_year() -> u16 {
    u16::try_from(Utc::now().year() - 1).unwrap()
}

// ============================================================================
// LISTING
// ============================================================================

#[test]
fn test_list_records_seller_verification() {
    let (market, _) = setup();

    let listing = market.list(&id("green"), 100, 12, last_year(), "Mangrove restoration").unwrap();

    assert!(listing.seller_verified());
    assert_eq!(listing.remaining(), 100);
    assert_eq!(listing.status(), CreditListingStatus::Active);
}

#[test]
fn test_list_rejects_bad_input() {
    let (market, _) = setup();
    let next_year = last_year() + 2;

    assert!(matches!(market.list(&id("green"), 0, 12, last_year(), "p"), Err(MarketError::InvalidAmount(_))));
    assert!(matches!(market.list(&id("green"), 10, 0, last_year(), "p"), Err(MarketError::InvalidAmount(_))));
    assert!(matches!(market.list(&id("green"), 10, 12, next_year, "p"), Err(MarketError::InvalidState(_))));
    assert!(market.all().is_empty());
}

// ============================================================================
// BUYING
// ============================================================================

#[test]
fn test_partial_fills_until_exhausted() {
    let (market, points) = setup();
    let listing = market.list(&id("green"), 100, 2, last_year(), "Solar").unwrap();

    let fill = market.buy(&listing.id(), &id("acme"), 40, false).unwrap();
    assert_eq!(fill.listing.remaining(), 60);
    assert_eq!(fill.holding.cost(), 80);

    let over = market.buy(&listing.id(), &id("acme"), 61, false);
    assert!(matches!(over, Err(MarketError::InvalidAmount(_))));
    assert_eq!(market.get(&listing.id()).unwrap().remaining(), 60);

    let last = market.buy(&listing.id(), &id("acme"), 60, true).unwrap();
    assert_eq!(last.listing.remaining(), 0);
    assert_eq!(last.listing.status(), CreditListingStatus::Exhausted);

    assert_eq!(points.balance(&id("green")).unwrap(), 200);
    assert_eq!(points.balance(&id("acme")).unwrap(), 9_800);
    assert!(market.active().is_empty());
}

#[test]
fn test_concurrent_buys_never_oversell() {
    let (market, points) = setup();
    let market = Arc::new(market);
    let listing = market.list(&id("green"), 50, 2, last_year(), "Solar").unwrap();

    let threads: Vec<_> = (0..20)
        .map(|_| {
            let market = Arc::clone(&market);
            let listing_id = listing.id();
            thread::spawn(move || market.buy(&listing_id, &id("acme"), 3, false))
        })
        .collect();

    let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
    let fills = results.iter().filter(|r| r.is_ok()).count() as u64;
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(MarketError::InvalidAmount(_))))
        .count() as u64;

    // 16 × 3 = 48 fits in 50, the 17th would not
    assert_eq!(fills, 16);
    assert_eq!(refused, 4);
    assert!(fills * 3 <= 50);
    assert_eq!(market.get(&listing.id()).unwrap().remaining(), 2);
    assert_eq!(points.balance(&id("green")).unwrap(), 96);
    assert_eq!(points.balance(&id("acme")).unwrap(), 10_000 - 96);
    assert_eq!(market.portfolio(&id("acme")).active, 48);
}

#[test]
fn test_exhausted_listing_refuses_more() {
    let (market, _) = setup();
    let listing = market.list(&id("green"), 5, 1, last_year(), "Solar").unwrap();
    market.buy(&listing.id(), &id("acme"), 5, false).unwrap();

    assert!(market.buy(&listing.id(), &id("acme"), 1, false).is_err());
}

#[test]
fn test_buy_without_funds_changes_nothing() {
    let (market, points) = setup();
    let listing = market.list(&id("green"), 100, 500, last_year(), "Forest").unwrap();

    let result = market.buy(&listing.id(), &id("acme"), 21, false);

    assert!(matches!(result, Err(MarketError::InsufficientFunds { .. })));
    assert_eq!(market.get(&listing.id()).unwrap().remaining(), 100);
    assert!(market.holdings(&id("acme")).is_empty());
    assert_eq!(points.balance(&id("green")).unwrap(), 0);
}

#[test]
fn test_seller_cannot_buy_own_listing() {
    let (market, points) = setup();
    points.credit(&id("green"), 100, "topup").unwrap();
    let listing = market.list(&id("green"), 10, 1, last_year(), "Solar").unwrap();

    assert!(matches!(
        market.buy(&listing.id(), &id("green"), 1, false),
        Err(MarketError::InvalidState(_))
    ));
}

#[test]
fn test_buy_unknown_listing() {
    let (market, _) = setup();

    assert!(matches!(
        market.buy(&CreditListingId::generate(), &id("acme"), 1, false),
        Err(MarketError::CreditListingNotFound(_))
    ));
}

#[test]
fn test_portfolio_splits_active_and_retired() {
    let (market, _) = setup();
    let listing = market.list(&id("green"), 100, 3, last_year(), "Wind").unwrap();
    market.buy(&listing.id(), &id("acme"), 30, false).unwrap();
    market.buy(&listing.id(), &id("acme"), 20, true).unwrap();

    let portfolio = market.portfolio(&id("acme"));

    assert_eq!(portfolio.active, 30);
    assert_eq!(portfolio.retired, 20);
    assert_eq!(portfolio.spent, 150);
    assert_eq!(portfolio.total(), 50);
    assert_eq!(portfolio.holdings.len(), 2);
}

// ============================================================================
// WITHDRAWAL AND ORDERING
// ============================================================================

#[test]
fn test_withdraw_by_seller_only() {
    let (market, _) = setup();
    let listing = market.list(&id("green"), 10, 1, last_year(), "Solar").unwrap();

    assert!(matches!(
        market.withdraw(&listing.id(), &id("acme")),
        Err(MarketError::Unauthorized(_))
    ));
    market.withdraw(&listing.id(), &id("green")).unwrap();
    assert!(matches!(
        market.get(&listing.id()),
        Err(MarketError::CreditListingNotFound(_))
    ));
}

#[test]
fn test_active_listings_cheapest_first() {
    let (market, _) = setup();
    market.list(&id("green"), 10, 9, last_year(), "Pricey").unwrap();
    market.list(&id("green"), 10, 3, last_year(), "Cheap").unwrap();
    market.list(&id("green"), 10, 5, last_year(), "Middle").unwrap();

    let prices: Vec<u64> = market.active().iter().map(|l| l.price_per_unit()).collect();
    assert_eq!(prices, vec![3, 5, 9]);
}
