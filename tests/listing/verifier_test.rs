// Claim Verifier Tests
// Tests for handoff code issue, lookup and release

use replate::listing::{ClaimCode, ClaimVerifier, ListingId};
use replate::MarketConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

// ============================================================================
// ISSUE AND LOOKUP
// ============================================================================

#[test]
fn test_issued_code_maps_to_listing() {
    let verifier = ClaimVerifier::new(&MarketConfig::default());
    let listing = ListingId::generate();

    let code = verifier.issue(listing).unwrap();

    assert_eq!(verifier.lookup(code), Some(listing));
    assert_eq!(verifier.live_count(), 1);
}

#[test]
fn test_released_code_no_longer_matches() {
    let verifier = ClaimVerifier::new(&MarketConfig::default());
    let code = verifier.issue(ListingId::generate()).unwrap();

    verifier.release(code);

    assert_eq!(verifier.lookup(code), None);
    assert_eq!(verifier.live_count(), 0);
}

#[test]
fn test_never_issued_code_misses() {
    let config = MarketConfig::default().with_claim_code_range(5000, 5000);
    let verifier = ClaimVerifier::new(&config);
    verifier.issue(ListingId::generate()).unwrap();

    assert_eq!(verifier.lookup(ClaimCode::new(4999)), None);
}

#[test]
fn test_single_code_pool_exhausts() {
    let config = MarketConfig::default().with_claim_code_range(4242, 4242);
    let verifier = ClaimVerifier::new(&config);

    assert_eq!(verifier.issue(ListingId::generate()).unwrap(), ClaimCode::new(4242));
    assert!(verifier.issue(ListingId::generate()).is_err());
}

// ============================================================================
// CODE FORMAT
// ============================================================================

#[test]
fn test_code_display_is_four_digits() {
    assert_eq!(ClaimCode::new(42).to_string(), "0042");
    assert_eq!(ClaimCode::new(4821).to_string(), "4821");
}

#[test]
fn test_code_parse() {
    assert_eq!(" 4821 ".parse::<ClaimCode>().unwrap(), ClaimCode::new(4821));
    assert!("48a1".parse::<ClaimCode>().is_err());
    assert!("".parse::<ClaimCode>().is_err());
    assert!("99999999".parse::<ClaimCode>().is_err());
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_issue_never_duplicates() {
    let config = MarketConfig::default().with_claim_code_range(1000, 1199);
    let verifier = Arc::new(ClaimVerifier::new(&config));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            thread::spawn(move || {
                (0..50)
                    .map(|_| verifier.issue(ListingId::generate()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for code in handle.join().unwrap() {
            assert!(seen.insert(code), "duplicate code {}", code);
        }
    }
    assert_eq!(seen.len(), 200);
    assert_eq!(verifier.live_count(), 200);
}
