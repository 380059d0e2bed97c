// Claim verifier - issues and matches handoff codes
//
// A code is a low-friction shared secret, not a signature. Codes are unique
// among live claims, so a match always names exactly one listing; once a
// listing completes or disappears its code goes back into the pool.

use crate::config::MarketConfig;
use crate::error::{MarketError, MarketResult};
use crate::listing::model::{ClaimCode, ListingId};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// Index of live claim codes
#[derive(Debug)]
pub struct ClaimVerifier {
    live: Mutex<HashMap<ClaimCode, ListingId>>,
    range: RangeInclusive<u16>,
    attempts: usize,
}

impl ClaimVerifier {
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            live: Mutex::new(HashMap::new()),
            range: config.claim_code_range(),
            attempts: config.claim_code_attempts.max(1),
        }
    }

    /// Reserve a fresh code for a listing: uniform draw, retried on collision
    pub fn issue(&self, listing: ListingId) -> MarketResult<ClaimCode> {
        let mut live = self.live.lock();
        let mut rng = rand::thread_rng();

        for _ in 0..self.attempts {
            let code = ClaimCode::new(rng.gen_range(self.range.clone()));
            if !live.contains_key(&code) {
                live.insert(code, listing);
                return Ok(code);
            }
        }

        // Pool nearly exhausted: scan for a free code from a random start
        let (min, max) = (*self.range.start(), *self.range.end());
        let start = rng.gen_range(self.range.clone());
        let free = (start..=max)
            .chain(min..start)
            .map(ClaimCode::new)
            .find(|code| !live.contains_key(code));
        match free {
            Some(code) => {
                debug!(listing_id = %listing, "claim code drawn by scan");
                live.insert(code, listing);
                Ok(code)
            }
            None => {
                warn!(listing_id = %listing, live = live.len(), "claim code pool exhausted");
                Err(MarketError::invalid_state("no claim code available, try again later"))
            }
        }
    }

    /// Which listing a code currently belongs to
    pub fn lookup(&self, code: ClaimCode) -> Option<ListingId> {
        self.live.lock().get(&code).copied()
    }

    /// Return a code to the pool
    pub fn release(&self, code: ClaimCode) {
        self.live.lock().remove(&code);
    }

    /// Re-register a code loaded from storage
    pub(crate) fn restore(&self, code: ClaimCode, listing: ListingId) {
        self.live.lock().insert(code, listing);
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}
