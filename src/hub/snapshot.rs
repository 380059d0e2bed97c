// Marketplace snapshot - the whole state in one serializable value

use crate::identity::{Account, AccountId};
use crate::listing::{ChatMessage, Listing, ListingId};
use crate::market::{B2BListing, CreditHolding};
use crate::points::PointsEntry;
use crate::trade::TradeOffer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped whenever the snapshot layout changes
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

/// Everything needed to rebuild a `Marketplace`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub version: u32,
    pub accounts: Vec<Account>,
    pub ledgers: Vec<(AccountId, Vec<PointsEntry>)>,
    pub listings: Vec<Listing>,
    pub chats: Vec<(ListingId, Vec<ChatMessage>)>,
    pub offers: Vec<TradeOffer>,
    pub credit_listings: Vec<B2BListing>,
    pub holdings: Vec<(AccountId, Vec<CreditHolding>)>,
}

impl MarketSnapshot {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: MarketSnapshot =
            postcard::from_bytes(bytes).map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}
