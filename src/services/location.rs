// Address and postal lookup - advisory autofill only

use crate::services::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Shortest query worth sending to the address search
pub const MIN_QUERY_LEN: usize = 3;

/// City / region / country for a postal code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub region: String,
    pub country: String,
}

/// Contract for the lookup service
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Full-address candidates for a partial address
    async fn search(&self, query: &str) -> Result<Vec<String>, ServiceError>;

    /// Place for a 5-digit postal code, `None` when it does not exist
    async fn postal(&self, code: &str) -> Result<Option<Place>, ServiceError>;
}

/// A 5-digit numeric postal code
pub fn is_postal_code(code: &str) -> bool {
    code.len() == 5 && code.chars().all(|c| c.is_ascii_digit())
}

/// Degrading front for any lookup service
pub struct Locator<L: AddressLookup> {
    inner: L,
}

impl<L: AddressLookup> Locator<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    /// Suggestions, empty for short queries or on failure
    pub async fn suggest(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        match self.inner.search(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(query, error = %e, "address search failed");
                Vec::new()
            }
        }
    }

    /// Place for a postal code, `None` when malformed, unknown or on failure
    pub async fn resolve_postal(&self, code: &str) -> Option<Place> {
        let code = code.trim();
        if !is_postal_code(code) {
            return None;
        }
        match self.inner.postal(code).await {
            Ok(place) => place,
            Err(e) => {
                warn!(code, error = %e, "postal lookup failed");
                None
            }
        }
    }
}

/// Lookup answering from an in-memory gazetteer
#[derive(Clone, Debug, Default)]
pub struct StaticGazetteer {
    addresses: Vec<String>,
    postal: HashMap<String, Place>,
}

impl StaticGazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    pub fn with_postal(mut self, code: &str, place: Place) -> Self {
        self.postal.insert(code.to_string(), place);
        self
    }
}

#[async_trait]
impl AddressLookup for StaticGazetteer {
    async fn search(&self, query: &str) -> Result<Vec<String>, ServiceError> {
        let needle = query.to_lowercase();
        Ok(self
            .addresses
            .iter()
            .filter(|a| a.to_lowercase().contains(&needle))
            .take(5)
            .cloned()
            .collect())
    }

    async fn postal(&self, code: &str) -> Result<Option<Place>, ServiceError> {
        Ok(self.postal.get(code).cloned())
    }
}

/// Lookup that is never reachable
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineGazetteer;

#[async_trait]
impl AddressLookup for OfflineGazetteer {
    async fn search(&self, _query: &str) -> Result<Vec<String>, ServiceError> {
        Err(ServiceError::Unavailable("address search offline".to_string()))
    }

    async fn postal(&self, _code: &str) -> Result<Option<Place>, ServiceError> {
        Err(ServiceError::Unavailable("postal lookup offline".to_string()))
    }
}
