// Accounts - who takes part in the marketplace
//
// An account's balance is NOT stored here: it is the running sum of its
// PointsLedger entries. This record only carries identity, role, region and
// reputation.

use crate::error::{MarketError, MarketResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Default rating for an account nobody has rated yet
pub const DEFAULT_RATING: f64 = 5.0;

/// Account identifier - a user-chosen handle
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Parse a handle. Handles are non-empty and contain no whitespace.
    pub fn new(handle: impl Into<String>) -> MarketResult<Self> {
        let handle = handle.into();
        let trimmed = handle.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(MarketError::invalid_state(format!(
                "account handle must be a single non-empty word, got '{}'",
                handle
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Individual,
    Enterprise,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Individual => f.write_str("individual"),
            Role::Enterprise => f.write_str("enterprise"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" | "user" => Ok(Role::Individual),
            "enterprise" => Ok(Role::Enterprise),
            other => Err(MarketError::invalid_state(format!("unknown role '{}'", other))),
        }
    }
}

/// A marketplace participant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    name: String,
    region: String,
    role: Role,
    rating: f64,
    rating_count: u32,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh, unrated, unverified account
    pub fn new(id: AccountId, name: impl Into<String>, region: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            region: region.into(),
            role,
            rating: DEFAULT_RATING,
            rating_count: 0,
            verified: false,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn rating_count(&self) -> u32 {
        self.rating_count
    }

    /// KYC flag; only ever true for enterprises
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_enterprise(&self) -> bool {
        self.role == Role::Enterprise
    }

    /// Fold one rating (1..=5 stars) into the count-weighted average
    pub fn apply_rating(&mut self, stars: u8) -> MarketResult<f64> {
        if !(1..=5).contains(&stars) {
            return Err(MarketError::invalid_amount(format!(
                "rating must be between 1 and 5, got {}",
                stars
            )));
        }
        let count = f64::from(self.rating_count);
        self.rating = (self.rating * count + f64::from(stars)) / (count + 1.0);
        self.rating_count += 1;
        Ok(self.rating)
    }
}

/// Registry of all accounts, keyed by handle
#[derive(Debug, Default)]
pub struct Directory {
    accounts: DashMap<AccountId, Account>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account. Handles are unique.
    pub fn register(&self, account: Account) -> MarketResult<Account> {
        use dashmap::mapref::entry::Entry;

        match self.accounts.entry(account.id().clone()) {
            Entry::Occupied(_) => Err(MarketError::DuplicateAccount(account.id().to_string())),
            Entry::Vacant(slot) => {
                info!(account = %account.id(), role = %account.role(), "account registered");
                slot.insert(account.clone());
                Ok(account)
            }
        }
    }

    /// Look up an account
    pub fn get(&self, id: &AccountId) -> MarketResult<Account> {
        self.accounts
            .get(id)
            .map(|a| a.clone())
            .ok_or_else(|| MarketError::AccountNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    /// Rate an account
    pub fn rate(&self, id: &AccountId, stars: u8) -> MarketResult<f64> {
        let mut account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| MarketError::AccountNotFound(id.to_string()))?;
        let rating = account.apply_rating(stars)?;
        info!(account = %id, stars, rating, "rating recorded");
        Ok(rating)
    }

    /// Mark an enterprise as KYC-verified
    pub fn verify(&self, id: &AccountId) -> MarketResult<()> {
        let mut account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| MarketError::AccountNotFound(id.to_string()))?;
        if !account.is_enterprise() {
            return Err(MarketError::invalid_state("only enterprise accounts carry verification"));
        }
        account.verified = true;
        info!(account = %id, "enterprise verified");
        Ok(())
    }

    /// All accounts, sorted by handle
    pub fn all(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.iter().map(|a| a.value().clone()).collect();
        accounts.sort_by(|a, b| a.id().cmp(b.id()));
        accounts
    }

    /// Individual accounts only (the community roster enterprises aggregate over)
    pub fn individuals(&self) -> Vec<Account> {
        self.all()
            .into_iter()
            .filter(|a| a.role() == Role::Individual)
            .collect()
    }

    pub(crate) fn restore(&self, account: Account) {
        self.accounts.insert(account.id().clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
