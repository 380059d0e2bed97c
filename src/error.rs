// Marketplace error taxonomy
//
// Every state-mutating operation in the core returns one of these. External
// collaborators (estimation, address lookup) never surface here; they degrade
// to empty results instead.

use thiserror::Error;

/// Errors returned by marketplace core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Claim code not found")]
    CodeNotFound,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    #[error("Trade offer not found: {0}")]
    OfferNotFound(String),

    #[error("Credit listing not found: {0}")]
    CreditListingNotFound(String),
}

impl MarketError {
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        MarketError::InvalidState(msg.into())
    }

    pub(crate) fn unauthorized(msg: impl Into<String>) -> Self {
        MarketError::Unauthorized(msg.into())
    }

    pub(crate) fn invalid_amount(msg: impl Into<String>) -> Self {
        MarketError::InvalidAmount(msg.into())
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::InvalidState(_) => "invalid_state",
            MarketError::Unauthorized(_) => "unauthorized",
            MarketError::InvalidAmount(_) => "invalid_amount",
            MarketError::InsufficientFunds { .. } => "insufficient_funds",
            MarketError::CodeNotFound => "code_not_found",
            MarketError::AccountNotFound(_)
            | MarketError::ListingNotFound(_)
            | MarketError::OfferNotFound(_)
            | MarketError::CreditListingNotFound(_) => "not_found",
            MarketError::DuplicateAccount(_) => "duplicate",
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
