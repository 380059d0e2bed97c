// Market module - B2B carbon credit listings, fills and retirement

mod exchange;
mod listing;

pub use exchange::{B2BMarket, Fill};
pub use listing::{B2BListing, CreditHolding, CreditListingId, CreditListingStatus, Portfolio};
