// Trade module - enterprise ↔ individual handshake protocol

mod negotiator;
mod offer;

pub use negotiator::TradeOfferNegotiator;
pub use offer::{OfferId, OfferStatus, TradeOffer};
