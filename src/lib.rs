// Replate - surplus-food exchange and carbon-credit marketplace core
//
// Givers list surplus food, receivers claim it with a pickup code, and both
// sides earn points once the handoff is verified. Enterprises buy those points
// from individuals through trade offers and trade credits on a B2B market.

pub mod config;
pub mod error;
mod ids;

pub mod identity;
pub mod feed;
pub mod points;
pub mod pickup;
pub mod listing;
pub mod trade;
pub mod market;
pub mod services;
pub mod storage;
pub mod hub;

pub use config::MarketConfig;
pub use error::{MarketError, MarketResult};
pub use hub::{MarketSnapshot, Marketplace};
pub use identity::{Account, AccountId, Role, Session};
