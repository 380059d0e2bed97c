// Hub module - the session-driven operation surface and its snapshot form

mod marketplace;
mod snapshot;

pub use marketplace::Marketplace;
pub use snapshot::{MarketSnapshot, SnapshotError, SNAPSHOT_VERSION};
