// Points module - the credit ledger every settlement runs through

mod entry;
mod ledger;
mod payout;

pub use entry::{EntryKind, PointsEntry};
pub use ledger::PointsLedger;
pub use payout::Payout;
