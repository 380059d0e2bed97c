// Listing module - food listings, handoff codes and per-listing chat

mod carbon;
mod chat;
mod ledger;
mod model;
mod verifier;

pub use carbon::{carbon_saved, waste_baseline};
pub use chat::{ChatBoard, ChatMessage};
pub use ledger::{Completion, ListingLedger};
pub use model::{ClaimCode, Listing, ListingDetails, ListingId, ListingStatus};
pub use verifier::ClaimVerifier;
