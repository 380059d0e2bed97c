// Feed module - change notification for live views
//
// Mutations publish a small invalidation event; readers re-read whatever
// snapshot they display. No diffs travel over the channel.

mod channel;

pub use channel::{ChangeEvent, ChangeFeed, Collection, Subscription};
