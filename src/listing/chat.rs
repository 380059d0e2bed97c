// Chat threads - one append-only conversation per listing

use crate::identity::AccountId;
use crate::listing::ListingId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A single chat line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    sender: AccountId,
    text: String,
    timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: AccountId, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn sender(&self) -> &AccountId {
        &self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// All threads, created lazily on first message
#[derive(Debug, Default)]
pub struct ChatBoard {
    threads: DashMap<ListingId, Vec<ChatMessage>>,
}

impl ChatBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&self, listing: ListingId, message: ChatMessage) {
        self.threads.entry(listing).or_default().push(message);
    }

    /// Messages for a listing, oldest first. Empty when nobody has written yet.
    pub fn thread(&self, listing: &ListingId) -> Vec<ChatMessage> {
        self.threads
            .get(listing)
            .map(|t| t.value().clone())
            .unwrap_or_default()
    }

    pub fn has_thread(&self, listing: &ListingId) -> bool {
        self.threads.contains_key(listing)
    }

    pub(crate) fn drop_thread(&self, listing: &ListingId) {
        self.threads.remove(listing);
    }

    pub(crate) fn restore(&self, listing: ListingId, messages: Vec<ChatMessage>) {
        self.threads.insert(listing, messages);
    }

    pub fn export(&self) -> Vec<(ListingId, Vec<ChatMessage>)> {
        let mut threads: Vec<(ListingId, Vec<ChatMessage>)> = self
            .threads
            .iter()
            .map(|t| (*t.key(), t.value().clone()))
            .collect();
        threads.sort_by(|a, b| a.0.cmp(&b.0));
        threads
    }
}
