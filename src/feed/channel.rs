// Change feed - broadcast invalidations, filtered per session

use crate::identity::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

/// A collection a session can follow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Accounts,
    Points,
    Listings,
    Chats,
    Offers,
    Bids,
    CreditMarket,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Accounts => "accounts",
            Collection::Points => "points",
            Collection::Listings => "listings",
            Collection::Chats => "chats",
            Collection::Offers => "offers",
            Collection::Bids => "bids",
            Collection::CreditMarket => "credit_market",
        };
        f.write_str(name)
    }
}

/// "Something in this collection changed; re-read it"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    collection: Collection,
    /// Optional narrowing: a region for offers, an account for points and bids
    scope: Option<String>,
    at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            scope: None,
            at: Utc::now(),
        }
    }

    pub fn scoped(collection: Collection, scope: impl Into<String>) -> Self {
        Self {
            collection,
            scope: Some(scope.into()),
            at: Utc::now(),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Whether a session should be told about this event
    pub fn visible_to(&self, session: &Session) -> bool {
        if !session.may_follow(self.collection) {
            return false;
        }
        match (self.collection, self.scope.as_deref()) {
            (_, None) => true,
            (Collection::Offers, Some(region)) => region == session.region(),
            (Collection::Points | Collection::Bids, Some(account)) => {
                account == session.account_id().as_str()
            }
            _ => true,
        }
    }
}

/// Publisher side of the change channel
#[derive(Clone, Debug)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        debug!(collection = %event.collection(), scope = ?event.scope(), "change published");
        let _ = self.sender.send(event);
    }

    /// Follow the feed as a given session
    pub fn subscribe(&self, session: Session) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            session,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Receiver side, filtered to what the session may see
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    session: Session,
}

impl Subscription {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Wait for the next visible event. Returns None once the feed is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.visible_to(&self.session) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(account = %self.session.account_id(), skipped, "subscriber lagged, resuming");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next visible event already queued, without waiting
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.visible_to(&self.session) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything currently queued
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }
}
