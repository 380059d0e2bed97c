// Points entries - immutable records in an account's append-only log

use crate::identity::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a points entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Credit added to the account
    Earned,
    /// Credit spent from the account
    Redeemed,
}

/// One line of an account's points history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    account: AccountId,
    amount: u64,
    kind: EntryKind,
    description: String,
    timestamp: DateTime<Utc>,
}

impl PointsEntry {
    pub(crate) fn new(
        account: AccountId,
        amount: u64,
        kind: EntryKind,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            account,
            amount,
            kind,
            description: description.into(),
            timestamp,
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Unsigned magnitude
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Amount signed by kind: positive when earned, negative when redeemed
    pub fn signed_amount(&self) -> i128 {
        match self.kind {
            EntryKind::Earned => i128::from(self.amount),
            EntryKind::Redeemed => -i128::from(self.amount),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
