// Session - the explicit, per-caller context handed to every operation
//
// Which live collections a caller may follow is decided once, here, from the
// account's role.

use crate::feed::Collection;
use crate::identity::{Account, AccountId, Role};
use crate::error::{MarketError, MarketResult};

/// An authenticated caller
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    account_id: AccountId,
    role: Role,
    region: String,
}

impl Session {
    /// Start a session for an account
    pub fn start(account: &Account) -> Self {
        Self {
            account_id: account.id().clone(),
            role: account.role(),
            region: account.region().to_string(),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn is_enterprise(&self) -> bool {
        self.role == Role::Enterprise
    }

    /// Fail unless the caller is an enterprise
    pub fn require_enterprise(&self, operation: &str) -> MarketResult<()> {
        if self.is_enterprise() {
            Ok(())
        } else {
            Err(MarketError::unauthorized(format!(
                "{} requires an enterprise account",
                operation
            )))
        }
    }

    /// Collections this session is allowed to follow
    pub fn subscriptions(&self) -> Vec<Collection> {
        let mut collections = vec![Collection::Listings, Collection::Chats, Collection::Points];
        match self.role {
            Role::Enterprise => {
                collections.push(Collection::CreditMarket);
                collections.push(Collection::Accounts);
                collections.push(Collection::Bids);
            }
            Role::Individual => {
                collections.push(Collection::Offers);
            }
        }
        collections
    }

    pub fn may_follow(&self, collection: Collection) -> bool {
        self.subscriptions().contains(&collection)
    }
}
