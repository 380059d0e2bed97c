// Identity module - Accounts, roles and session context

mod account;
mod session;

pub use account::{Account, AccountId, Directory, Role, DEFAULT_RATING};
pub use session::Session;
