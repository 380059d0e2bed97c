// Points ledger - per-account append-only credit log
//
// Each account owns one book behind its own mutex: writes to one account are
// strictly ordered, writes to different accounts never contend. Two-party
// movements lock both books in handle order so neither side is ever visible
// without the other.

use crate::error::{MarketError, MarketResult};
use crate::feed::{ChangeEvent, ChangeFeed, Collection};
use crate::identity::AccountId;
use crate::points::entry::{EntryKind, PointsEntry};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// One account's history plus its running balance
#[derive(Debug, Default)]
struct AccountBook {
    entries: Vec<PointsEntry>,
    balance: u64,
}

impl AccountBook {
    fn from_entries(entries: Vec<PointsEntry>) -> MarketResult<Self> {
        let mut book = Self::default();
        for entry in entries {
            book.apply(entry)?;
        }
        Ok(book)
    }

    fn apply(&mut self, entry: PointsEntry) -> MarketResult<()> {
        self.balance = match entry.kind() {
            EntryKind::Earned => self
                .balance
                .checked_add(entry.amount())
                .ok_or_else(|| MarketError::invalid_amount("balance would overflow"))?,
            EntryKind::Redeemed => self.balance.checked_sub(entry.amount()).ok_or(
                MarketError::InsufficientFunds {
                    available: self.balance,
                    required: entry.amount(),
                },
            )?,
        };
        self.entries.push(entry);
        Ok(())
    }

    fn can_credit(&self, amount: u64) -> MarketResult<()> {
        self.balance
            .checked_add(amount)
            .map(|_| ())
            .ok_or_else(|| MarketError::invalid_amount("balance would overflow"))
    }
}

/// The credit ledger for every account
#[derive(Debug)]
pub struct PointsLedger {
    books: DashMap<AccountId, Arc<Mutex<AccountBook>>>,
    feed: ChangeFeed,
}

impl PointsLedger {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            books: DashMap::new(),
            feed,
        }
    }

    /// Open an empty book for an account
    pub fn open_account(&self, account: &AccountId) -> MarketResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.books.entry(account.clone()) {
            Entry::Occupied(_) => Err(MarketError::DuplicateAccount(account.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(AccountBook::default())));
                Ok(())
            }
        }
    }

    /// Rebuild a book from persisted entries
    pub fn restore_account(&self, account: &AccountId, entries: Vec<PointsEntry>) -> MarketResult<()> {
        if entries.iter().any(|e| e.account() != account) {
            return Err(MarketError::invalid_state(format!(
                "entries for another account found in the book of {}",
                account
            )));
        }
        let book = AccountBook::from_entries(entries)?;
        self.books.insert(account.clone(), Arc::new(Mutex::new(book)));
        Ok(())
    }

    pub fn has_account(&self, account: &AccountId) -> bool {
        self.books.contains_key(account)
    }

    fn book(&self, account: &AccountId) -> MarketResult<Arc<Mutex<AccountBook>>> {
        self.books
            .get(account)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| MarketError::AccountNotFound(account.to_string()))
    }

    fn notify(&self, account: &AccountId) {
        self.feed
            .publish(ChangeEvent::scoped(Collection::Points, account.as_str()));
    }

    // ========================================================================
    // SINGLE-ACCOUNT OPERATIONS
    // ========================================================================

    /// Append an `earned` entry
    pub fn credit(&self, account: &AccountId, amount: u64, description: &str) -> MarketResult<PointsEntry> {
        if amount == 0 {
            return Err(MarketError::invalid_amount("credit amount must be positive"));
        }
        let book = self.book(account)?;
        let entry = PointsEntry::new(account.clone(), amount, EntryKind::Earned, description, Utc::now());
        {
            let mut book = book.lock();
            book.apply(entry.clone())?;
            info!(account = %account, amount, balance = book.balance, "points credited");
        }
        self.notify(account);
        Ok(entry)
    }

    /// Append a `redeemed` entry if the balance covers it.
    ///
    /// Returns `Ok(false)` without touching the log when funds are short.
    pub fn debit(&self, account: &AccountId, amount: u64, description: &str) -> MarketResult<bool> {
        if amount == 0 {
            return Err(MarketError::invalid_amount("debit amount must be positive"));
        }
        let book = self.book(account)?;
        {
            let mut book = book.lock();
            if amount > book.balance {
                debug!(account = %account, amount, balance = book.balance, "debit declined");
                return Ok(false);
            }
            let entry = PointsEntry::new(account.clone(), amount, EntryKind::Redeemed, description, Utc::now());
            book.apply(entry)?;
            info!(account = %account, amount, balance = book.balance, "points debited");
        }
        self.notify(account);
        Ok(true)
    }

    // ========================================================================
    // TWO-ACCOUNT OPERATIONS
    // ========================================================================

    fn with_pair<R>(
        &self,
        a: &AccountId,
        b: &AccountId,
        f: impl FnOnce(&mut AccountBook, &mut AccountBook) -> MarketResult<R>,
    ) -> MarketResult<R> {
        if a == b {
            return Err(MarketError::invalid_state("both sides of a movement are the same account"));
        }
        let book_a = self.book(a)?;
        let book_b = self.book(b)?;
        let result = if a < b {
            let mut guard_a = book_a.lock();
            let mut guard_b = book_b.lock();
            f(&mut guard_a, &mut guard_b)
        } else {
            let mut guard_b = book_b.lock();
            let mut guard_a = book_a.lock();
            f(&mut guard_a, &mut guard_b)
        };
        let result = result?;
        self.notify(a);
        self.notify(b);
        Ok(result)
    }

    /// Move credit from one account to another: both entries or neither.
    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
        description: &str,
    ) -> MarketResult<()> {
        if amount == 0 {
            return Err(MarketError::invalid_amount("transfer amount must be positive"));
        }
        self.with_pair(from, to, |payer, payee| {
            if amount > payer.balance {
                return Err(MarketError::InsufficientFunds {
                    available: payer.balance,
                    required: amount,
                });
            }
            payee.can_credit(amount)?;
            let now = Utc::now();
            payer.apply(PointsEntry::new(from.clone(), amount, EntryKind::Redeemed, description, now))?;
            payee.apply(PointsEntry::new(to.clone(), amount, EntryKind::Earned, description, now))?;
            info!(from = %from, to = %to, amount, "points transferred");
            Ok(())
        })
    }

    /// Credit two accounts the same amount in one step
    pub fn credit_both(
        &self,
        first: (&AccountId, &str),
        second: (&AccountId, &str),
        amount: u64,
    ) -> MarketResult<()> {
        if amount == 0 {
            return Err(MarketError::invalid_amount("credit amount must be positive"));
        }
        let (first_id, first_desc) = first;
        let (second_id, second_desc) = second;
        self.with_pair(first_id, second_id, |a, b| {
            a.can_credit(amount)?;
            b.can_credit(amount)?;
            let now = Utc::now();
            a.apply(PointsEntry::new(first_id.clone(), amount, EntryKind::Earned, first_desc, now))?;
            b.apply(PointsEntry::new(second_id.clone(), amount, EntryKind::Earned, second_desc, now))?;
            info!(first = %first_id, second = %second_id, amount, "points credited to both parties");
            Ok(())
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Current balance
    pub fn balance(&self, account: &AccountId) -> MarketResult<u64> {
        Ok(self.book(account)?.lock().balance)
    }

    /// Balance as of a point in time: the signed sum of entries dated at or before it
    pub fn balance_at(&self, account: &AccountId, at: DateTime<Utc>) -> MarketResult<i128> {
        let book = self.book(account)?;
        let book = book.lock();
        Ok(book
            .entries
            .iter()
            .filter(|e| e.timestamp() <= at)
            .map(PointsEntry::signed_amount)
            .sum())
    }

    /// Full history, oldest first
    pub fn entries(&self, account: &AccountId) -> MarketResult<Vec<PointsEntry>> {
        Ok(self.book(account)?.lock().entries.clone())
    }

    /// Recompute the balance from the log and compare with the running total
    pub fn verify_balance(&self, account: &AccountId) -> MarketResult<bool> {
        let book = self.book(account)?;
        let book = book.lock();
        let recomputed: i128 = book.entries.iter().map(PointsEntry::signed_amount).sum();
        Ok(recomputed == i128::from(book.balance))
    }

    /// Every account's history (for snapshots)
    pub fn export(&self) -> Vec<(AccountId, Vec<PointsEntry>)> {
        let handles: Vec<(AccountId, Arc<Mutex<AccountBook>>)> = self
            .books
            .iter()
            .map(|b| (b.key().clone(), Arc::clone(b.value())))
            .collect();
        let mut out: Vec<(AccountId, Vec<PointsEntry>)> = handles
            .into_iter()
            .map(|(id, book)| (id, book.lock().entries.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl Default for PointsLedger {
    fn default() -> Self {
        Self::new(ChangeFeed::default())
    }
}
