//! Fund pool: several account balances treated as one virtual pool.
//!
//! The ledger maps each participating account to the amount it contributes.
//! Withdrawals debit accounts in ledger order, each by
//! `min(remaining, balance)`, carrying an explicit running remainder so the
//! debits always sum to exactly the requested amount.
//!
//! # Invariants
//!
//! 1. Every ledger amount is non-negative.
//! 2. A withdrawal either debits exactly the requested amount or changes
//!    nothing. Partial withdrawals are never observable.
//! 3. Check-total-then-debit is one critical section. Two concurrent
//!    requests can never both see sufficient funds and together overdraw.
//!
//! The ledger lock is synchronous and is never held across an `.await`.

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

use upfs_types::{Account, Money};

/// Pool errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Negative request (or non-positive deposit).
    #[error("invalid amount: {0}")]
    InvalidAmount(Money),

    /// The pool holds less than was requested. Nothing was debited.
    #[error("insufficient funds: requested {requested}, available {available}")]
    Insufficient { requested: Money, available: Money },

    /// Ledger arithmetic disagreed with itself. The ledger was rolled back.
    #[error("ledger drift: {0}")]
    LedgerDrift(String),
}

/// One participating account and its share of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub account: String,
    pub amount: Money,
}

/// The accounts debited by one withdrawal, in debit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Withdrawal {
    pub debits: Vec<(String, Money)>,
}

impl Withdrawal {
    pub fn total(&self) -> Money {
        Money(self.debits.iter().map(|(_, m)| m.minor()).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.debits.is_empty()
    }

    /// One `"{account} {amount}\n"` line per debit.
    pub fn render(&self) -> String {
        self.debits
            .iter()
            .map(|(account, amount)| format!("{} {}\n", account, amount))
            .collect()
    }
}

/// Lock-guarded pool ledger.
#[derive(Debug, Default)]
pub struct FundPool {
    ledger: Mutex<Vec<LedgerEntry>>,
}

impl FundPool {
    /// Build a pool from `(account, amount)` pairs, in iteration order.
    ///
    /// Negative amounts are clamped to zero.
    pub fn new<S: Into<String>>(entries: impl IntoIterator<Item = (S, Money)>) -> Self {
        let ledger = entries
            .into_iter()
            .map(|(account, amount)| LedgerEntry {
                account: account.into(),
                amount: Money(amount.minor().max(0)),
            })
            .collect();
        Self {
            ledger: Mutex::new(ledger),
        }
    }

    /// Seed the pool from live account balances.
    pub fn from_accounts<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        Self::new(accounts.into_iter().map(|a| (a.id.clone(), a.balance)))
    }

    /// Current pool total.
    pub fn total(&self) -> Money {
        total_of(&self.ledger.lock())
    }

    /// Copy of the ledger, in order.
    pub fn snapshot(&self) -> Vec<LedgerEntry> {
        self.ledger.lock().clone()
    }

    /// Whether `account` participates in the pool.
    pub fn contains(&self, account: &str) -> bool {
        self.ledger.lock().iter().any(|e| e.account == account)
    }

    /// Withdraw `amount` from the pool.
    ///
    /// A zero request succeeds with no debits. A request above the pool
    /// total is rejected before any entry is touched.
    pub fn withdraw(&self, amount: Money) -> Result<Withdrawal, PoolError> {
        if amount.minor() < 0 {
            return Err(PoolError::InvalidAmount(amount));
        }
        if amount.minor() == 0 {
            return Ok(Withdrawal::default());
        }

        let mut ledger = self.ledger.lock();
        let available = total_of(&ledger);
        if available < amount {
            return Err(PoolError::Insufficient {
                requested: amount,
                available,
            });
        }

        let before = ledger.clone();
        let mut remaining = amount.minor();
        let mut withdrawal = Withdrawal::default();
        for entry in ledger.iter_mut() {
            if remaining == 0 {
                break;
            }
            let debit = remaining.min(entry.amount.minor());
            if debit > 0 {
                entry.amount = Money(entry.amount.minor() - debit);
                withdrawal.debits.push((entry.account.clone(), Money(debit)));
            }
            remaining -= debit;
        }

        let after = total_of(&ledger);
        let drift = if remaining != 0 || withdrawal.total() != amount {
            Some(format!("debited {} of {}", withdrawal.total(), amount))
        } else if available.minor() - after.minor() != amount.minor() {
            Some(format!("pool moved from {} to {} for {}", available, after, amount))
        } else if ledger.iter().any(|e| e.amount.minor() < 0) {
            Some("negative ledger entry".to_string())
        } else {
            None
        };
        if let Some(msg) = drift {
            *ledger = before;
            error!("fund pool rolled back: {}", msg);
            return Err(PoolError::LedgerDrift(msg));
        }

        info!(amount = %amount, debits = withdrawal.debits.len(), "pool withdrawal");
        Ok(withdrawal)
    }

    /// Return `amount` to `account`, adding the account if it is new.
    pub fn deposit(&self, account: &str, amount: Money) -> Result<(), PoolError> {
        if !amount.is_positive() {
            return Err(PoolError::InvalidAmount(amount));
        }
        let mut ledger = self.ledger.lock();
        match ledger.iter_mut().find(|e| e.account == account) {
            Some(entry) => {
                entry.amount = Money(entry.amount.minor().saturating_add(amount.minor()))
            }
            None => ledger.push(LedgerEntry {
                account: account.to_string(),
                amount,
            }),
        }
        Ok(())
    }
}

fn total_of(ledger: &[LedgerEntry]) -> Money {
    let sum: i128 = ledger.iter().map(|e| i128::from(e.amount.minor())).sum();
    Money(i64::try_from(sum).unwrap_or(i64::MAX))
}
