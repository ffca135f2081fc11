//! In-memory account source.
//!
//! Used for testing and for `upfs --demo`. Pages are cut from a sorted
//! in-memory history, fetches are counted, and failures can be injected on
//! a specific page.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::{Mutex, RwLock};

use upfs_types::{Account, AccountKind, Money, Status, Transaction};

use super::{AccountSource, PageCursor, RemoteError, RemoteResult, TransactionPage};

const DEFAULT_PAGE_SIZE: usize = 20;

/// In-memory [`AccountSource`].
#[derive(Debug)]
pub struct MemorySource {
    accounts: RwLock<Vec<Account>>,
    /// Per-account history, newest first.
    history: RwLock<HashMap<String, Vec<Transaction>>>,
    page_size: usize,
    page_fetches: AtomicUsize,
    /// (account, page index) -> remaining injected failures.
    failures: Mutex<HashMap<(String, usize), usize>>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            history: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            page_fetches: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Set the number of transactions per page (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn add_account(&self, account: Account) {
        self.history.write().entry(account.id.clone()).or_default();
        self.accounts.write().push(account);
    }

    /// Add a transaction, keeping the owning account's history newest first.
    pub fn add_transaction(&self, txn: Transaction) {
        let mut history = self.history.write();
        let list = history.entry(txn.account_id.clone()).or_default();
        list.push(txn);
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    /// Make fetches of `page` (0-based) for `account` fail.
    ///
    /// `times = None` fails every attempt.
    pub fn fail_page(&self, account: &str, page: usize, times: Option<usize>) {
        self.failures
            .lock()
            .insert((account.to_string(), page), times.unwrap_or(usize::MAX));
    }

    /// Number of `transaction_page` calls served (including failed ones).
    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    fn page_index(cursor: Option<&PageCursor>) -> RemoteResult<usize> {
        match cursor {
            None => Ok(0),
            Some(c) => c
                .as_str()
                .strip_prefix("page:")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| RemoteError::transport(format!("bad cursor: {}", c.as_str()))),
        }
    }

    fn take_failure(&self, account: &str, page: usize) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(&(account.to_string(), page)) {
            Some(0) | None => false,
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                true
            }
        }
    }

    /// A small fixture: one spending account, one saver, a few weeks of history.
    pub fn demo() -> Self {
        let source = Self::new().with_page_size(5);
        source.add_account(Account::new(
            "everyday",
            "Spending",
            AccountKind::Transactional,
            Money(15237),
        ));
        source.add_account(Account::new(
            "holiday",
            "Holiday Saver",
            AccountKind::Saver,
            Money(125000),
        ));

        let fixtures: [(&str, &str, &str, i64, &str, Option<&str>, &[&str]); 8] = [
            (
                "everyday",
                "tx-0001",
                "2021-07-30T08:15:00+10:00",
                -450,
                "Coffee Shop",
                None,
                &["Work"],
            ),
            (
                "everyday",
                "tx-0002",
                "2021-08-02T12:40:00+10:00",
                -1890,
                "Ramen Bar",
                Some("lunch"),
                &[],
            ),
            (
                "everyday",
                "tx-0003",
                "2021-08-13T19:05:00+10:00",
                -3200,
                "Pizza Place",
                None,
                &["Pizza Night"],
            ),
            (
                "everyday",
                "tx-0004",
                "2021-08-13T21:30:00+10:00",
                1600,
                "Transfer from Sam",
                Some("pizza share"),
                &["Pizza Night"],
            ),
            (
                "everyday",
                "tx-0005",
                "2021-09-01T09:00:00+10:00",
                240000,
                "Salary",
                None,
                &[],
            ),
            (
                "everyday",
                "tx-0006",
                "2021-09-03T17:45:00+10:00",
                -6420,
                "Supermarket",
                None,
                &[],
            ),
            (
                "holiday",
                "tx-0101",
                "2021-08-01T00:00:00+10:00",
                20000,
                "Transfer from Spending",
                None,
                &[],
            ),
            (
                "holiday",
                "tx-0102",
                "2022-01-01T00:00:00+11:00",
                105,
                "Interest",
                None,
                &[],
            ),
        ];
        for (account, id, created, amount, description, message, tags) in fixtures {
            let Ok(created_at) = DateTime::parse_from_rfc3339(created) else {
                continue;
            };
            source.add_transaction(Transaction {
                id: id.to_string(),
                account_id: account.to_string(),
                created_at,
                amount: Money(amount),
                description: description.to_string(),
                message: message.map(str::to_string),
                category: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                settled: true,
                status: Status::Settled,
            });
        }
        source
    }
}

#[async_trait]
impl AccountSource for MemorySource {
    async fn ping(&self) -> RemoteResult<String> {
        Ok("memory".to_string())
    }

    async fn accounts(&self) -> RemoteResult<Vec<Account>> {
        Ok(self.accounts.read().clone())
    }

    async fn account(&self, id: &str) -> RemoteResult<Account> {
        self.accounts
            .read()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn transaction_page(
        &self,
        account: &str,
        cursor: Option<&PageCursor>,
    ) -> RemoteResult<TransactionPage> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        let page = Self::page_index(cursor)?;

        if self.take_failure(account, page) {
            return Err(RemoteError::transport(format!(
                "injected failure on page {} of {}",
                page, account
            )));
        }

        let history = self.history.read();
        let list = history
            .get(account)
            .ok_or_else(|| RemoteError::NotFound(account.to_string()))?;

        let start = page
            .checked_mul(self.page_size)
            .ok_or_else(|| RemoteError::transport(format!("cursor out of range: page {}", page)))?
            .min(list.len());
        let end = start.saturating_add(self.page_size).min(list.len());
        let next = (end < list.len()).then(|| PageCursor::new(format!("page:{}", page + 1)));

        Ok(TransactionPage {
            transactions: list[start..end].to_vec(),
            next,
        })
    }
}
