//! Transaction lookup over paginated remote history.
//!
//! The bank serves an account's history newest first, one page per call.
//! [`TransactionPages`] walks that history lazily: a page is fetched only
//! when the caller asks for it, so a point lookup that matches on page 2
//! never touches page 3.
//!
//! A transport failure is retried once and then aborts the scan. Only a
//! clean walk to the last page can produce [`LocateError::NotFound`]; a
//! failed walk never masquerades as a negative answer.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use upfs_types::Transaction;

use crate::path::TransactionRef;
use crate::remote::{AccountSource, PageCursor, RemoteError, TransactionPage};

/// Errors from scanning transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// History was fully scanned (or the account is unknown) without a match.
    #[error("not found: {0}")]
    NotFound(String),

    /// The scan was aborted; the answer is unknown.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<RemoteError> for LocateError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotFound(account) => Self::NotFound(account),
            RemoteError::NotAuthorized => Self::Transport("not authorized".to_string()),
            RemoteError::Transport(msg) => Self::Transport(msg),
        }
    }
}

pub type LocateResult<T> = Result<T, LocateError>;

/// Date filter for directory enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatePrefix {
    /// Every transaction; children are years.
    All,
    /// Children are months of the year.
    Year(i32),
    /// Children are days of the month.
    Month(i32, u32),
    /// Children are transaction ids.
    Day(NaiveDate),
}

impl DatePrefix {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            Self::All => true,
            Self::Year(y) => date.year() == y,
            Self::Month(y, m) => date.year() == y && date.month() == m,
            Self::Day(d) => date == d,
        }
    }

    /// Name of the directory entry `txn` contributes under this prefix.
    fn child_name(&self, txn: &Transaction) -> String {
        let date = txn.created_date();
        match self {
            Self::All => format!("{:04}", date.year()),
            Self::Year(_) => format!("{:02}", date.month()),
            Self::Month(..) => format!("{:02}", date.day()),
            Self::Day(_) => txn.id.clone(),
        }
    }
}

/// Lazy, restartable walk over one account's history.
pub struct TransactionPages<'a> {
    source: &'a dyn AccountSource,
    account: String,
    cursor: Option<PageCursor>,
    exhausted: bool,
    fetched: usize,
}

impl<'a> TransactionPages<'a> {
    pub fn new(source: &'a dyn AccountSource, account: impl Into<String>) -> Self {
        Self {
            source,
            account: account.into(),
            cursor: None,
            exhausted: false,
            fetched: 0,
        }
    }

    /// Fetch the next page, or `None` once history is exhausted.
    pub async fn next_page(&mut self) -> LocateResult<Option<Vec<Transaction>>> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self.fetch_with_retry().await?;
        self.fetched += 1;
        self.exhausted = page.next.is_none();
        self.cursor = page.next;
        Ok(Some(page.transactions))
    }

    /// Start again from the newest page.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.exhausted = false;
        self.fetched = 0;
    }

    /// Pages successfully fetched since the last (re)start.
    pub fn pages_fetched(&self) -> usize {
        self.fetched
    }

    async fn fetch_with_retry(&self) -> LocateResult<TransactionPage> {
        let cursor = self.cursor.as_ref();
        match self.source.transaction_page(&self.account, cursor).await {
            Ok(page) => Ok(page),
            Err(RemoteError::Transport(msg)) => {
                warn!(
                    account = %self.account,
                    page = self.fetched,
                    "page fetch failed, retrying: {}",
                    msg
                );
                Ok(self.source.transaction_page(&self.account, cursor).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Finds transactions and enumerates dated directories.
#[derive(Clone)]
pub struct TransactionLocator {
    source: Arc<dyn AccountSource>,
}

impl TransactionLocator {
    pub fn new(source: Arc<dyn AccountSource>) -> Self {
        Self { source }
    }

    pub fn pages(&self, account: &str) -> TransactionPages<'_> {
        TransactionPages::new(&*self.source, account)
    }

    /// Find the transaction with id `txn.payee` created on `txn.date`.
    #[instrument(skip(self), fields(account = %txn.account, payee = %txn.payee))]
    pub async fn locate(&self, txn: &TransactionRef) -> LocateResult<Transaction> {
        let mut pages = self.pages(&txn.account);
        while let Some(page) = pages.next_page().await? {
            if let Some(found) = page
                .into_iter()
                .find(|t| t.id == txn.payee && t.created_date() == txn.date)
            {
                debug!(pages = pages.pages_fetched(), "transaction located");
                return Ok(found);
            }
        }
        Err(LocateError::NotFound(format!(
            "{} on {} in {}",
            txn.payee, txn.date, txn.account
        )))
    }

    /// Distinct child names under `prefix`, scanning all of history.
    ///
    /// Years, months and days come back sorted ascending; transaction ids
    /// come back in the order the bank returned them (newest first).
    #[instrument(skip(self))]
    pub async fn enumerate(&self, account: &str, prefix: DatePrefix) -> LocateResult<Vec<String>> {
        let mut pages = self.pages(account);
        let mut units = BTreeSet::new();
        let mut ids = Vec::new();
        let mut seen = HashSet::new();

        while let Some(page) = pages.next_page().await? {
            for txn in page.iter().filter(|t| prefix.matches(t.created_date())) {
                let name = prefix.child_name(txn);
                match prefix {
                    DatePrefix::Day(_) => {
                        if seen.insert(name.clone()) {
                            ids.push(name);
                        }
                    }
                    _ => {
                        units.insert(name);
                    }
                }
            }
        }

        debug!(pages = pages.pages_fetched(), "history enumerated");
        Ok(match prefix {
            DatePrefix::Day(_) => ids,
            _ => units.into_iter().collect(),
        })
    }

    /// Whether any transaction falls under `prefix`. Stops at the first hit.
    #[instrument(skip(self))]
    pub async fn contains(&self, account: &str, prefix: DatePrefix) -> LocateResult<bool> {
        let mut pages = self.pages(account);
        while let Some(page) = pages.next_page().await? {
            if page.iter().any(|t| prefix.matches(t.created_date())) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemorySource;
    use chrono::DateTime;
    use upfs_types::{Account, AccountKind, Money, Status};

    fn txn(id: &str, created: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: "main".to_string(),
            created_at: DateTime::parse_from_rfc3339(created).unwrap(),
            amount: Money(-100),
            description: format!("payee {}", id),
            message: None,
            category: None,
            tags: Default::default(),
            settled: false,
            status: Status::Held,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Three pages of two: [Sep, Sep] [Aug 13 (target), Aug 2] [Jul, 2020-Dec].
    fn three_page_source() -> Arc<MemorySource> {
        let source = MemorySource::new().with_page_size(2);
        source.add_account(Account::new("main", "Main", AccountKind::Transactional, 0));
        for (id, created) in [
            ("s2", "2021-09-20T10:00:00+10:00"),
            ("s1", "2021-09-01T10:00:00+10:00"),
            ("abc123", "2021-08-13T10:00:00+10:00"),
            ("a1", "2021-08-02T10:00:00+10:00"),
            ("j1", "2021-07-07T10:00:00+10:00"),
            ("d1", "2020-12-25T10:00:00+11:00"),
        ] {
            source.add_transaction(txn(id, created));
        }
        Arc::new(source)
    }

    #[tokio::test]
    async fn test_locate_stops_at_matching_page() {
        let source = three_page_source();
        let locator = TransactionLocator::new(source.clone());

        let found = locator
            .locate(&TransactionRef::new("main", date(2021, 8, 13), "abc123"))
            .await
            .unwrap();
        assert_eq!(found.id, "abc123");
        // Page 3 is never requested.
        assert_eq!(source.page_fetches(), 2);
    }

    #[tokio::test]
    async fn test_locate_requires_matching_date() {
        let source = three_page_source();
        let locator = TransactionLocator::new(source.clone());

        let result = locator
            .locate(&TransactionRef::new("main", date(2021, 8, 14), "abc123"))
            .await;
        assert!(matches!(result, Err(LocateError::NotFound(_))));
        // A negative answer needs the whole history.
        assert_eq!(source.page_fetches(), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_not_found() {
        let source = three_page_source();
        source.fail_page("main", 1, None);
        let locator = TransactionLocator::new(source.clone());

        let result = locator
            .locate(&TransactionRef::new("main", date(2021, 8, 13), "abc123"))
            .await;
        assert!(matches!(result, Err(LocateError::Transport(_))));
        // First page once, second page twice (the retry), then abort.
        assert_eq!(source.page_fetches(), 3);
    }

    #[tokio::test]
    async fn test_single_failure_is_retried() {
        let source = three_page_source();
        source.fail_page("main", 1, Some(1));
        let locator = TransactionLocator::new(source.clone());

        let found = locator
            .locate(&TransactionRef::new("main", date(2021, 8, 13), "abc123"))
            .await
            .unwrap();
        assert_eq!(found.id, "abc123");
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let locator = TransactionLocator::new(three_page_source());
        let result = locator
            .locate(&TransactionRef::new("nope", date(2021, 8, 13), "abc123"))
            .await;
        assert!(matches!(result, Err(LocateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_enumerate_units() {
        let locator = TransactionLocator::new(three_page_source());

        assert_eq!(
            locator.enumerate("main", DatePrefix::All).await.unwrap(),
            vec!["2020", "2021"]
        );
        assert_eq!(
            locator.enumerate("main", DatePrefix::Year(2021)).await.unwrap(),
            vec!["07", "08", "09"]
        );
        assert_eq!(
            locator.enumerate("main", DatePrefix::Month(2021, 8)).await.unwrap(),
            vec!["02", "13"]
        );
        assert_eq!(
            locator.enumerate("main", DatePrefix::Day(date(2021, 8, 13))).await.unwrap(),
            vec!["abc123"]
        );
        assert!(locator.enumerate("main", DatePrefix::Year(1999)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enumerate_surfaces_transport_errors() {
        let source = three_page_source();
        source.fail_page("main", 2, None);
        let locator = TransactionLocator::new(source);
        assert!(matches!(
            locator.enumerate("main", DatePrefix::All).await,
            Err(LocateError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_contains_is_lazy() {
        let source = three_page_source();
        let locator = TransactionLocator::new(source.clone());
        assert!(locator.contains("main", DatePrefix::Year(2021)).await.unwrap());
        assert_eq!(source.page_fetches(), 1);
        assert!(!locator.contains("main", DatePrefix::Year(2019)).await.unwrap());
    }

    #[tokio::test]
    async fn test_pages_restart() {
        let source = three_page_source();
        let mut pages = TransactionPages::new(&*source, "main");
        assert_eq!(pages.next_page().await.unwrap().unwrap()[0].id, "s2");
        assert_eq!(pages.next_page().await.unwrap().unwrap()[0].id, "abc123");
        pages.restart();
        assert_eq!(pages.pages_fetched(), 0);
        assert_eq!(pages.next_page().await.unwrap().unwrap()[0].id, "s2");
    }
}
