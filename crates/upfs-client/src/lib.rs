//! # upfs-client
//!
//! Up Bank REST API client.
//!
//! [`UpClient`] implements [`AccountSource`] over HTTPS with a personal
//! access token. Pagination follows the API's `links.next` URLs, which are
//! handed to the kernel as opaque [`PageCursor`]s.

mod api;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use upfs_kernel::remote::{AccountSource, PageCursor, RemoteError, RemoteResult, TransactionPage};
use upfs_types::{Account, Transaction};

use api::{AccountResource, ListDocument, PingDocument, SingleDocument, TransactionResource};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.up.com.au/api/v1";

/// Largest page the API serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS or timeout failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response.
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    /// Response body did not match the expected document.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for RemoteError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Status { status, .. } if status == StatusCode::UNAUTHORIZED => {
                RemoteError::NotAuthorized
            }
            ClientError::Status { url, status } if status == StatusCode::NOT_FOUND => {
                RemoteError::NotFound(url)
            }
            other => RemoteError::transport(other.to_string()),
        }
    }
}

/// Up Bank API client.
pub struct UpClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    page_size: u32,
}

impl std::fmt::Debug for UpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpClient")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl UpClient {
    /// Client against the production API.
    pub fn new(token: impl Into<String>) -> ClientResult<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Client against a custom API root.
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> ClientResult<Self> {
        let base_url: String = base_url.into();
        Ok(Self {
            http: http_client(None)?,
            token: token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: MAX_PAGE_SIZE,
        })
    }

    /// Transactions per page, clamped to `1..=100`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> ClientResult<Self> {
        self.http = http_client(Some(timeout))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        debug!(url, "GET");
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Page through a list endpoint until `links.next` runs out.
    async fn get_all<T: DeserializeOwned>(&self, first: String) -> ClientResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next {
            let doc: ListDocument<T> = self.get(&url).await?;
            items.extend(doc.data);
            next = doc.links.next;
        }
        Ok(items)
    }

    /// First-page URL for an account's history.
    fn transactions_url(&self, account: &str) -> String {
        self.url(&format!(
            "/accounts/{}/transactions?page[size]={}",
            account, self.page_size
        ))
    }

    /// A follow-up cursor must point back at this API.
    fn cursor_url(&self, cursor: &PageCursor) -> RemoteResult<String> {
        let url = cursor.as_str();
        if url.starts_with(&format!("{}/", self.base_url)) {
            Ok(url.to_string())
        } else {
            Err(RemoteError::transport(format!("foreign page cursor: {}", url)))
        }
    }
}

fn http_client(timeout: Option<Duration>) -> ClientResult<reqwest::Client> {
    let mut builder =
        reqwest::Client::builder().user_agent(concat!("upfs/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Up ids are UUIDs; anything else cannot name an account.
fn check_account_id(id: &str) -> RemoteResult<()> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        Ok(())
    } else {
        Err(RemoteError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl AccountSource for UpClient {
    #[tracing::instrument(skip(self), name = "up.ping")]
    async fn ping(&self) -> RemoteResult<String> {
        let doc: PingDocument = self.get(&self.url("/util/ping")).await?;
        Ok(doc.meta.id)
    }

    #[tracing::instrument(skip(self), name = "up.accounts")]
    async fn accounts(&self) -> RemoteResult<Vec<Account>> {
        let first = self.url(&format!("/accounts?page[size]={}", self.page_size));
        let resources: Vec<AccountResource> = self.get_all(first).await?;
        Ok(resources
            .into_iter()
            .filter_map(AccountResource::into_account)
            .collect())
    }

    #[tracing::instrument(skip(self), name = "up.account")]
    async fn account(&self, id: &str) -> RemoteResult<Account> {
        check_account_id(id)?;
        let doc: SingleDocument<AccountResource> =
            self.get(&self.url(&format!("/accounts/{}", id))).await?;
        doc.data
            .into_account()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    #[tracing::instrument(skip(self, cursor), name = "up.transactions")]
    async fn transaction_page(
        &self,
        account: &str,
        cursor: Option<&PageCursor>,
    ) -> RemoteResult<TransactionPage> {
        check_account_id(account)?;
        let url = match cursor {
            Some(c) => self.cursor_url(c)?,
            None => self.transactions_url(account),
        };
        let doc: ListDocument<TransactionResource> = self.get(&url).await?;
        let transactions: Vec<Transaction> = doc
            .data
            .into_iter()
            .map(|r| r.into_transaction(account))
            .collect();
        Ok(TransactionPage {
            transactions,
            next: doc.links.next.map(PageCursor::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> UpClient {
        UpClient::with_base_url("up:yeah:secret", "https://api.example.test/api/v1/").unwrap()
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = client();
        assert_eq!(client.base_url(), "https://api.example.test/api/v1");
        assert_eq!(
            client.transactions_url("acct-1"),
            "https://api.example.test/api/v1/accounts/acct-1/transactions?page[size]=100"
        );
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(client().with_page_size(0).page_size, 1);
        assert_eq!(client().with_page_size(500).page_size, 100);
        assert_eq!(client().with_page_size(25).page_size, 25);
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", client());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_status_mapping() {
        let status = |code| ClientError::Status {
            url: "https://api.example.test/api/v1/accounts/x".into(),
            status: code,
        };
        assert_eq!(
            RemoteError::from(status(StatusCode::UNAUTHORIZED)),
            RemoteError::NotAuthorized
        );
        assert!(matches!(
            RemoteError::from(status(StatusCode::NOT_FOUND)),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            RemoteError::from(status(StatusCode::TOO_MANY_REQUESTS)),
            RemoteError::Transport(_)
        ));
    }

    #[test]
    fn test_decode_error_is_transport() {
        let err = serde_json::from_str::<PingDocument>("{}").unwrap_err();
        assert!(matches!(
            RemoteError::from(ClientError::from(err)),
            RemoteError::Transport(_)
        ));
    }

    #[test]
    fn test_account_id_check() {
        assert!(check_account_id("2f1b7c9e-0000-4000-8000-000000000001").is_ok());
        assert!(check_account_id("Pizza Night").is_err());
        assert!(check_account_id("a?b").is_err());
        assert!(check_account_id("").is_err());
    }

    #[tokio::test]
    async fn test_foreign_cursor_rejected_before_request() {
        let client = client();
        let cursor = PageCursor::new("https://elsewhere.test/accounts/x/transactions");
        assert!(matches!(
            client.transaction_page("acct-1", Some(&cursor)).await,
            Err(RemoteError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_account_id_is_not_found_without_request() {
        assert!(matches!(
            client().account("../util/ping").await,
            Err(RemoteError::NotFound(_))
        ));
    }
}
