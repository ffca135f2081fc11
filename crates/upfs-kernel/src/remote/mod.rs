//! Boundary with the remote account collaborator.
//!
//! The bank is the source of truth. Nothing here caches: every filesystem
//! call fetches what it needs through an [`AccountSource`].
//!
//! - [`AccountSource`] - async trait the kernel consumes
//! - [`MemorySource`] - in-memory implementation (tests, `--demo`)

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use upfs_types::{Account, Transaction};

pub use memory::MemorySource;

/// Errors reported by the remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The requested account does not exist.
    #[error("account not found: {0}")]
    NotFound(String),

    /// Credentials were rejected.
    #[error("not authorized")]
    NotAuthorized,

    /// Network, protocol or decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Opaque position in an account's transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(pub String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of transactions, newest first.
#[derive(Debug, Clone, Default)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Cursor for the next (older) page; `None` when history is exhausted.
    pub next: Option<PageCursor>,
}

/// Read access to the bank.
///
/// Calls are blocking I/O from the caller's point of view and may suspend
/// for a network round trip. Implementations must be safe to call
/// concurrently.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Check credentials, returning the authenticated user id.
    async fn ping(&self) -> RemoteResult<String>;

    /// All accounts, in the bank's order.
    async fn accounts(&self) -> RemoteResult<Vec<Account>>;

    /// A single account by id.
    async fn account(&self, id: &str) -> RemoteResult<Account>;

    /// One page of an account's history. `cursor = None` starts at the newest.
    async fn transaction_page(
        &self,
        account: &str,
        cursor: Option<&PageCursor>,
    ) -> RemoteResult<TransactionPage>;
}
