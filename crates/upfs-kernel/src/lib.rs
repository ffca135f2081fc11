//! # upfs-kernel
//!
//! Everything between a filesystem path and the bank.
//!
//! A call flows through:
//! - [`path`] resolves the path string into a [`ResolvedPath`]
//! - [`locator`] finds transactions in paginated history
//! - [`pool`] debits the fund pool for allocations
//! - [`filesystem`] renders the answer as VFS attributes, entries or bytes
//!
//! The bank itself sits behind [`remote::AccountSource`]; [`MemorySource`]
//! stands in for it in tests and demos.

pub mod filesystem;
pub mod locator;
pub mod path;
pub mod pool;
pub mod remote;
pub mod vfs;

pub use filesystem::UpFilesystem;
pub use locator::{DatePrefix, LocateError, LocateResult, TransactionLocator, TransactionPages};
pub use path::{
    AccountFlag, AllocationRequest, DetailField, ResolvedPath, TransactionRef, parse_allocation,
    resolve,
};
pub use pool::{FundPool, LedgerEntry, PoolError, Withdrawal};
pub use remote::{
    AccountSource, MemorySource, PageCursor, RemoteError, RemoteResult, TransactionPage,
};
pub use vfs::{DirEntry, FileAttr, FileType, SetAttr, StatFs, VfsError, VfsOps, VfsResult};
