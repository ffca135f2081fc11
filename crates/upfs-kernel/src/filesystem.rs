//! The account filesystem.
//!
//! [`UpFilesystem`] answers [`VfsOps`] calls by resolving the path, asking
//! the bank (through the [`TransactionLocator`]) or the [`FundPool`] for the
//! data behind it, and rendering the answer as attributes, directory
//! entries or bytes.
//!
//! Every leaf value renders as a single line with a trailing newline. Nothing
//! is cached: each call fetches what it needs. The one exception is the
//! allocation receipts, which are kept in memory so a created allocation file
//! can be stat'ed and read back for the lifetime of the mount. Receipts are
//! never evicted; the map grows by one entry per successful allocation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use upfs_types::{Account, AccountKind, Transaction};

use crate::locator::{DatePrefix, LocateError, TransactionLocator};
use crate::path::{
    AccountFlag, DetailField, ResolvedPath, TransactionRef, UNALLOCATED, is_valid_name,
    parse_allocation,
};
use crate::pool::{FundPool, PoolError};
use crate::remote::{AccountSource, RemoteError};
use crate::vfs::{DirEntry, FileAttr, SetAttr, StatFs, VfsError, VfsOps, VfsResult};

const DIR_PERM: u32 = 0o555;
const WRITABLE_DIR_PERM: u32 = 0o755;
const FILE_PERM: u32 = 0o444;

impl From<RemoteError> for VfsError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotFound(what) => VfsError::not_found(what),
            RemoteError::NotAuthorized => VfsError::transport("not authorized"),
            RemoteError::Transport(msg) => VfsError::transport(msg),
        }
    }
}

impl From<LocateError> for VfsError {
    fn from(e: LocateError) -> Self {
        match e {
            LocateError::NotFound(what) => VfsError::not_found(what),
            LocateError::Transport(msg) => VfsError::transport(msg),
        }
    }
}

impl From<PoolError> for VfsError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::InvalidAmount(_) | PoolError::Insufficient { .. } => {
                VfsError::unsupported(e.to_string())
            }
            PoolError::LedgerDrift(msg) => VfsError::internal(msg),
        }
    }
}

/// What a resolved path turned out to be.
#[derive(Debug)]
enum Node {
    Directory {
        perm: u32,
        mtime: Option<SystemTime>,
    },
    File {
        content: String,
        mtime: Option<SystemTime>,
    },
}

impl Node {
    fn dir(perm: u32) -> Self {
        Self::Directory { perm, mtime: None }
    }

    fn file(value: impl Into<String>) -> Self {
        Self::File {
            content: line(value),
            mtime: None,
        }
    }

    fn attr(&self) -> FileAttr {
        let (attr, mtime) = match self {
            Self::Directory { perm, mtime } => (FileAttr::directory(*perm), mtime),
            Self::File { content, mtime } => {
                (FileAttr::file(content.len() as u64, FILE_PERM), mtime)
            }
        };
        match mtime {
            Some(t) => attr.with_time(*t),
            None => attr,
        }
    }
}

/// A completed allocation, readable at the path that created it.
#[derive(Debug, Clone)]
struct Receipt {
    account: String,
    name: String,
    content: String,
    created: SystemTime,
}

fn line(value: impl Into<String>) -> String {
    let mut s = value.into();
    s.push('\n');
    s
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn created(txn: &Transaction) -> SystemTime {
    SystemTime::from(txn.created_at)
}

fn flag_matches(flag: AccountFlag, kind: AccountKind) -> bool {
    matches!(
        (flag, kind),
        (AccountFlag::Spending, AccountKind::Transactional)
            | (AccountFlag::Saver, AccountKind::Saver)
    )
}

fn flag_for(kind: AccountKind) -> AccountFlag {
    match kind {
        AccountKind::Transactional => AccountFlag::Spending,
        AccountKind::Saver => AccountFlag::Saver,
    }
}

/// Rendered value of a detail field, or `None` when the field is absent.
fn detail(txn: &Transaction, field: DetailField) -> Option<String> {
    match field {
        DetailField::Amount => Some(txn.amount.to_string()),
        DetailField::Category => txn.category.clone(),
        DetailField::Description => Some(txn.description.clone()),
        DetailField::Message => txn.message.clone(),
        DetailField::Settled => Some(txn.settled.to_string()),
        DetailField::Status => Some(txn.status.as_str().to_string()),
    }
}

fn slice(content: &[u8], offset: u64, size: u32) -> Vec<u8> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
    let end = start.saturating_add(size as usize).min(content.len());
    content[start..end].to_vec()
}

/// Filesystem view of a bank's accounts plus a fund pool.
pub struct UpFilesystem {
    source: Arc<dyn AccountSource>,
    locator: TransactionLocator,
    pool: Arc<FundPool>,
    /// Allocation receipts keyed by the path that created them.
    receipts: Mutex<BTreeMap<String, Receipt>>,
    /// Serialises allocations from the receipt check to the receipt insert.
    allocating: tokio::sync::Mutex<()>,
}

impl UpFilesystem {
    pub fn new(source: Arc<dyn AccountSource>, pool: Arc<FundPool>) -> Self {
        Self {
            locator: TransactionLocator::new(Arc::clone(&source)),
            source,
            pool,
            receipts: Mutex::new(BTreeMap::new()),
            allocating: tokio::sync::Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &Arc<FundPool> {
        &self.pool
    }

    fn resolve(&self, path: &Path) -> (String, ResolvedPath) {
        let raw = path_str(path);
        let resolved = ResolvedPath::parse(&raw);
        debug!(path = %raw, resolved = ?resolved, "resolved");
        (raw, resolved)
    }

    async fn account(&self, id: &str) -> VfsResult<Account> {
        Ok(self.source.account(id).await?)
    }

    async fn transaction(&self, txn: &TransactionRef) -> VfsResult<Transaction> {
        Ok(self.locator.locate(txn).await?)
    }

    /// Dated directories exist only while they hold at least one transaction.
    async fn require_dated(&self, account: &str, prefix: DatePrefix, raw: &str) -> VfsResult<()> {
        if self.locator.contains(account, prefix).await? {
            Ok(())
        } else {
            Err(VfsError::not_found(raw))
        }
    }

    fn receipt(&self, raw: &str) -> Option<Receipt> {
        let key = raw.strip_suffix('/').unwrap_or(raw);
        self.receipts.lock().get(key).cloned()
    }

    async fn node(&self, raw: &str, resolved: &ResolvedPath) -> VfsResult<Node> {
        match resolved {
            ResolvedPath::Root => Ok(Node::dir(WRITABLE_DIR_PERM)),
            ResolvedPath::UnallocatedBalance => Ok(Node::file(self.pool.total().to_string())),
            ResolvedPath::AccountRoot { account } => {
                self.account(account).await?;
                Ok(Node::dir(WRITABLE_DIR_PERM))
            }
            ResolvedPath::AccountBalance { account } => {
                let account = self.account(account).await?;
                Ok(Node::file(account.balance.to_string()))
            }
            ResolvedPath::AccountFlag { account, flag } => {
                let account = self.account(account).await?;
                if flag_matches(*flag, account.kind) {
                    Ok(Node::file("true"))
                } else {
                    Err(VfsError::not_found(raw))
                }
            }
            ResolvedPath::TransactionsRoot { account } => {
                self.account(account).await?;
                Ok(Node::dir(DIR_PERM))
            }
            ResolvedPath::TransactionsByYear { account, year } => {
                self.require_dated(account, DatePrefix::Year(*year), raw).await?;
                Ok(Node::dir(DIR_PERM))
            }
            ResolvedPath::TransactionsByMonth { account, year, month } => {
                self.require_dated(account, DatePrefix::Month(*year, *month), raw)
                    .await?;
                Ok(Node::dir(DIR_PERM))
            }
            ResolvedPath::TransactionsByDay { account, date } => {
                self.require_dated(account, DatePrefix::Day(*date), raw).await?;
                Ok(Node::dir(DIR_PERM))
            }
            ResolvedPath::TransactionEntry(t) | ResolvedPath::TransactionTags(t) => {
                let txn = self.transaction(t).await?;
                Ok(Node::Directory {
                    perm: DIR_PERM,
                    mtime: Some(created(&txn)),
                })
            }
            ResolvedPath::TransactionDetail(t, field) => {
                let txn = self.transaction(t).await?;
                let value = detail(&txn, *field).ok_or_else(|| VfsError::not_found(raw))?;
                Ok(Node::File {
                    content: line(value),
                    mtime: Some(created(&txn)),
                })
            }
            ResolvedPath::TransactionTag(t, tag) => {
                let txn = self.transaction(t).await?;
                if !txn.has_tag(tag) {
                    return Err(VfsError::not_found(raw));
                }
                Ok(Node::File {
                    content: line(tag.as_str()),
                    mtime: Some(created(&txn)),
                })
            }
            ResolvedPath::Invalid => match self.receipt(raw) {
                Some(r) => Ok(Node::File {
                    content: r.content,
                    mtime: Some(r.created),
                }),
                None => Err(VfsError::not_found(raw)),
            },
        }
    }

    async fn list(&self, raw: &str, resolved: &ResolvedPath) -> VfsResult<Vec<DirEntry>> {
        let entries = match resolved {
            ResolvedPath::Root => {
                let mut entries: Vec<DirEntry> = self
                    .source
                    .accounts()
                    .await?
                    .into_iter()
                    .filter(|a| is_valid_name(&a.id) && a.id != UNALLOCATED)
                    .map(|a| DirEntry::directory(a.id))
                    .collect();
                entries.push(DirEntry::file(UNALLOCATED));
                entries
            }
            ResolvedPath::AccountRoot { account } => {
                let found = self.account(account).await?;
                let mut entries = vec![
                    DirEntry::file("balance"),
                    DirEntry::directory("transactions"),
                    DirEntry::file(flag_for(found.kind).as_str()),
                ];
                entries.extend(
                    self.receipts
                        .lock()
                        .values()
                        .filter(|r| r.account == *account)
                        .map(|r| DirEntry::file(r.name.clone())),
                );
                entries
            }
            ResolvedPath::TransactionsRoot { account } => self
                .locator
                .enumerate(account, DatePrefix::All)
                .await?
                .into_iter()
                .map(DirEntry::directory)
                .collect(),
            ResolvedPath::TransactionsByYear { account, year } => {
                self.dated(account, DatePrefix::Year(*year), raw).await?
            }
            ResolvedPath::TransactionsByMonth { account, year, month } => {
                self.dated(account, DatePrefix::Month(*year, *month), raw).await?
            }
            ResolvedPath::TransactionsByDay { account, date } => {
                self.dated(account, DatePrefix::Day(*date), raw).await?
            }
            ResolvedPath::TransactionEntry(t) => {
                let txn = self.transaction(t).await?;
                let mut entries: Vec<DirEntry> = DetailField::ALL
                    .iter()
                    .filter(|f| detail(&txn, **f).is_some())
                    .map(|f| DirEntry::file(f.as_str()))
                    .collect();
                entries.push(DirEntry::directory("tags"));
                entries
            }
            ResolvedPath::TransactionTags(t) => {
                let txn = self.transaction(t).await?;
                txn.tags
                    .iter()
                    .filter(|tag| is_valid_name(tag))
                    .map(DirEntry::file)
                    .collect()
            }
            leaf => {
                self.node(raw, leaf).await?;
                return Err(VfsError::not_a_directory(raw));
            }
        };
        Ok(entries)
    }

    /// Children of a dated directory; an empty listing means it does not exist.
    async fn dated(
        &self,
        account: &str,
        prefix: DatePrefix,
        raw: &str,
    ) -> VfsResult<Vec<DirEntry>> {
        let names = self.locator.enumerate(account, prefix).await?;
        if names.is_empty() {
            return Err(VfsError::not_found(raw));
        }
        Ok(names
            .into_iter()
            .filter(|n| is_valid_name(n))
            .map(DirEntry::directory)
            .collect())
    }
}

#[async_trait]
impl VfsOps for UpFilesystem {
    #[tracing::instrument(skip(self), name = "upfs.getattr")]
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let (raw, resolved) = self.resolve(path);
        Ok(self.node(&raw, &resolved).await?.attr())
    }

    #[tracing::instrument(skip(self), name = "upfs.readdir")]
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let (raw, resolved) = self.resolve(path);
        self.list(&raw, &resolved).await
    }

    #[tracing::instrument(skip(self), name = "upfs.read")]
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let (raw, resolved) = self.resolve(path);
        if resolved.is_container() {
            return Err(VfsError::is_a_directory(raw));
        }
        match self.node(&raw, &resolved).await? {
            Node::File { content, .. } => Ok(slice(content.as_bytes(), offset, size)),
            Node::Directory { .. } => Err(VfsError::is_a_directory(raw)),
        }
    }

    async fn write(&self, _path: &Path, _offset: u64, _data: &[u8]) -> VfsResult<u32> {
        Err(VfsError::ReadOnly)
    }

    #[tracing::instrument(skip(self), name = "upfs.create")]
    async fn create(&self, path: &Path, _mode: u32) -> VfsResult<FileAttr> {
        let raw = path_str(path);
        let Some(request) = parse_allocation(&raw) else {
            return Err(VfsError::ReadOnly);
        };
        // Held across the account check, so a repeated create finds the first receipt.
        let _allocating = self.allocating.lock().await;
        if let Some(existing) = self.receipt(&raw) {
            return Ok(FileAttr::file(existing.content.len() as u64, FILE_PERM)
                .with_time(existing.created));
        }

        // All remote I/O happens before the pool is touched.
        self.account(&request.account).await?;
        let withdrawal = self.pool.withdraw(request.amount)?;
        info!(
            account = %request.account,
            amount = %request.amount,
            debits = ?withdrawal.debits,
            "funds allocated"
        );

        let key = raw.strip_suffix('/').unwrap_or(&raw).to_string();
        let name = key.rsplit('/').next().unwrap_or_default().to_string();
        let receipt = Receipt {
            account: request.account,
            name,
            content: withdrawal.render(),
            created: SystemTime::now(),
        };
        let attr =
            FileAttr::file(receipt.content.len() as u64, FILE_PERM).with_time(receipt.created);
        self.receipts.lock().insert(key, receipt);
        Ok(attr)
    }

    async fn mkdir(&self, _path: &Path, _mode: u32) -> VfsResult<FileAttr> {
        Err(VfsError::ReadOnly)
    }

    async fn unlink(&self, _path: &Path) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }

    async fn rmdir(&self, _path: &Path) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }

    async fn rename(&self, _from: &Path, _to: &Path) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }

    async fn truncate(&self, _path: &Path, _size: u64) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }

    async fn setattr(&self, _path: &Path, _attr: SetAttr) -> VfsResult<FileAttr> {
        Err(VfsError::ReadOnly)
    }

    async fn symlink(&self, _path: &Path, _target: &Path) -> VfsResult<FileAttr> {
        Err(VfsError::ReadOnly)
    }

    async fn link(&self, _oldpath: &Path, _newpath: &Path) -> VfsResult<FileAttr> {
        Err(VfsError::ReadOnly)
    }

    async fn getxattr(&self, _path: &Path, name: &str) -> VfsResult<Vec<u8>> {
        Err(VfsError::unsupported(format!("xattr {}", name)))
    }

    async fn setxattr(&self, _path: &Path, name: &str, _value: &[u8]) -> VfsResult<()> {
        Err(VfsError::unsupported(format!("xattr {}", name)))
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        Ok(StatFs::synthetic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemorySource;
    use upfs_types::Money;

    fn fs_with_pool(entries: &[(&str, i64)]) -> UpFilesystem {
        let pool = FundPool::new(entries.iter().map(|(a, m)| (*a, Money(*m))));
        UpFilesystem::new(Arc::new(MemorySource::demo()), Arc::new(pool))
    }

    fn fs() -> UpFilesystem {
        fs_with_pool(&[("everyday", 15237)])
    }

    async fn read_string(fs: &UpFilesystem, path: &str) -> VfsResult<String> {
        let bytes = fs.read(Path::new(path), 0, 4096).await?;
        Ok(String::from_utf8(bytes).unwrap())
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_root_listing() {
        let fs = fs();
        let entries = fs.readdir(Path::new("/")).await.unwrap();
        assert_eq!(names(&entries), vec!["everyday", "holiday", "unallocated"]);
        assert!(entries[0].kind.is_dir());
        assert!(entries[2].kind.is_file());
    }

    #[tokio::test]
    async fn test_account_listing_by_kind() {
        let fs = fs();
        let spending = fs.readdir(Path::new("/everyday")).await.unwrap();
        assert_eq!(names(&spending), vec!["balance", "transactions", "spending"]);
        let saver = fs.readdir(Path::new("/holiday/")).await.unwrap();
        assert_eq!(names(&saver), vec!["balance", "transactions", "saver"]);
    }

    #[tokio::test]
    async fn test_balance_and_flags() {
        let fs = fs();
        assert_eq!(read_string(&fs, "/everyday/balance").await.unwrap(), "152.37\n");
        assert_eq!(read_string(&fs, "/everyday/spending").await.unwrap(), "true\n");
        assert!(matches!(
            fs.getattr(Path::new("/everyday/saver")).await,
            Err(VfsError::NotFound(_))
        ));
        assert_eq!(read_string(&fs, "/holiday/saver").await.unwrap(), "true\n");
    }

    #[tokio::test]
    async fn test_getattr_sizes_and_perms() {
        let fs = fs();
        let balance = fs.getattr(Path::new("/everyday/balance")).await.unwrap();
        assert!(balance.is_file());
        assert_eq!(balance.size, "152.37\n".len() as u64);
        assert_eq!(balance.perm, 0o444);

        let root = fs.getattr(Path::new("/")).await.unwrap();
        assert_eq!(root.perm, 0o755);
        let txns = fs.getattr(Path::new("/everyday/transactions")).await.unwrap();
        assert!(txns.is_dir());
        assert_eq!(txns.perm, 0o555);
    }

    #[tokio::test]
    async fn test_unallocated_reports_pool_total() {
        let fs = fs_with_pool(&[("everyday", 500), ("other", 300)]);
        assert_eq!(read_string(&fs, "/unallocated").await.unwrap(), "8.00\n");
    }

    #[tokio::test]
    async fn test_transaction_tree() {
        let fs = fs();
        let years = fs.readdir(Path::new("/everyday/transactions")).await.unwrap();
        assert_eq!(names(&years), vec!["2021"]);
        let months = fs
            .readdir(Path::new("/everyday/transactions/2021"))
            .await
            .unwrap();
        assert_eq!(names(&months), vec!["07", "08", "09"]);
        let days = fs
            .readdir(Path::new("/everyday/transactions/2021/08"))
            .await
            .unwrap();
        assert_eq!(names(&days), vec!["02", "13"]);
        let ids = fs
            .readdir(Path::new("/everyday/transactions/2021/08/13"))
            .await
            .unwrap();
        assert_eq!(names(&ids), vec!["tx-0004", "tx-0003"]);
    }

    #[tokio::test]
    async fn test_empty_date_directory_is_not_found() {
        let fs = fs();
        for path in [
            "/everyday/transactions/2019",
            "/everyday/transactions/2021/01",
            "/everyday/transactions/2021/08/14",
        ] {
            assert!(
                matches!(fs.getattr(Path::new(path)).await, Err(VfsError::NotFound(_))),
                "{}",
                path
            );
            assert!(matches!(fs.readdir(Path::new(path)).await, Err(VfsError::NotFound(_))));
        }
    }

    #[tokio::test]
    async fn test_transaction_entry_listing_skips_absent_fields() {
        let fs = fs();
        let entries = fs
            .readdir(Path::new("/everyday/transactions/2021/08/13/tx-0003"))
            .await
            .unwrap();
        assert_eq!(
            names(&entries),
            vec!["amount", "description", "settled", "status", "tags"]
        );

        let with_message = fs
            .readdir(Path::new("/everyday/transactions/2021/08/13/tx-0004"))
            .await
            .unwrap();
        assert!(names(&with_message).contains(&"message"));
    }

    #[tokio::test]
    async fn test_transaction_details() {
        let fs = fs();
        let base = "/everyday/transactions/2021/08/13/tx-0004";
        assert_eq!(read_string(&fs, &format!("{}/amount", base)).await.unwrap(), "16.00\n");
        assert_eq!(
            read_string(&fs, &format!("{}/description", base)).await.unwrap(),
            "Transfer from Sam\n"
        );
        assert_eq!(
            read_string(&fs, &format!("{}/message", base)).await.unwrap(),
            "pizza share\n"
        );
        assert_eq!(read_string(&fs, &format!("{}/settled", base)).await.unwrap(), "true\n");
        assert_eq!(read_string(&fs, &format!("{}/status", base)).await.unwrap(), "SETTLED\n");
        assert!(matches!(
            fs.read(Path::new(&format!("{}/category", base)), 0, 64).await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transaction_mtime_is_created_at() {
        let fs = fs();
        let attr = fs
            .getattr(Path::new("/everyday/transactions/2021/08/13/tx-0003/amount"))
            .await
            .unwrap();
        let expected = chrono::DateTime::parse_from_rfc3339("2021-08-13T19:05:00+10:00").unwrap();
        assert_eq!(attr.mtime, SystemTime::from(expected));
    }

    #[tokio::test]
    async fn test_tags() {
        let fs = fs();
        let base = "/everyday/transactions/2021/08/13/tx-0003/tags";
        let tags = fs.readdir(Path::new(base)).await.unwrap();
        assert_eq!(names(&tags), vec!["Pizza Night"]);
        assert_eq!(
            read_string(&fs, &format!("{}/Pizza Night", base)).await.unwrap(),
            "Pizza Night\n"
        );
        assert!(matches!(
            fs.getattr(Path::new(&format!("{}/Work", base))).await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_date_for_transaction() {
        let fs = fs();
        assert!(matches!(
            fs.getattr(Path::new("/everyday/transactions/2021/08/02/tx-0003")).await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_and_unknown_paths() {
        let fs = fs();
        for path in [
            "/nobody",
            "/nobody/balance",
            "/everyday/bogus",
            "/everyday/transactions/2021/13",
            "/unallocated/extra",
        ] {
            assert!(
                matches!(fs.getattr(Path::new(path)).await, Err(VfsError::NotFound(_))),
                "{}",
                path
            );
        }
    }

    #[tokio::test]
    async fn test_kind_mismatch_errors() {
        let fs = fs();
        assert!(matches!(
            fs.readdir(Path::new("/everyday/balance")).await,
            Err(VfsError::NotADirectory(_))
        ));
        assert!(matches!(
            fs.read(Path::new("/everyday"), 0, 10).await,
            Err(VfsError::IsADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_read_offsets() {
        let fs = fs();
        let path = Path::new("/everyday/balance");
        assert_eq!(fs.read(path, 4, 100).await.unwrap(), b"37\n".to_vec());
        assert_eq!(fs.read(path, 0, 3).await.unwrap(), b"152".to_vec());
        assert!(fs.read(path, 100, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_not_found() {
        let source = MemorySource::demo();
        source.fail_page("everyday", 0, None);
        let fs = UpFilesystem::new(Arc::new(source), Arc::new(FundPool::default()));
        assert!(matches!(
            fs.getattr(Path::new("/everyday/transactions/2021/08/13/tx-0003")).await,
            Err(VfsError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_mutations_are_read_only() {
        let fs = fs();
        let p = Path::new("/everyday/balance");
        assert!(matches!(fs.write(p, 0, b"1").await, Err(VfsError::ReadOnly)));
        assert!(matches!(fs.unlink(p).await, Err(VfsError::ReadOnly)));
        assert!(matches!(fs.mkdir(Path::new("/x"), 0o755).await, Err(VfsError::ReadOnly)));
        assert!(matches!(fs.rename(p, Path::new("/y")).await, Err(VfsError::ReadOnly)));
        assert!(matches!(fs.setattr(p, SetAttr::default()).await, Err(VfsError::ReadOnly)));
        assert!(matches!(fs.create(p, 0o644).await, Err(VfsError::ReadOnly)));
        assert!(matches!(fs.getxattr(p, "user.x").await, Err(VfsError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_allocation_creates_receipt() {
        let fs = fs_with_pool(&[("everyday", 500), ("holiday", 300)]);
        let attr = fs.create(Path::new("/holiday/7"), 0o644).await.unwrap();
        let expected = "everyday 5.00\nholiday 2.00\n";
        assert_eq!(attr.size, expected.len() as u64);
        assert_eq!(read_string(&fs, "/holiday/7").await.unwrap(), expected);
        assert_eq!(read_string(&fs, "/unallocated").await.unwrap(), "1.00\n");

        let listing = fs.readdir(Path::new("/holiday")).await.unwrap();
        assert!(names(&listing).contains(&"7"));

        // Creating the same path again does not allocate twice.
        fs.create(Path::new("/holiday/7"), 0o644).await.unwrap();
        assert_eq!(fs.pool().total(), Money(100));
    }

    #[tokio::test]
    async fn test_allocation_rejections() {
        let fs = fs_with_pool(&[("everyday", 500)]);
        assert!(matches!(
            fs.create(Path::new("/everyday/9.99"), 0o644).await,
            Err(VfsError::Unsupported(_))
        ));
        assert!(matches!(
            fs.create(Path::new("/nobody/1"), 0o644).await,
            Err(VfsError::NotFound(_))
        ));
        assert!(matches!(
            fs.create(Path::new("/everyday/1.234"), 0o644).await,
            Err(VfsError::ReadOnly)
        ));
        assert_eq!(fs.pool().total(), Money(500));
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            VfsError::from(PoolError::LedgerDrift("x".into())),
            VfsError::Internal(_)
        ));
        assert!(matches!(
            VfsError::from(RemoteError::NotAuthorized),
            VfsError::Transport(_)
        ));
        assert!(matches!(
            VfsError::from(LocateError::NotFound("x".into())),
            VfsError::NotFound(_)
        ));
    }
}
