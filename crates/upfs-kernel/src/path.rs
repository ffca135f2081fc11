//! Path grammar for the account filesystem.
//!
//! Every filesystem call starts here: the raw path string is resolved into a
//! [`ResolvedPath`], a closed set of targets. Each depth validates its own
//! segment, so a path either resolves completely or becomes
//! [`ResolvedPath::Invalid`]. There are no partially validated states.
//!
//! ```text
//! /                                        Root
//! /unallocated                             UnallocatedBalance
//! /{account}                               AccountRoot
//! /{account}/balance                       AccountBalance
//! /{account}/{spending|saver}              AccountFlag
//! /{account}/transactions                  TransactionsRoot
//! /{account}/transactions/{YYYY}           TransactionsByYear
//! /{account}/transactions/{YYYY}/{MM}      TransactionsByMonth
//! /{account}/transactions/{YYYY}/{MM}/{DD} TransactionsByDay
//!   .../{payee}                            TransactionEntry
//!   .../{payee}/{field}                    TransactionDetail
//!   .../{payee}/tags                       TransactionTags
//!   .../{payee}/tags/{tag}                 TransactionTag
//! ```
//!
//! Resolution is pure string work and never performs I/O.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use upfs_types::Money;

/// Reserved top-level name for the fund pool total.
pub const UNALLOCATED: &str = "unallocated";

const BALANCE: &str = "balance";
const TRANSACTIONS: &str = "transactions";
const TAGS: &str = "tags";

/// Per-account boolean flag files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountFlag {
    Spending,
    Saver,
}

impl AccountFlag {
    pub fn from_segment(s: &str) -> Option<Self> {
        match s {
            "spending" => Some(Self::Spending),
            "saver" => Some(Self::Saver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spending => "spending",
            Self::Saver => "saver",
        }
    }
}

/// Leaf files inside a transaction directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetailField {
    Amount,
    Category,
    Description,
    Message,
    Settled,
    Status,
}

impl DetailField {
    pub const ALL: [DetailField; 6] = [
        Self::Amount,
        Self::Category,
        Self::Description,
        Self::Message,
        Self::Settled,
        Self::Status,
    ];

    /// Exact, case-sensitive match against the field literals.
    pub fn from_segment(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Category => "category",
            Self::Description => "description",
            Self::Message => "message",
            Self::Settled => "settled",
            Self::Status => "status",
        }
    }
}

/// The segments that address one transaction: account, date and payee.
///
/// `payee` is matched against the transaction identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionRef {
    pub account: String,
    pub date: NaiveDate,
    pub payee: String,
}

impl TransactionRef {
    pub fn new(account: impl Into<String>, date: NaiveDate, payee: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            date,
            payee: payee.into(),
        }
    }

    fn to_path(&self) -> String {
        format!(
            "/{}/{}/{}/{}",
            self.account,
            TRANSACTIONS,
            format_date(self.date),
            self.payee
        )
    }
}

/// Typed result of resolving a filesystem path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResolvedPath {
    Root,
    AccountRoot { account: String },
    AccountBalance { account: String },
    AccountFlag { account: String, flag: AccountFlag },
    UnallocatedBalance,
    TransactionsRoot { account: String },
    TransactionsByYear { account: String, year: i32 },
    TransactionsByMonth { account: String, year: i32, month: u32 },
    TransactionsByDay { account: String, date: NaiveDate },
    TransactionEntry(TransactionRef),
    TransactionDetail(TransactionRef, DetailField),
    TransactionTags(TransactionRef),
    TransactionTag(TransactionRef, String),
    Invalid,
}

impl ResolvedPath {
    /// Resolve a path string. Never fails; bad input becomes `Invalid`.
    pub fn parse(path: &str) -> Self {
        segments(path)
            .and_then(|segs| resolve_segments(&segs))
            .unwrap_or(Self::Invalid)
    }

    /// Whether this target is listed with `readdir` rather than read.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Root
                | Self::AccountRoot { .. }
                | Self::TransactionsRoot { .. }
                | Self::TransactionsByYear { .. }
                | Self::TransactionsByMonth { .. }
                | Self::TransactionsByDay { .. }
                | Self::TransactionEntry(_)
                | Self::TransactionTags(_)
        )
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Render back to the canonical path string.
    ///
    /// `Invalid` has no path and renders as the empty string.
    pub fn to_path(&self) -> String {
        match self {
            Self::Root => "/".to_string(),
            Self::AccountRoot { account } => format!("/{}", account),
            Self::AccountBalance { account } => format!("/{}/{}", account, BALANCE),
            Self::AccountFlag { account, flag } => format!("/{}/{}", account, flag.as_str()),
            Self::UnallocatedBalance => format!("/{}", UNALLOCATED),
            Self::TransactionsRoot { account } => format!("/{}/{}", account, TRANSACTIONS),
            Self::TransactionsByYear { account, year } => {
                format!("/{}/{}/{:04}", account, TRANSACTIONS, year)
            }
            Self::TransactionsByMonth { account, year, month } => {
                format!("/{}/{}/{:04}/{:02}", account, TRANSACTIONS, year, month)
            }
            Self::TransactionsByDay { account, date } => {
                format!("/{}/{}/{}", account, TRANSACTIONS, format_date(*date))
            }
            Self::TransactionEntry(t) => t.to_path(),
            Self::TransactionDetail(t, field) => format!("{}/{}", t.to_path(), field.as_str()),
            Self::TransactionTags(t) => format!("{}/{}", t.to_path(), TAGS),
            Self::TransactionTag(t, tag) => format!("{}/{}/{}", t.to_path(), TAGS, tag),
            Self::Invalid => String::new(),
        }
    }
}

impl From<&str> for ResolvedPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "<invalid>"),
            other => write!(f, "{}", other.to_path()),
        }
    }
}

/// Resolve a path string into a [`ResolvedPath`].
pub fn resolve(path: &str) -> ResolvedPath {
    ResolvedPath::parse(path)
}

/// A request to move `amount` out of the pool into `account`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationRequest {
    pub account: String,
    pub amount: Money,
}

/// Parse `/{account}/{amount}`, the one path shape that may be created.
///
/// `amount` must be a positive decimal literal with at most two fractional
/// digits. The account-level literals (`balance`, `transactions`, ...) never
/// parse as money, so the two grammars cannot overlap.
pub fn parse_allocation(path: &str) -> Option<AllocationRequest> {
    let segs = segments(path)?;
    match segs.as_slice() {
        [account, amount] if is_valid_name(account) && *account != UNALLOCATED => {
            let amount = Money::parse(amount).ok().filter(Money::is_positive)?;
            Some(AllocationRequest {
                account: (*account).to_string(),
                amount,
            })
        }
        _ => None,
    }
}

/// Validates a free-text segment (account, payee, tag).
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}

/// Split an absolute path into segments.
///
/// One trailing `/` is tolerated. Relative paths and `//` are rejected.
fn segments(path: &str) -> Option<Vec<&str>> {
    if path == "/" {
        return Some(Vec::new());
    }
    let rest = path.strip_prefix('/')?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return None;
    }
    Some(rest.split('/').collect())
}

fn resolve_segments(segs: &[&str]) -> Option<ResolvedPath> {
    match segs {
        [] => Some(ResolvedPath::Root),
        [UNALLOCATED] => Some(ResolvedPath::UnallocatedBalance),
        [UNALLOCATED, ..] => None,
        [account, rest @ ..] if is_valid_name(account) => resolve_account(account, rest),
        _ => None,
    }
}

fn resolve_account(account: &str, rest: &[&str]) -> Option<ResolvedPath> {
    let account = account.to_string();
    match rest {
        [] => Some(ResolvedPath::AccountRoot { account }),
        [BALANCE] => Some(ResolvedPath::AccountBalance { account }),
        [TRANSACTIONS, rest @ ..] => resolve_transactions(account, rest),
        [flag] => AccountFlag::from_segment(flag)
            .map(|flag| ResolvedPath::AccountFlag { account, flag }),
        _ => None,
    }
}

fn resolve_transactions(account: String, rest: &[&str]) -> Option<ResolvedPath> {
    let [year, rest @ ..] = rest else {
        return Some(ResolvedPath::TransactionsRoot { account });
    };
    let year = parse_year(year)?;

    let [month, rest @ ..] = rest else {
        return Some(ResolvedPath::TransactionsByYear { account, year });
    };
    let month = parse_month(month)?;

    let [day, rest @ ..] = rest else {
        return Some(ResolvedPath::TransactionsByMonth { account, year, month });
    };
    let date = parse_day(year, month, day)?;

    let [payee, rest @ ..] = rest else {
        return Some(ResolvedPath::TransactionsByDay { account, date });
    };
    if !is_valid_name(payee) {
        return None;
    }
    resolve_transaction(TransactionRef::new(account, date, *payee), rest)
}

fn resolve_transaction(txn: TransactionRef, rest: &[&str]) -> Option<ResolvedPath> {
    match rest {
        [] => Some(ResolvedPath::TransactionEntry(txn)),
        [TAGS] => Some(ResolvedPath::TransactionTags(txn)),
        [TAGS, tag] if is_valid_name(tag) => {
            Some(ResolvedPath::TransactionTag(txn, (*tag).to_string()))
        }
        [field] => DetailField::from_segment(field)
            .map(|f| ResolvedPath::TransactionDetail(txn, f)),
        _ => None,
    }
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYY`: exactly four digits.
fn parse_year(s: &str) -> Option<i32> {
    if !all_digits(s, 4) {
        return None;
    }
    s.parse().ok()
}

/// `MM`: exactly two digits, 01 to 12.
fn parse_month(s: &str) -> Option<u32> {
    if !all_digits(s, 2) {
        return None;
    }
    s.parse().ok().filter(|m| (1..=12).contains(m))
}

/// `DD`: exactly two digits naming a real day of `year`/`month`.
fn parse_day(year: i32, month: u32, s: &str) -> Option<NaiveDate> {
    if !all_digits(s, 2) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, s.parse().ok()?)
}

/// `YYYY/MM/DD`, the on-disk form of a date.
pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}/{:02}/{:02}", date.year(), date.month(), date.day())
}
