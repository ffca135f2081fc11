//! Remote account records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::money::Money;

/// Kind of account, as reported by the bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum AccountKind {
    /// Everyday spending account.
    #[strum(serialize = "transactional", serialize = "spending")]
    Transactional,
    /// Savings account.
    #[strum(serialize = "saver")]
    Saver,
}

impl AccountKind {
    /// Parse from string (case-insensitive).
    ///
    /// Supports the alias "spending" -> Transactional.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Wire representation used by the Up API.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Transactional => "TRANSACTIONAL",
            AccountKind::Saver => "SAVER",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A remote account.
///
/// Fetched per filesystem call; upfs never mutates `balance`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    pub kind: AccountKind,
    pub balance: Money,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: AccountKind,
        balance: impl Into<Money>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            balance: balance.into(),
        }
    }

    pub fn is_spending(&self) -> bool {
        self.kind == AccountKind::Transactional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!(AccountKind::from_str("SAVER"), Some(AccountKind::Saver));
        assert_eq!(AccountKind::from_str("transactional"), Some(AccountKind::Transactional));
        assert_eq!(AccountKind::from_str("spending"), Some(AccountKind::Transactional));
        assert_eq!(AccountKind::from_str("joint"), None);
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&AccountKind::Transactional).unwrap();
        assert_eq!(json, "\"TRANSACTIONAL\"");
        let kind: AccountKind = serde_json::from_str("\"SAVER\"").unwrap();
        assert_eq!(kind, AccountKind::Saver);
    }

    #[test]
    fn test_account_flags() {
        let a = Account::new("acc-1", "Spending", AccountKind::Transactional, 100);
        assert!(a.is_spending());
        assert!(!Account::new("acc-2", "Saver", AccountKind::Saver, 0).is_spending());
        assert_eq!(a.balance, Money(100));
    }
}
