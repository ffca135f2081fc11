//! Transaction records.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::money::Money;

/// Settlement status of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum Status {
    /// Authorised but not yet settled.
    Held,
    /// Settled.
    Settled,
}

impl Status {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Held => "HELD",
            Status::Settled => "SETTLED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction, immutable once observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique within the owning account.
    pub id: String,
    pub account_id: String,
    pub created_at: DateTime<FixedOffset>,
    pub amount: Money,
    pub description: String,
    pub message: Option<String>,
    /// Category id, when the bank has categorised the transaction.
    pub category: Option<String>,
    pub tags: BTreeSet<String>,
    pub settled: bool,
    pub status: Status,
}

impl Transaction {
    /// Calendar date of creation in the transaction's own offset.
    ///
    /// This is the date the filesystem files the transaction under.
    pub fn created_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
