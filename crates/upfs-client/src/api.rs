//! Wire types for the Up Bank JSON:API documents.
//!
//! Only the fields the filesystem renders are decoded; everything else in
//! the payload is ignored.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::warn;

use upfs_types::{Account, AccountKind, Money, Status, Transaction};

/// `{"data": [...], "links": {"next": ...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ListDocument<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub links: Links,
}

/// `{"data": {...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct SingleDocument<T> {
    pub data: T,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

/// `GET /util/ping`
#[derive(Debug, Deserialize)]
pub(crate) struct PingDocument {
    pub meta: PingMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PingMeta {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MoneyObject {
    pub value_in_base_units: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountResource {
    pub id: String,
    pub attributes: AccountAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountAttributes {
    pub display_name: String,
    pub account_type: String,
    pub balance: MoneyObject,
}

impl AccountResource {
    /// `None` for account types the filesystem does not model (loans etc).
    pub fn into_account(self) -> Option<Account> {
        let Some(kind) = AccountKind::from_str(&self.attributes.account_type) else {
            warn!(
                id = %self.id,
                kind = %self.attributes.account_type,
                "skipping unsupported account type"
            );
            return None;
        };
        Some(Account::new(
            self.id,
            self.attributes.display_name,
            kind,
            Money(self.attributes.balance.value_in_base_units),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionResource {
    pub id: String,
    pub attributes: TransactionAttributes,
    #[serde(default)]
    pub relationships: TransactionRelationships,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionAttributes {
    pub status: Status,
    pub description: String,
    #[serde(default)]
    pub message: Option<String>,
    pub amount: MoneyObject,
    #[serde(default)]
    pub settled_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TransactionRelationships {
    #[serde(default)]
    pub account: Option<ToOne>,
    #[serde(default)]
    pub category: Option<ToOne>,
    #[serde(default)]
    pub tags: Option<ToMany>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToOne {
    pub data: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToMany {
    #[serde(default)]
    pub data: Vec<ResourceId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceId {
    pub id: String,
}

impl TransactionResource {
    /// `account` is used when the payload does not name its account.
    pub fn into_transaction(self, account: &str) -> Transaction {
        let rel = self.relationships;
        let account_id = rel
            .account
            .and_then(|r| r.data)
            .map(|r| r.id)
            .unwrap_or_else(|| account.to_string());
        let attrs = self.attributes;
        Transaction {
            id: self.id,
            account_id,
            created_at: attrs.created_at,
            amount: Money(attrs.amount.value_in_base_units),
            description: attrs.description,
            message: attrs.message.filter(|m| !m.is_empty()),
            category: rel.category.and_then(|c| c.data).map(|c| c.id),
            tags: rel
                .tags
                .map(|t| t.data.into_iter().map(|r| r.id).collect())
                .unwrap_or_default(),
            settled: attrs.settled_at.is_some(),
            status: attrs.status,
        }
    }
}
