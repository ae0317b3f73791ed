//! Entities
//!
//! Persisted records of the ledger: users, accounts and transactions,
//! plus the paging types the storage layer speaks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A person owning zero or more accounts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    /// Assigned by storage on first save
    pub id: Option<i64>,
    /// Unique, used as the external filter key
    pub username: String,
    pub email: Option<String>,
}

/// A named ledger belonging to a user.
///
/// The balance is never stored here; it is derived from the
/// account's transactions on every read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    /// Assigned by storage on first save
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    /// Owning user (lookup only)
    pub user_id: Option<i64>,
}

/// Transaction type tag.
///
/// Tags other than `INCOME` and `EXPENSE` are kept verbatim in `Other`
/// and never move a balance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Income,
    Expense,
    Other(String),
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
            TransactionType::Other(tag) => tag,
        }
    }
}

impl From<String> for TransactionType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "INCOME" => TransactionType::Income,
            // EXPENCE is the spelling older exports were written with
            "EXPENSE" | "EXPENCE" => TransactionType::Expense,
            _ => TransactionType::Other(tag),
        }
    }
}

impl From<&str> for TransactionType {
    fn from(tag: &str) -> Self {
        TransactionType::from(tag.to_string())
    }
}

impl From<TransactionType> for String {
    fn from(kind: TransactionType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single monetary event tied to one account and one recording user.
///
/// Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    /// Non-negative magnitude; the sign comes from `kind`
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub account_id: i64,
    pub user_id: i64,
    /// Username of the recording user, resolved by storage
    #[serde(rename = "ownerUsername")]
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a transaction before storage assigns its identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub account_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// A page size of zero is raised to one.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// A bounded slice of a larger result set, with the metadata
/// needed to navigate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let page_size = u64::from(request.page_size);
        Self {
            items,
            page: request.page,
            total_items,
            total_pages: total_items.div_ceil(page_size),
        }
    }
}
