//! In-memory storage
//!
//! Keeps every table in ordered maps behind one lock, so each unit of
//! work sees a consistent snapshot. Transactions are indexed by account.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::domain::{
    Account, NewTransaction, Page, PageRequest, Transaction, TransactionType, User,
};

use super::{Access, Storage, StorageError, StorageResult, UnitOfWork};

#[derive(Debug, Clone)]
struct StoredTransaction {
    amount: Decimal,
    kind: TransactionType,
    account_id: i64,
    user_id: i64,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    accounts: BTreeMap<i64, Account>,
    transactions: BTreeMap<i64, StoredTransaction>,
    transactions_by_account: HashMap<i64, Vec<i64>>,
    next_user_id: i64,
    next_account_id: i64,
    next_transaction_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && u.id != except)
    }

    fn resolve(&self, id: i64, stored: &StoredTransaction) -> StorageResult<Transaction> {
        let username = self
            .users
            .get(&stored.user_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| {
                StorageError::Corrupt(format!(
                    "transaction {} references missing user {}",
                    id, stored.user_id
                ))
            })?;

        Ok(Transaction {
            id,
            amount: stored.amount,
            kind: stored.kind.clone(),
            account_id: stored.account_id,
            user_id: stored.user_id,
            username,
            description: stored.description.clone(),
            created_at: stored.created_at,
        })
    }
}

fn paginate(accounts: Vec<Account>, page: PageRequest) -> Page<Account> {
    let total = accounts.len() as u64;
    let items = accounts
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    Page::new(items, page, total)
}

/// Storage held entirely in process memory
///
/// Units of work run one at a time. Writes go to a private copy of the
/// tables that replaces the shared one on commit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted accounts
    pub async fn account_count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn begin(&self, _access: Access) -> StorageResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().write_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            guard: Some(guard),
            working: None,
        }))
    }
}

/// Unit of work over [`MemoryStorage`]
struct MemoryUnitOfWork {
    guard: Option<OwnedRwLockWriteGuard<Tables>>,
    working: Option<Tables>,
}

impl MemoryUnitOfWork {
    fn tables(&self) -> StorageResult<&Tables> {
        match (&self.working, &self.guard) {
            (Some(working), _) => Ok(working),
            (None, Some(guard)) => Ok(&**guard),
            (None, None) => Err(StorageError::Finished),
        }
    }

    fn tables_mut(&mut self) -> StorageResult<&mut Tables> {
        let guard = self.guard.as_ref().ok_or(StorageError::Finished)?;
        Ok(self.working.get_or_insert_with(|| Tables::clone(guard)))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_account_by_id(&mut self, id: i64) -> StorageResult<Option<Account>> {
        Ok(self.tables()?.accounts.get(&id).cloned())
    }

    async fn find_account_for_update(&mut self, id: i64) -> StorageResult<Option<Account>> {
        self.find_account_by_id(id).await
    }

    async fn find_accounts_by_owner(
        &mut self,
        user_id: i64,
        page: PageRequest,
    ) -> StorageResult<Page<Account>> {
        let owned = self
            .tables()?
            .accounts
            .values()
            .filter(|a| a.user_id == Some(user_id))
            .cloned()
            .collect();
        Ok(paginate(owned, page))
    }

    async fn find_all_accounts(&mut self, page: PageRequest) -> StorageResult<Page<Account>> {
        let tables = self.tables()?;
        Ok(paginate(tables.accounts.values().cloned().collect(), page))
    }

    async fn save_account(&mut self, account: &Account) -> StorageResult<Account> {
        let tables = self.tables_mut()?;

        if let Some(user_id) = account.user_id {
            if !tables.users.contains_key(&user_id) {
                return Err(StorageError::MissingReference(format!("user {user_id}")));
            }
        }

        let id = match account.id {
            Some(id) if tables.accounts.contains_key(&id) => id,
            Some(id) => return Err(StorageError::RowNotFound(format!("account {id}"))),
            None => Tables::next_id(&mut tables.next_account_id),
        };

        let saved = Account {
            id: Some(id),
            ..account.clone()
        };
        tables.accounts.insert(id, saved.clone());
        Ok(saved)
    }

    async fn transactions_of(&mut self, account_id: i64) -> StorageResult<Vec<Transaction>> {
        let tables = self.tables()?;
        let Some(ids) = tables.transactions_by_account.get(&account_id) else {
            return Ok(Vec::new());
        };

        ids.iter()
            .filter_map(|id| tables.transactions.get(id).map(|stored| (*id, stored)))
            .map(|(id, stored)| tables.resolve(id, stored))
            .collect()
    }

    async fn find_user_by_id(&mut self, id: i64) -> StorageResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn find_user_for_update(&mut self, id: i64) -> StorageResult<Option<User>> {
        self.find_user_by_id(id).await
    }

    async fn find_user_by_username(&mut self, username: &str) -> StorageResult<Option<User>> {
        let tables = self.tables()?;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_all_users(&mut self) -> StorageResult<Vec<User>> {
        Ok(self.tables()?.users.values().cloned().collect())
    }

    async fn save_user(&mut self, user: &User) -> StorageResult<User> {
        let tables = self.tables_mut()?;

        if tables.username_taken(&user.username, user.id) {
            return Err(StorageError::Duplicate(format!("username {}", user.username)));
        }

        let id = match user.id {
            Some(id) if tables.users.contains_key(&id) => id,
            Some(id) => return Err(StorageError::RowNotFound(format!("user {id}"))),
            None => Tables::next_id(&mut tables.next_user_id),
        };

        let saved = User {
            id: Some(id),
            ..user.clone()
        };
        tables.users.insert(id, saved.clone());
        Ok(saved)
    }

    async fn find_transaction_by_id(&mut self, id: i64) -> StorageResult<Option<Transaction>> {
        let tables = self.tables()?;
        tables
            .transactions
            .get(&id)
            .map(|stored| tables.resolve(id, stored))
            .transpose()
    }

    async fn insert_transaction(&mut self, new: &NewTransaction) -> StorageResult<Transaction> {
        let tables = self.tables_mut()?;

        if !tables.accounts.contains_key(&new.account_id) {
            return Err(StorageError::MissingReference(format!(
                "account {}",
                new.account_id
            )));
        }
        if !tables.users.contains_key(&new.user_id) {
            return Err(StorageError::MissingReference(format!("user {}", new.user_id)));
        }

        let id = Tables::next_id(&mut tables.next_transaction_id);
        let stored = StoredTransaction {
            amount: new.amount,
            kind: new.kind.clone(),
            account_id: new.account_id,
            user_id: new.user_id,
            description: new.description.clone(),
            created_at: Utc::now(),
        };
        let transaction = tables.resolve(id, &stored)?;

        tables.transactions.insert(id, stored);
        tables
            .transactions_by_account
            .entry(new.account_id)
            .or_default()
            .push(id);

        Ok(transaction)
    }

    async fn commit(&mut self) -> StorageResult<()> {
        let mut guard = self.guard.take().ok_or(StorageError::Finished)?;
        if let Some(working) = self.working.take() {
            *guard = working;
        }
        Ok(())
    }
}
