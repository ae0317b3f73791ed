//! Storage module
//!
//! The persistence contract the services depend on, with a PostgreSQL
//! adapter and an in-process adapter.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Account, NewTransaction, Page, PageRequest, Transaction, User};

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// How a unit of work will use the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads only, all from one consistent snapshot
    ReadOnly,
    /// Reads and writes; rows fetched `for_update` stay locked until the end
    ReadWrite,
}

/// Storage layer abstraction
///
/// Every service operation opens exactly one unit of work and commits it
/// when done. Dropping a unit of work without committing discards its
/// writes.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a unit of work
    async fn begin(&self, access: Access) -> StorageResult<Box<dyn UnitOfWork>>;
}

/// One storage transaction
///
/// CRUD over users, accounts and transactions keyed by numeric id.
/// Collections come back in id order. Every call after `commit` fails
/// with `StorageError::Finished`.
#[async_trait]
pub trait UnitOfWork: Send {
    // === Accounts ===

    /// Get account by ID
    async fn find_account_by_id(&mut self, id: i64) -> StorageResult<Option<Account>>;

    /// Get account by ID and hold it against concurrent writers
    async fn find_account_for_update(&mut self, id: i64) -> StorageResult<Option<Account>>;

    /// Get one page of the accounts owned by a user
    async fn find_accounts_by_owner(
        &mut self,
        user_id: i64,
        page: PageRequest,
    ) -> StorageResult<Page<Account>>;

    /// Get one page of all accounts
    async fn find_all_accounts(&mut self, page: PageRequest) -> StorageResult<Page<Account>>;

    /// Insert when `account.id` is `None`, update otherwise.
    /// Returns the stored row.
    async fn save_account(&mut self, account: &Account) -> StorageResult<Account>;

    /// Transactions recorded against an account
    async fn transactions_of(&mut self, account_id: i64) -> StorageResult<Vec<Transaction>>;

    // === Users ===

    /// Get user by ID
    async fn find_user_by_id(&mut self, id: i64) -> StorageResult<Option<User>>;

    /// Get user by ID and hold it against concurrent writers
    async fn find_user_for_update(&mut self, id: i64) -> StorageResult<Option<User>>;

    /// Get user by their unique username
    async fn find_user_by_username(&mut self, username: &str) -> StorageResult<Option<User>>;

    /// Get all users
    async fn find_all_users(&mut self) -> StorageResult<Vec<User>>;

    /// Insert when `user.id` is `None`, update otherwise.
    async fn save_user(&mut self, user: &User) -> StorageResult<User>;

    // === Transactions ===

    /// Get transaction by ID
    async fn find_transaction_by_id(&mut self, id: i64) -> StorageResult<Option<Transaction>>;

    /// Store a new, immutable transaction
    async fn insert_transaction(&mut self, new: &NewTransaction) -> StorageResult<Transaction>;

    // === Lifecycle ===

    /// Make the writes of this unit of work visible and release its locks
    async fn commit(&mut self) -> StorageResult<()>;
}
