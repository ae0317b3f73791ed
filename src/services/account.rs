//! Account Service
//!
//! Reads accounts with a freshly derived balance, and handles the
//! draft/update lifecycle. Balances are recomputed on every read and
//! never cached. Each operation runs in one storage unit of work.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;

use crate::domain::{compute_balance, Account, AccountPage, AccountView, PageRequest, Transaction};
use crate::error::{AppError, AppResult};
use crate::storage::{Access, Storage, UnitOfWork};

/// Service for account reads and writes
#[derive(Clone)]
pub struct AccountService {
    storage: Arc<dyn Storage>,
}

impl AccountService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get one account with its balance attached.
    ///
    /// # Errors
    /// - `AppError::AccountNotFound` if no account has this id
    /// - `AppError::Ledger` if the balance cannot be represented
    pub async fn get_by_id(&self, account_id: i64) -> AppResult<AccountView> {
        let mut uow = self.storage.begin(Access::ReadOnly).await?;

        let account = uow
            .find_account_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?;

        let owner = match account.user_id {
            Some(user_id) => uow.find_user_by_id(user_id).await?.map(|u| u.username),
            None => None,
        };

        let view = annotate(&mut *uow, &account, owner).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// List one page of accounts, each with its balance attached.
    ///
    /// A filter naming an existing user restricts the page to that
    /// user's accounts. An empty or unknown filter lists every account.
    pub async fn list_all(
        &self,
        page: PageRequest,
        owner_username: Option<&str>,
    ) -> AppResult<AccountPage> {
        let mut uow = self.storage.begin(Access::ReadOnly).await?;
        let filter = owner_username.filter(|name| !name.is_empty());

        let owner = match filter {
            Some(name) => uow.find_user_by_username(name).await?,
            None => None,
        };

        let (accounts, mut usernames) = match owner {
            Some(user) => {
                let user_id = user.id.unwrap_or_default();
                tracing::debug!(user_id, username = %user.username, "Listing accounts for owner");
                let accounts = uow.find_accounts_by_owner(user_id, page).await?;
                (accounts, HashMap::from([(user_id, user.username)]))
            }
            None => {
                if let Some(name) = filter {
                    tracing::debug!(username = %name, "Unknown owner filter, listing all accounts");
                }
                (uow.find_all_accounts(page).await?, HashMap::new())
            }
        };

        let mut views = Vec::with_capacity(accounts.items.len());
        for account in &accounts.items {
            let owner = self::owner_username(&mut *uow, account, &mut usernames).await?;
            views.push(annotate(&mut *uow, account, owner).await?);
        }
        uow.commit().await?;

        Ok(AccountPage {
            accounts: views,
            current_page: accounts.page,
            total_items: accounts.total_items,
            total_pages: accounts.total_pages,
        })
    }

    /// Transactions of an account, for export.
    ///
    /// An unknown account yields an empty list rather than an error.
    pub async fn list_transactions(&self, account_id: i64) -> AppResult<Vec<Transaction>> {
        let mut uow = self.storage.begin(Access::ReadOnly).await?;

        if uow.find_account_by_id(account_id).await?.is_none() {
            tracing::debug!(account_id, "Export of unknown account, returning no transactions");
            uow.commit().await?;
            return Ok(Vec::new());
        }

        let transactions = uow.transactions_of(account_id).await?;
        uow.commit().await?;
        Ok(transactions)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// A transient account with no identity. Nothing is stored.
    pub fn draft(&self) -> AccountView {
        AccountView::default()
    }

    /// Merge the view into the stored account with the same id, or insert
    /// a new account when the id is absent or unknown.
    ///
    /// The stored row stays locked from read to write, so concurrent
    /// updates of one account apply one after the other. The returned
    /// view carries no balance; editing an account does not change its
    /// transactions.
    pub async fn update(&self, view: AccountView) -> AppResult<AccountView> {
        let mut uow = self.storage.begin(Access::ReadWrite).await?;

        let existing = match view.id {
            Some(id) => uow.find_account_for_update(id).await?,
            None => None,
        };

        let account = match existing {
            Some(mut account) => {
                view.merge_into(&mut account);
                account
            }
            None => view.to_new_entity(),
        };

        let saved = uow.save_account(&account).await?;
        uow.commit().await?;

        tracing::info!(
            account_id = saved.id,
            inserted = account.id.is_none(),
            "Account saved"
        );

        Ok(AccountView::from_entity(&saved))
    }
}

// =========================================================================
// Helpers
// =========================================================================

/// Attach the owner and a freshly computed balance to an account view.
async fn annotate(
    uow: &mut dyn UnitOfWork,
    account: &Account,
    owner: Option<String>,
) -> AppResult<AccountView> {
    let transactions = match account.id {
        Some(id) => uow.transactions_of(id).await?,
        None => Vec::new(),
    };

    let balance = balance_of(account.id, &transactions)?;

    Ok(AccountView::from_entity(account)
        .with_owner_username(owner)
        .with_balance(balance))
}

fn balance_of(account_id: Option<i64>, transactions: &[Transaction]) -> AppResult<Decimal> {
    let start = Instant::now();
    let balance = compute_balance(transactions, Some(Decimal::ZERO));

    tracing::debug!(
        account_id,
        transactions = transactions.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Balance computed"
    );

    Ok(balance?)
}

async fn owner_username(
    uow: &mut dyn UnitOfWork,
    account: &Account,
    cache: &mut HashMap<i64, String>,
) -> AppResult<Option<String>> {
    let Some(user_id) = account.user_id else {
        return Ok(None);
    };

    if let Some(name) = cache.get(&user_id) {
        return Ok(Some(name.clone()));
    }

    let username = uow.find_user_by_id(user_id).await?.map(|u| u.username);
    if let Some(ref name) = username {
        cache.insert(user_id, name.clone());
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LedgerError, NewTransaction, Page, TransactionType, User};
    use crate::storage::{MemoryStorage, StorageError, StorageResult};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct Fixture {
        storage: Arc<MemoryStorage>,
        service: AccountService,
        alice: i64,
        bob: i64,
    }

    async fn user(storage: &MemoryStorage, username: &str) -> i64 {
        let mut uow = storage.begin(Access::ReadWrite).await.unwrap();
        let user = uow
            .save_user(&User {
                id: None,
                username: username.to_string(),
                email: None,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        user.id.unwrap()
    }

    async fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let service = AccountService::new(storage.clone());
        let alice = user(&storage, "alice").await;
        let bob = user(&storage, "bob").await;

        Fixture {
            storage,
            service,
            alice,
            bob,
        }
    }

    async fn account(storage: &MemoryStorage, name: &str, user_id: i64) -> i64 {
        let mut uow = storage.begin(Access::ReadWrite).await.unwrap();
        let account = uow
            .save_account(&Account {
                id: None,
                name: name.to_string(),
                description: None,
                user_id: Some(user_id),
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        account.id.unwrap()
    }

    async fn record(
        storage: &MemoryStorage,
        account_id: i64,
        user_id: i64,
        amount: Decimal,
        kind: TransactionType,
    ) {
        let mut uow = storage.begin(Access::ReadWrite).await.unwrap();
        uow.insert_transaction(&NewTransaction {
            amount,
            kind,
            account_id,
            user_id,
            description: None,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();
    }

    /// Storage whose reads find one account but fail on everything else
    struct FailingStorage;

    struct FailingUnitOfWork;

    fn io_failure<T>() -> StorageResult<T> {
        Err(StorageError::Database(sqlx::Error::PoolTimedOut))
    }

    #[async_trait]
    impl Storage for FailingStorage {
        async fn begin(&self, _access: Access) -> StorageResult<Box<dyn UnitOfWork>> {
            Ok(Box::new(FailingUnitOfWork))
        }
    }

    #[async_trait]
    impl UnitOfWork for FailingUnitOfWork {
        async fn find_account_by_id(&mut self, id: i64) -> StorageResult<Option<Account>> {
            Ok(Some(Account {
                id: Some(id),
                name: "Checking".to_string(),
                ..Default::default()
            }))
        }

        async fn find_account_for_update(&mut self, id: i64) -> StorageResult<Option<Account>> {
            self.find_account_by_id(id).await
        }

        async fn find_accounts_by_owner(
            &mut self,
            _user_id: i64,
            _page: PageRequest,
        ) -> StorageResult<Page<Account>> {
            io_failure()
        }

        async fn find_all_accounts(&mut self, _page: PageRequest) -> StorageResult<Page<Account>> {
            io_failure()
        }

        async fn save_account(&mut self, _account: &Account) -> StorageResult<Account> {
            io_failure()
        }

        async fn transactions_of(&mut self, _account_id: i64) -> StorageResult<Vec<Transaction>> {
            io_failure()
        }

        async fn find_user_by_id(&mut self, _id: i64) -> StorageResult<Option<User>> {
            Ok(None)
        }

        async fn find_user_for_update(&mut self, _id: i64) -> StorageResult<Option<User>> {
            Ok(None)
        }

        async fn find_user_by_username(&mut self, _username: &str) -> StorageResult<Option<User>> {
            Ok(None)
        }

        async fn find_all_users(&mut self) -> StorageResult<Vec<User>> {
            io_failure()
        }

        async fn save_user(&mut self, _user: &User) -> StorageResult<User> {
            io_failure()
        }

        async fn find_transaction_by_id(
            &mut self,
            _id: i64,
        ) -> StorageResult<Option<Transaction>> {
            io_failure()
        }

        async fn insert_transaction(
            &mut self,
            _new: &NewTransaction,
        ) -> StorageResult<Transaction> {
            io_failure()
        }

        async fn commit(&mut self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_by_id_attaches_balance() {
        let f = fixture().await;
        let id = account(&f.storage, "Checking", f.alice).await;
        record(&f.storage, id, f.alice, dec!(100), TransactionType::Income).await;
        record(&f.storage, id, f.alice, dec!(30), TransactionType::Expense).await;
        record(&f.storage, id, f.alice, dec!(5), TransactionType::Income).await;

        let view = f.service.get_by_id(id).await.unwrap();
        assert_eq!(view.id, Some(id));
        assert_eq!(view.calculated_balance, Some(dec!(75)));
        assert_eq!(view.owner_username, Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_get_by_id_only_counts_own_transactions() {
        let f = fixture().await;
        let mine = account(&f.storage, "Mine", f.alice).await;
        let theirs = account(&f.storage, "Theirs", f.bob).await;
        record(&f.storage, mine, f.alice, dec!(10), TransactionType::Income).await;
        record(&f.storage, theirs, f.bob, dec!(500), TransactionType::Income).await;

        let view = f.service.get_by_id(mine).await.unwrap();
        assert_eq!(view.calculated_balance, Some(dec!(10)));
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_not_found() {
        let f = fixture().await;
        let result = f.service.get_by_id(404).await;
        assert!(matches!(result, Err(AppError::AccountNotFound(404))));
    }

    #[tokio::test]
    async fn test_account_without_transactions_has_zero_balance() {
        let f = fixture().await;
        let id = account(&f.storage, "Empty", f.alice).await;
        let view = f.service.get_by_id(id).await.unwrap();
        assert_eq!(view.calculated_balance, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_list_all_filters_by_known_owner() {
        let f = fixture().await;
        let a1 = account(&f.storage, "A1", f.alice).await;
        account(&f.storage, "B1", f.bob).await;
        let a2 = account(&f.storage, "A2", f.alice).await;
        record(&f.storage, a2, f.alice, dec!(12.5), TransactionType::Expense).await;

        let page = f
            .service
            .list_all(PageRequest::new(0, 100), Some("alice"))
            .await
            .unwrap();
        let ids: Vec<_> = page.accounts.iter().filter_map(|a| a.id).collect();
        assert_eq!(ids, vec![a1, a2]);
        assert_eq!(page.total_items, 2);
        assert_eq!(page.accounts[1].calculated_balance, Some(dec!(-12.5)));
        assert!(page.accounts.iter().all(|a| a.owner_username.as_deref() == Some("alice")));
    }

    #[tokio::test]
    async fn test_list_all_unknown_or_empty_filter_lists_everything() {
        let f = fixture().await;
        account(&f.storage, "A1", f.alice).await;
        account(&f.storage, "B1", f.bob).await;

        let request = PageRequest::new(0, 100);
        let unfiltered = f.service.list_all(request, None).await.unwrap();
        let empty = f.service.list_all(request, Some("")).await.unwrap();
        let unknown = f.service.list_all(request, Some("nobody")).await.unwrap();

        assert_eq!(unfiltered.accounts.len(), 2);
        assert_eq!(empty, unfiltered);
        assert_eq!(unknown, unfiltered);
        assert!(unfiltered.accounts.iter().all(|a| a.calculated_balance.is_some()));
    }

    #[tokio::test]
    async fn test_list_all_reports_page_metadata() {
        let f = fixture().await;
        for i in 0..5 {
            account(&f.storage, &format!("acc-{i}"), f.alice).await;
        }

        let page = f.service.list_all(PageRequest::new(2, 2), None).await.unwrap();
        assert_eq!(page.accounts.len(), 1);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_draft_writes_nothing() {
        let f = fixture().await;
        for _ in 0..3 {
            let draft = f.service.draft();
            assert_eq!(draft, AccountView::default());
            assert!(draft.id.is_none());
        }
        assert_eq!(f.storage.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_existing_merges_and_keeps_id() {
        let f = fixture().await;
        let id = account(&f.storage, "Checking", f.alice).await;

        let saved = f
            .service
            .update(AccountView {
                id: Some(id),
                description: Some("Household".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(saved.id, Some(id));
        assert_eq!(saved.name, Some("Checking".to_string()));
        assert_eq!(saved.description, Some("Household".to_string()));
        assert_eq!(saved.user_id, Some(f.alice));
        assert!(saved.calculated_balance.is_none());
        assert_eq!(f.storage.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id_inserts() {
        let f = fixture().await;
        account(&f.storage, "Existing", f.alice).await;

        let saved = f
            .service
            .update(AccountView {
                id: Some(999),
                name: Some("Fresh".to_string()),
                user_id: Some(f.bob),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(saved.id.is_some());
        assert_ne!(saved.id, Some(999));
        assert_eq!(saved.name, Some("Fresh".to_string()));
        assert_eq!(f.storage.account_count().await, 2);
    }

    #[tokio::test]
    async fn test_list_transactions_missing_account_is_empty() {
        let f = fixture().await;
        let txs = f.service.list_transactions(12345).await.unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn test_list_transactions_returns_account_transactions() {
        let f = fixture().await;
        let id = account(&f.storage, "Checking", f.alice).await;
        record(&f.storage, id, f.bob, dec!(3), TransactionType::Income).await;

        let txs = f.service.list_transactions(id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].username, "bob");
    }

    #[tokio::test]
    async fn test_storage_failures_propagate() {
        let service = AccountService::new(Arc::new(FailingStorage));

        let result = service.list_transactions(1).await;
        assert!(matches!(result, Err(AppError::Storage(StorageError::Database(_)))));

        let result = service.list_all(PageRequest::new(0, 10), None).await;
        assert!(matches!(result, Err(AppError::Storage(StorageError::Database(_)))));

        let result = service.get_by_id(1).await;
        assert!(matches!(result, Err(AppError::Storage(StorageError::Database(_)))));
    }

    #[tokio::test]
    async fn test_list_all_owner_filter_is_matched_exactly() {
        let f = fixture().await;
        let spaced = user(&f.storage, " bob").await;
        account(&f.storage, "B1", f.bob).await;
        let own = account(&f.storage, "Spaced", spaced).await;

        let page = f
            .service
            .list_all(PageRequest::new(0, 100), Some(" bob"))
            .await
            .unwrap();
        let ids: Vec<_> = page.accounts.iter().filter_map(|a| a.id).collect();
        assert_eq!(ids, vec![own]);
        assert_eq!(page.accounts[0].owner_username, Some(" bob".to_string()));
    }

    #[tokio::test]
    async fn test_balance_overflow_is_an_error() {
        let f = fixture().await;
        let id = account(&f.storage, "Huge", f.alice).await;
        record(&f.storage, id, f.alice, Decimal::MAX, TransactionType::Income).await;
        record(&f.storage, id, f.alice, Decimal::MAX, TransactionType::Income).await;

        let result = f.service.get_by_id(id).await;
        assert!(matches!(result, Err(AppError::Ledger(LedgerError::Overflow { .. }))));

        let result = f.service.list_all(PageRequest::new(0, 10), None).await;
        assert!(matches!(result, Err(AppError::Ledger(_))));
    }
}
