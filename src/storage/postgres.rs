//! PostgreSQL storage
//!
//! sqlx adapter for the storage contract. Each unit of work is one
//! database transaction. Transaction lookups go through the `account_id`
//! index; nothing here scans the full transaction table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres};

use crate::domain::{Account, NewTransaction, Page, PageRequest, Transaction, User};

use super::{Access, Storage, StorageError, StorageResult, UnitOfWork};

type AccountRow = (i64, String, Option<String>, Option<i64>);
type UserRow = (i64, String, Option<String>);
type TransactionRow = (
    i64,
    Decimal,
    String,
    i64,
    i64,
    String,
    Option<String>,
    DateTime<Utc>,
);

const TRANSACTION_COLUMNS: &str = r#"
    t.id, t.amount, t.type, t.account_id, t.user_id, u.username, t.description, t.created_at
"#;

fn account_from_row((id, name, description, user_id): AccountRow) -> Account {
    Account {
        id: Some(id),
        name,
        description,
        user_id,
    }
}

fn user_from_row((id, username, email): UserRow) -> User {
    User {
        id: Some(id),
        username,
        email,
    }
}

fn transaction_from_row(
    (id, amount, kind, account_id, user_id, username, description, created_at): TransactionRow,
) -> Transaction {
    Transaction {
        id,
        amount,
        kind: kind.into(),
        account_id,
        user_id,
        username,
        description,
        created_at,
    }
}

fn count_to_u64(count: i64) -> StorageResult<u64> {
    u64::try_from(count).map_err(|_| StorageError::Corrupt(format!("negative row count {count}")))
}

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Create a new PgStorage with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn begin(&self, access: Access) -> StorageResult<Box<dyn UnitOfWork>> {
        let mut tx = self.pool.begin().await?;

        // Read-committed suffices for writes, which lock what they read.
        // Reads get one snapshot for the whole unit of work.
        if access == Access::ReadOnly {
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await?;
        }

        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

/// Unit of work over one database transaction
struct PgUnitOfWork {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> StorageResult<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or(StorageError::Finished)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_account_by_id(&mut self, id: i64) -> StorageResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, name, description, user_id FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(row.map(account_from_row))
    }

    async fn find_account_for_update(&mut self, id: i64) -> StorageResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, name, description, user_id FROM accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(row.map(account_from_row))
    }

    async fn find_accounts_by_owner(
        &mut self,
        user_id: i64,
        page: PageRequest,
    ) -> StorageResult<Page<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, user_id
            FROM accounts
            WHERE user_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.conn()?)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.conn()?)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(account_from_row).collect(),
            page,
            count_to_u64(total)?,
        ))
    }

    async fn find_all_accounts(&mut self, page: PageRequest) -> StorageResult<Page<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, user_id
            FROM accounts
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.conn()?)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.conn()?)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(account_from_row).collect(),
            page,
            count_to_u64(total)?,
        ))
    }

    async fn save_account(&mut self, account: &Account) -> StorageResult<Account> {
        let conn = self.conn()?;

        let row: Option<AccountRow> = match account.id {
            None => sqlx::query_as(
                r#"
                INSERT INTO accounts (name, description, user_id)
                VALUES ($1, $2, $3)
                RETURNING id, name, description, user_id
                "#,
            )
            .bind(&account.name)
            .bind(&account.description)
            .bind(account.user_id)
            .fetch_optional(conn)
            .await
            .map_err(StorageError::from_sqlx)?,
            Some(id) => sqlx::query_as(
                r#"
                UPDATE accounts
                SET name = $2, description = $3, user_id = $4, updated_at = NOW()
                WHERE id = $1
                RETURNING id, name, description, user_id
                "#,
            )
            .bind(id)
            .bind(&account.name)
            .bind(&account.description)
            .bind(account.user_id)
            .fetch_optional(conn)
            .await
            .map_err(StorageError::from_sqlx)?,
        };

        let row = row.ok_or_else(|| {
            StorageError::RowNotFound(format!("account {}", account.id.unwrap_or_default()))
        })?;

        tracing::debug!(account_id = row.0, "Account saved");
        Ok(account_from_row(row))
    }

    async fn transactions_of(&mut self, account_id: i64) -> StorageResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            JOIN users u ON u.id = t.user_id
            WHERE t.account_id = $1
            ORDER BY t.id
            "#
        ))
        .bind(account_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(rows.into_iter().map(transaction_from_row).collect())
    }

    async fn find_user_by_id(&mut self, id: i64) -> StorageResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, email FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_user_for_update(&mut self, id: i64) -> StorageResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, email FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_user_by_username(&mut self, username: &str) -> StorageResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, email FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_all_users(&mut self) -> StorageResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT id, username, email FROM users ORDER BY id")
            .fetch_all(self.conn()?)
            .await?;

        Ok(rows.into_iter().map(user_from_row).collect())
    }

    async fn save_user(&mut self, user: &User) -> StorageResult<User> {
        let conn = self.conn()?;

        let row: Option<UserRow> = match user.id {
            None => sqlx::query_as(
                r#"
                INSERT INTO users (username, email)
                VALUES ($1, $2)
                RETURNING id, username, email
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .fetch_optional(conn)
            .await
            .map_err(StorageError::from_sqlx)?,
            Some(id) => sqlx::query_as(
                r#"
                UPDATE users SET username = $2, email = $3
                WHERE id = $1
                RETURNING id, username, email
                "#,
            )
            .bind(id)
            .bind(&user.username)
            .bind(&user.email)
            .fetch_optional(conn)
            .await
            .map_err(StorageError::from_sqlx)?,
        };

        let row = row.ok_or_else(|| {
            StorageError::RowNotFound(format!("user {}", user.id.unwrap_or_default()))
        })?;

        Ok(user_from_row(row))
    }

    async fn find_transaction_by_id(&mut self, id: i64) -> StorageResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            JOIN users u ON u.id = t.user_id
            WHERE t.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(row.map(transaction_from_row))
    }

    async fn insert_transaction(&mut self, new: &NewTransaction) -> StorageResult<Transaction> {
        let row: TransactionRow = sqlx::query_as(&format!(
            r#"
            WITH t AS (
                INSERT INTO transactions (amount, type, account_id, user_id, description)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {TRANSACTION_COLUMNS}
            FROM t
            JOIN users u ON u.id = t.user_id
            "#
        ))
        .bind(new.amount)
        .bind(new.kind.as_str())
        .bind(new.account_id)
        .bind(new.user_id)
        .bind(&new.description)
        .fetch_one(self.conn()?)
        .await
        .map_err(StorageError::from_sqlx)?;

        tracing::debug!(
            transaction_id = row.0,
            account_id = new.account_id,
            "Transaction recorded"
        );
        Ok(transaction_from_row(row))
    }

    async fn commit(&mut self) -> StorageResult<()> {
        let tx = self.tx.take().ok_or(StorageError::Finished)?;
        tx.commit().await?;
        Ok(())
    }
}
