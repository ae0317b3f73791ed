//! Transaction Service
//!
//! Records transactions against existing accounts. Stored transactions
//! are never changed afterwards.

use std::sync::Arc;

use crate::domain::{check_amount, NewTransaction, Transaction};
use crate::error::{AppError, AppResult};
use crate::storage::{Access, Storage};

/// Service for recording and reading transactions
#[derive(Clone)]
pub struct TransactionService {
    storage: Arc<dyn Storage>,
}

impl TransactionService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Record a new transaction.
    ///
    /// # Errors
    /// - `AppError::Ledger` if the amount's magnitude is out of bounds
    /// - `AppError::AccountNotFound` if the account does not exist
    /// - `AppError::UserNotFound` if the recording user does not exist
    pub async fn record(&self, new: NewTransaction) -> AppResult<Transaction> {
        check_amount(new.amount)?;

        let mut uow = self.storage.begin(Access::ReadWrite).await?;

        if uow.find_account_by_id(new.account_id).await?.is_none() {
            return Err(AppError::AccountNotFound(new.account_id));
        }
        if uow.find_user_by_id(new.user_id).await?.is_none() {
            return Err(AppError::UserNotFound(new.user_id));
        }

        let transaction = uow.insert_transaction(&new).await?;
        uow.commit().await?;

        tracing::info!(
            transaction_id = transaction.id,
            account_id = transaction.account_id,
            kind = %transaction.kind,
            amount = %transaction.amount,
            "Transaction recorded"
        );

        Ok(transaction)
    }

    /// Get transaction by id
    pub async fn get(&self, transaction_id: i64) -> AppResult<Transaction> {
        let mut uow = self.storage.begin(Access::ReadOnly).await?;
        let transaction = uow
            .find_transaction_by_id(transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound(transaction_id))?;
        uow.commit().await?;

        Ok(transaction)
    }
}
