//! Ledger Evaluator
//!
//! Derives a signed running balance from an account's transactions.
//! Arithmetic stays in `Decimal` so repeated add/subtract never drifts.

use rust_decimal::Decimal;

use super::models::{Transaction, TransactionType};

/// Largest magnitude a single recorded amount may have (10^12)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Errors raised while evaluating a ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Amount exceeds maximum allowed magnitude ({MAX_AMOUNT}, got {0})")]
    AmountTooLarge(Decimal),

    #[error("Balance out of range at transaction {transaction_id}")]
    Overflow { transaction_id: i64 },
}

/// Reject amounts whose magnitude exceeds [`MAX_AMOUNT`].
///
/// The sign is not checked; negative amounts are accepted as given.
pub fn check_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount.abs() > MAX_AMOUNT {
        return Err(LedgerError::AmountTooLarge(amount));
    }
    Ok(amount)
}

/// Fold `transactions` into a balance, starting from `initial`.
///
/// A missing `initial` is treated as zero. `INCOME` adds its amount,
/// `EXPENSE` subtracts it, and any other tag is a no-op. Amounts are
/// taken as given, including negative ones.
///
/// # Errors
/// - `LedgerError::Overflow` if the running balance leaves the range
///   `Decimal` can represent
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use ledger_books::domain::compute_balance;
///
/// assert_eq!(compute_balance(&[], None), Ok(Decimal::ZERO));
/// assert_eq!(compute_balance(&[], Some(Decimal::new(42, 0))), Ok(Decimal::new(42, 0)));
/// ```
pub fn compute_balance(
    transactions: &[Transaction],
    initial: Option<Decimal>,
) -> Result<Decimal, LedgerError> {
    transactions
        .iter()
        .try_fold(initial.unwrap_or(Decimal::ZERO), |balance, tx| {
            apply_transaction(balance, &tx.kind, tx.amount)
                .ok_or(LedgerError::Overflow { transaction_id: tx.id })
        })
}

fn apply_transaction(balance: Decimal, kind: &TransactionType, amount: Decimal) -> Option<Decimal> {
    match kind {
        TransactionType::Income => balance.checked_add(amount),
        TransactionType::Expense => balance.checked_sub(amount),
        TransactionType::Other(_) => Some(balance),
    }
}
