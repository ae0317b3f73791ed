//! Domain module
//!
//! Entities, outward views and the ledger evaluator.

pub mod ledger;
pub mod models;
pub mod views;

pub use ledger::{check_amount, compute_balance, LedgerError};
pub use models::{Account, NewTransaction, Page, PageRequest, Transaction, TransactionType, User};
pub use views::{AccountPage, AccountView, UserView};
