//! ledger_books Library
//!
//! Users, accounts and transactions, with account balances derived from
//! transactions on every read.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod export;
pub mod services;
pub mod storage;

mod error;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{compute_balance, Account, AccountView, Transaction, TransactionType, User};
