//! Services module
//!
//! Operations exposed to the transport layer. Each call is one request's
//! worth of work against the storage layer.

pub mod account;
pub mod transaction;
pub mod user;

pub use account::AccountService;
pub use transaction::TransactionService;
pub use user::UserService;
