//! Export module
//!
//! Tabular renderings of ledger data for download.

pub mod csv;

pub use self::csv::{transactions_to_csv, write_transactions_csv};
