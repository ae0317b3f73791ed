//! CSV export
//!
//! Writes transactions as `id,amount,ownerUsername,type` records with no
//! header row and CRLF line endings, the layout existing exports use.

use std::io::Write;

use crate::domain::Transaction;
use crate::error::AppResult;

/// Write one record per transaction. Returns the number of records.
pub fn write_transactions_csv<W: Write>(
    transactions: &[Transaction],
    writer: W,
) -> AppResult<usize> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    for transaction in transactions {
        csv_writer.write_record([
            transaction.id.to_string(),
            transaction.amount.to_string(),
            transaction.username.clone(),
            transaction.kind.to_string(),
        ])?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(transactions.len())
}

/// Render transactions into an in-memory CSV document.
pub fn transactions_to_csv(transactions: &[Transaction]) -> AppResult<Vec<u8>> {
    let mut buffer = Vec::new();
    write_transactions_csv(transactions, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionType;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tx(id: i64, amount: Decimal, username: &str, kind: TransactionType) -> Transaction {
        Transaction {
            id,
            amount,
            kind,
            account_id: 1,
            user_id: 1,
            username: username.to_string(),
            description: Some("ignored".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_column_order_and_no_header() {
        let txs = vec![
            tx(1, dec!(100.00), "alice", TransactionType::Income),
            tx(2, dec!(30.5), "bob", TransactionType::Expense),
        ];
        let bytes = transactions_to_csv(&txs).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "1,100.00,alice,INCOME\r\n2,30.5,bob,EXPENSE\r\n"
        );
    }

    #[test]
    fn test_fields_are_quoted_when_needed() {
        let txs = vec![tx(3, dec!(1), "doe, jane", TransactionType::Other("GIFT".into()))];
        let bytes = transactions_to_csv(&txs).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "3,1,\"doe, jane\",GIFT\r\n");
    }

    #[test]
    fn test_empty_export() {
        let mut buffer = Vec::new();
        let written = write_transactions_csv(&[], &mut buffer).unwrap();
        assert_eq!(written, 0);
        assert!(buffer.is_empty());
    }
}
