//! Storage Errors
//!
//! Error types for storage operations.

/// Errors that can occur in the storage layer
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A unique column already holds this value
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// A referenced row does not exist
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// Update of a row that is not there
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// A value does not fit its column
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// The unit of work was already committed
    #[error("Unit of work already finished")]
    Finished,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data does not map onto an entity
    #[error("Corrupt data: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Translate constraint violations into their dedicated variants.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => return StorageError::Duplicate(message),
                // foreign_key_violation
                Some("23503") => return StorageError::MissingReference(message),
                // numeric_value_out_of_range
                Some("22003") => return StorageError::OutOfRange(message),
                _ => {}
            }
        }
        StorageError::Database(err)
    }
}

/// Storage-layer Result type
pub type StorageResult<T> = Result<T, StorageError>;
