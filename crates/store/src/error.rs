use thiserror::Error;

/// Errors that can occur when talking to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write collided with a uniqueness constraint, usually because a
    /// concurrent unit of work committed first.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A stored row could not be decoded into a record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
