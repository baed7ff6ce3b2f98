//! Error types for the storage layer.

/// Errors that can occur in storage operations.
///
/// Any of these during a commit is fatal to the tick: the transaction rolls
/// back, no log frames survive, and the engine surfaces the error rather
/// than retrying.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The database schema version does not match this binary. Fatal to
    /// the process.
    #[error("schema version mismatch: database has {found}, binary expects {expected}")]
    SchemaMismatch {
        /// Version found in the database.
        found: i64,
        /// Version this binary was built for.
        expected: i64,
    },

    /// JSON (de)serialization of a stored column failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The audit log or snapshot file could not be written or repaired.
    #[error("event log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row is inconsistent with the domain model.
    #[error("corrupt row in {table}: {detail}")]
    CorruptRow {
        /// The offending table.
        table: &'static str,
        /// What was wrong.
        detail: String,
    },
}
