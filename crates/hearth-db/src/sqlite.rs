//! SQLite pool configuration and schema management.
//!
//! The writer uses a single-connection pool (the engine is single-writer
//! per world); readers get their own read-only pool and see consistent
//! point-in-time views through WAL's multi-version read path without ever
//! blocking the writer.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::error::DbError;

/// Schema version this binary expects.
pub const SCHEMA_VERSION: i64 = 1;

/// Default busy timeout for reader connections.
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Open (creating if missing) the writer pool for `world.db` under `dir`
/// and run migrations.
pub async fn open_writer(dir: &Path) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(&db_url(dir))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    check_schema_version(&pool).await?;

    tracing::info!(dir = %dir.display(), "storage opened");
    Ok(pool)
}

/// Open a read-only pool onto the same database for observer queries.
pub async fn open_reader(dir: &Path) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(&db_url(dir))?
        .read_only(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Verify the stored schema version matches this binary. A mismatch is
/// fatal to the process -- there is no in-place upgrade path.
pub async fn check_schema_version(pool: &SqlitePool) -> Result<(), DbError> {
    let row = sqlx::query("SELECT MAX(version) AS version FROM schema_version")
        .fetch_one(pool)
        .await?;
    let found: i64 = row.try_get("version")?;
    if found == SCHEMA_VERSION {
        Ok(())
    } else {
        Err(DbError::SchemaMismatch {
            found,
            expected: SCHEMA_VERSION,
        })
    }
}

/// The sqlite connection URL for a world directory.
pub fn db_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("world.db").display())
}
