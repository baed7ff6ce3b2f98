//! Embedded storage for the Hearth simulation.
//!
//! The authoritative state lives in a single SQLite database (WAL journal
//! mode) beside an append-only JSONL audit log and periodic whole-database
//! snapshots. All writes for one tick commit as one transaction; the log is
//! framed per line so a torn write is detected and discarded on reopen.
//! Recovery uses the database alone -- the log is never replayed.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! so builds never need a live database. All queries are parameterized.
//!
//! # Modules
//!
//! - [`sqlite`] -- pool configuration, migrations, schema version check
//! - [`store`] -- the single-writer [`Store`]: load, commit, snapshot
//! - [`event_log`] -- framed JSONL audit log
//! - [`read`] -- [`ReadStore`]: concurrent observer queries over WAL MVCC
//! - [`status`] -- per-agent read-only `.status` files

pub mod error;
pub mod event_log;
mod load;
pub mod read;
pub mod sqlite;
pub mod status;
pub mod store;

pub use error::DbError;
pub use event_log::EventLog;
pub use read::ReadStore;
pub use store::Store;
