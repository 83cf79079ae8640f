//! Storage bootstrap for both backends.
//!
//! # Responsibility
//! - Open and configure the relational (SQLite) connection and apply schema
//!   migrations in deterministic order.
//! - Open the embedded document database and create its collections.
//!
//! # Invariants
//! - Relational migration version is tracked via `PRAGMA user_version`.
//! - Handles are created explicitly and injected into store drivers; nothing
//!   in core reads a process-wide database handle.

use parking_lot::Mutex;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod document;
pub mod migrations;
mod open;

pub use document::{ensure_collections, open_document_db, open_document_db_in_memory};
pub use open::{open_db, open_db_in_memory};

/// Relational connection shared by every SQLite store driver of a process.
pub type SharedConnection = Arc<Mutex<Connection>>;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Document(redb::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "document database error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

macro_rules! document_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for DbError {
                fn from(value: $source) -> Self {
                    Self::Document(value.into())
                }
            }
        )+
    };
}

document_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::CommitError,
);

/// Wraps a migrated connection for sharing between store drivers.
pub fn share(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}
