//! Store driver contract and its two implementations.
//!
//! # Responsibility
//! - Define the uniform operation set every backend offers for one record
//!   type bound to one table/collection.
//! - Translate each backend's native "missing" signal into
//!   `StoreError::NotFound`.
//!
//! # Invariants
//! - Live-scope operations never see or touch soft-deleted records.
//! - Admin-scope operations ignore the soft-delete marker.
//! - A driver has no knowledge of any other driver.

use crate::db::DbError;
use crate::model::entity::Entity;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod document_store;
pub mod sql_record;
pub mod sqlite_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Driver-level error shared by all backends.
#[derive(Debug)]
pub enum StoreError {
    /// No record matched the id/email in the requested scope.
    NotFound { collection: String, key: String },
    /// A unique field (id, email, token) already holds this value.
    Duplicate { collection: String, field: String },
    Sqlite(rusqlite::Error),
    Document(redb::Error),
    Serialization(serde_json::Error),
    InvalidData(String),
    /// Table/collection/field identifiers must be plain snake_case names.
    InvalidName(String),
}

impl StoreError {
    pub fn not_found(collection: &str, key: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { collection, key } => {
                write!(f, "record not found in {collection}: {key}")
            }
            Self::Duplicate { collection, field } => {
                write!(f, "duplicate value for unique field {collection}.{field}")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "document store error: {err}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::InvalidName(name) => write!(f, "invalid table or field name `{name}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::NotFound { .. }
            | Self::Duplicate { .. }
            | Self::InvalidData(_)
            | Self::InvalidName(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::Sqlite(err),
            DbError::Document(err) => Self::Document(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

macro_rules! document_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(value: $source) -> Self {
                    Self::Document(value.into())
                }
            }
        )+
    };
}

document_error_from!(
    redb::Error,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Uniform operation set of one backend for one record type.
///
/// Implementations are shared between threads; each call acquires and
/// releases whatever backend resources it needs.
pub trait RecordStore<T: Entity>: Send + Sync {
    /// Table or collection this driver is bound to.
    fn collection(&self) -> &str;

    /// Inserts a new record. Fails with `Duplicate` on unique violations.
    fn create(&self, entity: &T) -> StoreResult<()>;
    /// Lists live records.
    fn get(&self) -> StoreResult<Vec<T>>;
    fn get_one(&self, id: &str) -> StoreResult<T>;
    fn get_by_email(&self, email: &str) -> StoreResult<T>;
    /// Replaces every field of a live record with the payload's values.
    fn update(&self, id: &str, entity: &T) -> StoreResult<()>;
    /// Marks a live record deleted as of now.
    fn soft_delete(&self, id: &str) -> StoreResult<()>;
    /// Physically removes a record, live or soft-deleted.
    fn hard_delete(&self, id: &str) -> StoreResult<()>;

    /// Lists all records including soft-deleted ones.
    fn admin_get(&self) -> StoreResult<Vec<T>>;
    fn admin_get_one(&self, id: &str) -> StoreResult<T>;
    fn admin_get_by_email(&self, email: &str) -> StoreResult<T>;
    /// Replaces every field of a record regardless of its delete marker.
    fn admin_update(&self, id: &str, entity: &T) -> StoreResult<()>;
}

/// Scope of a driver query with respect to the soft-delete marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Live,
    Any,
}

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("identifier pattern compiles"));

pub(crate) fn validate_identifier(name: &str) -> StoreResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}
