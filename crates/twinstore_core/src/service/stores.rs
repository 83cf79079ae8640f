//! Wiring of store handles into per-record-type orchestrators.
//!
//! # Invariants
//! - Each record type uses the same table name in the relational store and
//!   collection name in the document store.
//! - The configured primary kind decides the write and compensation order
//!   for every record type built from one `StoreHandles`.

use crate::db::{
    ensure_collections, open_db, open_db_in_memory, open_document_db,
    open_document_db_in_memory, share, SharedConnection,
};
use crate::model::customer::Customer;
use crate::model::entity::Entity;
use crate::model::session::Session;
use crate::repo::document_store::DocumentStore;
use crate::repo::sql_record::SqlRecord;
use crate::repo::sqlite_store::SqliteStore;
use crate::repo::{RecordStore, StoreResult};
use crate::service::dual_store::DualStore;
use crate::service::read_source::{ReadPolicy, StoreKind};
use redb::Database;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const CUSTOMERS: &str = "customers";
pub const SESSIONS: &str = "sessions";

/// Opened backend handles plus the configured store order.
#[derive(Clone)]
pub struct StoreHandles {
    sql: SharedConnection,
    documents: Arc<Database>,
    primary: StoreKind,
}

impl StoreHandles {
    pub fn new(sql: SharedConnection, documents: Arc<Database>, primary: StoreKind) -> Self {
        Self {
            sql,
            documents,
            primary,
        }
    }

    /// Opens both stores from files and prepares their schemas.
    pub fn open(
        sqlite_path: impl AsRef<Path>,
        document_path: impl AsRef<Path>,
        primary: StoreKind,
    ) -> StoreResult<Self> {
        let sql = share(open_db(sqlite_path)?);
        let documents = open_document_db(document_path)?;
        ensure_collections(&documents, &[CUSTOMERS, SESSIONS])?;
        Ok(Self::new(sql, Arc::new(documents), primary))
    }

    /// Opens both stores in memory.
    pub fn open_in_memory(primary: StoreKind) -> StoreResult<Self> {
        let sql = share(open_db_in_memory()?);
        let documents = open_document_db_in_memory()?;
        ensure_collections(&documents, &[CUSTOMERS, SESSIONS])?;
        Ok(Self::new(sql, Arc::new(documents), primary))
    }

    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy::new(self.primary)
    }

    pub fn customers(&self) -> StoreResult<DualStore<Customer>> {
        self.dual(CUSTOMERS, "email")
    }

    pub fn sessions(&self) -> StoreResult<DualStore<Session>> {
        self.dual(SESSIONS, "token")
    }

    fn dual<T>(&self, name: &str, unique_field: &str) -> StoreResult<DualStore<T>>
    where
        T: Entity + SqlRecord + Serialize + DeserializeOwned + 'static,
    {
        let relational: Arc<dyn RecordStore<T>> =
            Arc::new(SqliteStore::try_new(self.sql.clone(), name)?);
        let document: Arc<dyn RecordStore<T>> = Arc::new(
            DocumentStore::try_new(self.documents.clone(), name)?.with_unique_field(unique_field)?,
        );

        Ok(match self.primary {
            StoreKind::Relational => DualStore::new(relational, document),
            StoreKind::Document => DualStore::new(document, relational),
        })
    }
}
