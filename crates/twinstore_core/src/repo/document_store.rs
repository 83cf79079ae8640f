//! Document store driver backed by an embedded `redb` database.
//!
//! # Responsibility
//! - Implement `RecordStore` over one collection of JSON documents keyed by
//!   record id.
//! - Enforce declared unique fields, which the key-value engine does not know
//!   about.
//!
//! # Invariants
//! - A document is live when its `deleted_at` field is null or missing.
//! - The stored document's `id` always equals its key.
//! - Every mutation runs in a single write transaction; a failed check
//!   leaves the collection untouched.

use crate::model::entity::{now, Entity};
use crate::repo::{validate_identifier, RecordStore, Scope, StoreError, StoreResult};
use redb::{Database, ReadableTable, Table, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

type Collection<'txn> = Table<'txn, &'static str, &'static [u8]>;

const ID_FIELD: &str = "id";
const DELETED_AT_FIELD: &str = "deleted_at";
const EMAIL_FIELD: &str = "email";

/// Document-backed driver for one record type bound to one collection.
pub struct DocumentStore<T> {
    db: Arc<Database>,
    collection: String,
    unique_fields: Vec<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T> DocumentStore<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    /// Binds a driver to a collection, creating the collection if missing.
    pub fn try_new(db: Arc<Database>, collection: impl Into<String>) -> StoreResult<Self> {
        let collection = collection.into();
        validate_identifier(&collection)?;
        crate::db::ensure_collections(&db, &[collection.as_str()])?;

        Ok(Self {
            db,
            collection,
            unique_fields: Vec::new(),
            _record: PhantomData,
        })
    }

    /// Declares a top-level document field whose values must be unique.
    pub fn with_unique_field(mut self, field: &str) -> StoreResult<Self> {
        validate_identifier(field)?;
        if !self.unique_fields.iter().any(|known| known == field) {
            self.unique_fields.push(field.to_string());
        }
        Ok(self)
    }

    fn definition(&self) -> TableDefinition<'_, &'static str, &'static [u8]> {
        TableDefinition::new(&self.collection)
    }

    fn encode(&self, id: &str, entity: &T) -> StoreResult<(Value, Vec<u8>)> {
        let mut document = serde_json::to_value(entity)?;
        let Some(fields) = document.as_object_mut() else {
            return Err(StoreError::InvalidData(format!(
                "records in {} must serialize to JSON objects",
                self.collection
            )));
        };
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        let bytes = serde_json::to_vec(&document)?;
        Ok((document, bytes))
    }

    fn decode(&self, document: Value) -> StoreResult<T> {
        Ok(serde_json::from_value(document)?)
    }

    fn read_all(&self) -> StoreResult<Vec<Value>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(self.definition())?;
        documents(&table)
    }

    fn list(&self, scope: Scope) -> StoreResult<Vec<T>> {
        self.read_all()?
            .into_iter()
            .filter(|document| in_scope(document, scope))
            .map(|document| self.decode(document))
            .collect()
    }

    fn find_by_id(&self, id: &str, scope: Scope) -> StoreResult<T> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(self.definition())?;
        let document = match table.get(id)? {
            Some(bytes) => serde_json::from_slice::<Value>(bytes.value())?,
            None => return Err(StoreError::not_found(&self.collection, id)),
        };
        if !in_scope(&document, scope) {
            return Err(StoreError::not_found(&self.collection, id));
        }
        self.decode(document)
    }

    fn find_by_email(&self, email: &str, scope: Scope) -> StoreResult<T> {
        let document = self
            .read_all()?
            .into_iter()
            .find(|document| {
                in_scope(document, scope)
                    && document.get(EMAIL_FIELD).and_then(Value::as_str) == Some(email)
            })
            .ok_or_else(|| StoreError::not_found(&self.collection, email))?;
        self.decode(document)
    }

    /// Runs `apply` inside one write transaction and commits only on success.
    fn write<R>(&self, apply: impl FnOnce(&mut Collection<'_>) -> StoreResult<R>) -> StoreResult<R> {
        let txn = self.db.begin_write()?;
        let result = {
            let mut table = txn.open_table(self.definition())?;
            apply(&mut table)?
        };
        txn.commit()?;
        Ok(result)
    }

    fn ensure_unique(&self, table: &Collection<'_>, id: &str, candidate: &Value) -> StoreResult<()> {
        if self.unique_fields.is_empty() {
            return Ok(());
        }
        for existing in documents(table)? {
            if existing.get(ID_FIELD).and_then(Value::as_str) == Some(id) {
                continue;
            }
            for field in &self.unique_fields {
                let value = candidate.get(field);
                if value.is_some_and(|value| !value.is_null()) && existing.get(field) == value {
                    return Err(StoreError::Duplicate {
                        collection: self.collection.clone(),
                        field: field.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn replace(&self, id: &str, entity: &T, scope: Scope) -> StoreResult<()> {
        let (document, bytes) = self.encode(id, entity)?;
        self.write(|table| {
            let current = load(table, id)?;
            if !current.as_ref().is_some_and(|current| in_scope(current, scope)) {
                return Err(StoreError::not_found(&self.collection, id));
            }
            self.ensure_unique(table, id, &document)?;
            table.insert(id, bytes.as_slice())?;
            Ok(())
        })
    }
}

impl<T> RecordStore<T> for DocumentStore<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    fn collection(&self) -> &str {
        &self.collection
    }

    fn create(&self, entity: &T) -> StoreResult<()> {
        let id = entity.id();
        let (document, bytes) = self.encode(id, entity)?;
        self.write(|table| {
            if load(table, id)?.is_some() {
                return Err(StoreError::Duplicate {
                    collection: self.collection.clone(),
                    field: ID_FIELD.to_string(),
                });
            }
            self.ensure_unique(table, id, &document)?;
            table.insert(id, bytes.as_slice())?;
            Ok(())
        })
    }

    fn get(&self) -> StoreResult<Vec<T>> {
        self.list(Scope::Live)
    }

    fn get_one(&self, id: &str) -> StoreResult<T> {
        self.find_by_id(id, Scope::Live)
    }

    fn get_by_email(&self, email: &str) -> StoreResult<T> {
        self.find_by_email(email, Scope::Live)
    }

    fn update(&self, id: &str, entity: &T) -> StoreResult<()> {
        self.replace(id, entity, Scope::Live)
    }

    fn soft_delete(&self, id: &str) -> StoreResult<()> {
        self.write(|table| {
            let document = match load(table, id)? {
                Some(document) if in_scope(&document, Scope::Live) => document,
                _ => return Err(StoreError::not_found(&self.collection, id)),
            };
            let mut record = self.decode(document)?;
            record.set_deleted(Some(now()));
            let (_, bytes) = self.encode(id, &record)?;
            table.insert(id, bytes.as_slice())?;
            Ok(())
        })
    }

    fn hard_delete(&self, id: &str) -> StoreResult<()> {
        self.write(|table| {
            let existed = table.remove(id)?.is_some();
            if existed {
                Ok(())
            } else {
                Err(StoreError::not_found(&self.collection, id))
            }
        })
    }

    fn admin_get(&self) -> StoreResult<Vec<T>> {
        self.list(Scope::Any)
    }

    fn admin_get_one(&self, id: &str) -> StoreResult<T> {
        self.find_by_id(id, Scope::Any)
    }

    fn admin_get_by_email(&self, email: &str) -> StoreResult<T> {
        self.find_by_email(email, Scope::Any)
    }

    fn admin_update(&self, id: &str, entity: &T) -> StoreResult<()> {
        self.replace(id, entity, Scope::Any)
    }
}

fn in_scope(document: &Value, scope: Scope) -> bool {
    match scope {
        Scope::Any => true,
        Scope::Live => document.get(DELETED_AT_FIELD).map_or(true, Value::is_null),
    }
}

fn load(table: &Collection<'_>, id: &str) -> StoreResult<Option<Value>> {
    match table.get(id)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
        None => Ok(None),
    }
}

fn documents<R>(table: &R) -> StoreResult<Vec<Value>>
where
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut documents = Vec::new();
    for entry in table.iter()? {
        let (_, bytes) = entry?;
        documents.push(serde_json::from_slice(bytes.value())?);
    }
    Ok(documents)
}
