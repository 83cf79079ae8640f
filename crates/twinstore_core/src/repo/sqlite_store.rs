//! Relational store driver backed by SQLite.
//!
//! # Responsibility
//! - Implement `RecordStore` for any `SqlRecord` type over one table.
//! - Map zero-row results to `NotFound` and unique violations to `Duplicate`.
//!
//! # Invariants
//! - Live scope is `deleted_at IS NULL`.
//! - Table and column names are validated identifiers before they are
//!   interpolated into SQL.

use crate::db::SharedConnection;
use crate::model::entity::now;
use crate::repo::sql_record::SqlRecord;
use crate::repo::{validate_identifier, RecordStore, Scope, StoreError, StoreResult};
use rusqlite::types::Value;
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode};
use std::marker::PhantomData;

/// SQLite-backed driver for one record type bound to one table.
pub struct SqliteStore<T> {
    conn: SharedConnection,
    table: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: SqlRecord> SqliteStore<T> {
    /// Binds a driver to an existing, migrated table.
    pub fn try_new(conn: SharedConnection, table: impl Into<String>) -> StoreResult<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        for column in T::COLUMNS {
            validate_identifier(column)?;
        }
        ensure_table_exists(&conn.lock(), &table)?;

        Ok(Self {
            conn,
            table,
            _record: PhantomData,
        })
    }

    fn select_sql(&self, scope: Scope, key_column: Option<&str>) -> String {
        let mut sql = format!(
            "SELECT {} FROM {} WHERE 1 = 1",
            T::COLUMNS.join(", "),
            self.table
        );
        if let Some(column) = key_column {
            sql.push_str(&format!(" AND {column} = ?1"));
        }
        if scope == Scope::Live {
            sql.push_str(" AND deleted_at IS NULL");
        }
        sql
    }

    fn list(&self, scope: Scope) -> StoreResult<Vec<T>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{} ORDER BY id ASC;", self.select_sql(scope, None)))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(T::from_row(row)?);
        }
        Ok(records)
    }

    fn find(&self, column: &str, key: &str, scope: Scope) -> StoreResult<T> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} LIMIT 1;",
            self.select_sql(scope, Some(column))
        ))?;
        let mut rows = stmt.query(params![key])?;
        let found = match rows.next()? {
            Some(row) => Some(T::from_row(row)?),
            None => None,
        };
        found.ok_or_else(|| StoreError::not_found(&self.table, key))
    }

    fn replace(&self, id: &str, entity: &T, scope: Scope) -> StoreResult<()> {
        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {assignments} WHERE id = ?1", self.table);
        if scope == Scope::Live {
            sql.push_str(" AND deleted_at IS NULL");
        }

        let mut values = entity.to_row_values();
        values[0] = Value::Text(id.to_string());

        let changed = self
            .conn
            .lock()
            .execute(&sql, params_from_iter(values))
            .map_err(|err| self.map_write_error(err))?;
        if changed == 0 {
            return Err(StoreError::not_found(&self.table, id));
        }
        Ok(())
    }

    fn map_write_error(&self, err: rusqlite::Error) -> StoreError {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            let unique = failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                );
            if unique {
                // SQLite reports "UNIQUE constraint failed: <table>.<column>".
                let field = message
                    .as_deref()
                    .and_then(|text| text.rsplit('.').next())
                    .unwrap_or("id")
                    .to_string();
                return StoreError::Duplicate {
                    collection: self.table.clone(),
                    field,
                };
            }
        }
        err.into()
    }
}

impl<T: SqlRecord> RecordStore<T> for SqliteStore<T> {
    fn collection(&self) -> &str {
        &self.table
    }

    fn create(&self, entity: &T) -> StoreResult<()> {
        let placeholders = (1..=T::COLUMNS.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            self.table,
            T::COLUMNS.join(", ")
        );

        self.conn
            .lock()
            .execute(&sql, params_from_iter(entity.to_row_values()))
            .map_err(|err| self.map_write_error(err))?;
        Ok(())
    }

    fn get(&self) -> StoreResult<Vec<T>> {
        self.list(Scope::Live)
    }

    fn get_one(&self, id: &str) -> StoreResult<T> {
        self.find("id", id, Scope::Live)
    }

    fn get_by_email(&self, email: &str) -> StoreResult<T> {
        self.find(T::EMAIL_COLUMN, email, Scope::Live)
    }

    fn update(&self, id: &str, entity: &T) -> StoreResult<()> {
        self.replace(id, entity, Scope::Live)
    }

    fn soft_delete(&self, id: &str) -> StoreResult<()> {
        let changed = self.conn.lock().execute(
            &format!(
                "UPDATE {} SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL;",
                self.table
            ),
            params![id, now().timestamp_millis()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(&self.table, id));
        }
        Ok(())
    }

    fn hard_delete(&self, id: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .lock()
            .execute(&format!("DELETE FROM {} WHERE id = ?1;", self.table), [id])?;
        if changed == 0 {
            return Err(StoreError::not_found(&self.table, id));
        }
        Ok(())
    }

    fn admin_get(&self) -> StoreResult<Vec<T>> {
        self.list(Scope::Any)
    }

    fn admin_get_one(&self, id: &str) -> StoreResult<T> {
        self.find("id", id, Scope::Any)
    }

    fn admin_get_by_email(&self, email: &str) -> StoreResult<T> {
        self.find(T::EMAIL_COLUMN, email, Scope::Any)
    }

    fn admin_update(&self, id: &str, entity: &T) -> StoreResult<()> {
        self.replace(id, entity, Scope::Any)
    }
}

fn ensure_table_exists(conn: &Connection, table: &str) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(StoreError::InvalidData(format!(
            "table `{table}` does not exist; run migrations first"
        )))
    }
}
