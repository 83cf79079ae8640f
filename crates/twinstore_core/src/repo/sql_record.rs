//! Row mapping between record types and relational tables.
//!
//! # Invariants
//! - `COLUMNS[0]` is `id`; `to_row_values` yields one value per column in
//!   the same order.
//! - Every mapped table has a nullable `deleted_at` column of epoch
//!   milliseconds.

use crate::model::customer::{Customer, Role};
use crate::model::entity::{Entity, Timestamp};
use crate::model::session::Session;
use crate::repo::{StoreError, StoreResult};
use chrono::DateTime;
use rusqlite::types::Value;
use rusqlite::Row;

/// Record types that can be stored by `SqliteStore`.
pub trait SqlRecord: Entity + Sized {
    /// Column names in bind order, `id` first.
    const COLUMNS: &'static [&'static str];
    /// Column used by email lookups.
    const EMAIL_COLUMN: &'static str = "email";

    fn to_row_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> StoreResult<Self>;
}

impl SqlRecord for Customer {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "phone",
        "hashed_password",
        "role",
        "created_at",
        "updated_at",
        "deleted_at",
    ];

    fn to_row_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.name.clone()),
            Value::Text(self.email.clone()),
            Value::Text(self.phone.clone()),
            Value::Text(self.hashed_password.clone()),
            Value::Text(self.role.as_str().to_string()),
            Value::Integer(self.created_at.timestamp_millis()),
            Value::Integer(self.updated_at.timestamp_millis()),
            optional_millis(self.deleted_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let role_text: String = row.get("role")?;
        let role = Role::parse(&role_text).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid role `{role_text}` in customers.role"))
        })?;

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            hashed_password: row.get("hashed_password")?,
            role,
            created_at: millis_to_timestamp(row.get("created_at")?, "customers.created_at")?,
            updated_at: millis_to_timestamp(row.get("updated_at")?, "customers.updated_at")?,
            deleted_at: optional_timestamp(row.get("deleted_at")?, "customers.deleted_at")?,
        })
    }
}

impl SqlRecord for Session {
    const COLUMNS: &'static [&'static str] =
        &["id", "customer_id", "email", "token", "ttl", "deleted_at"];

    fn to_row_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.customer_id.clone()),
            Value::Text(self.email.clone()),
            Value::Text(self.token.clone()),
            Value::Integer(self.ttl.timestamp_millis()),
            optional_millis(self.deleted_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            customer_id: row.get("customer_id")?,
            email: row.get("email")?,
            token: row.get("token")?,
            ttl: millis_to_timestamp(row.get("ttl")?, "sessions.ttl")?,
            deleted_at: optional_timestamp(row.get("deleted_at")?, "sessions.deleted_at")?,
        })
    }
}

fn optional_millis(value: Option<Timestamp>) -> Value {
    value.map_or(Value::Null, |at| Value::Integer(at.timestamp_millis()))
}

fn millis_to_timestamp(millis: i64, column: &str) -> StoreResult<Timestamp> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        StoreError::InvalidData(format!("timestamp `{millis}` out of range in {column}"))
    })
}

fn optional_timestamp(millis: Option<i64>, column: &str) -> StoreResult<Option<Timestamp>> {
    millis
        .map(|value| millis_to_timestamp(value, column))
        .transpose()
}
