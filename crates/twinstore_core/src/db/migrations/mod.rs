//! Relational schema for the customer and session tables.
//!
//! Version 1 creates `customers` and `sessions`, each with a nullable
//! `deleted_at` soft-delete column and the unique keys (`email`, `token`)
//! the document store mirrors as unique fields.
//!
//! # Invariants
//! - Step numbers only grow; a schema file is never edited once released.
//! - The schema version lives in `PRAGMA user_version` and moves in the same
//!   transaction as the DDL it stands for.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    ddl: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    ddl: include_str!("0001_init.sql"),
}];

/// Schema version this build writes and understands.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the customer/session schema up to `latest_version`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stored = stored_schema_version(conn)?;
    let latest = latest_version();
    match stored.cmp(&latest) {
        Ordering::Greater => {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: stored,
                latest_supported: latest,
            })
        }
        Ordering::Equal => return Ok(()),
        Ordering::Less => {}
    }

    let tx = conn.transaction()?;
    for step in SCHEMA_STEPS.iter().filter(|step| step.version > stored) {
        tx.execute_batch(step.ddl)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db store=relational status=ok from_version={stored} to_version={latest}");
    Ok(())
}

fn stored_schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
