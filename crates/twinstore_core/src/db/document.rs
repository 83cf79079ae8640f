//! Bootstrap for the embedded document database.
//!
//! Each collection is one `redb` table mapping record id to a JSON document.

use super::DbResult;
use log::{error, info};
use redb::backends::InMemoryBackend;
use redb::{Database, TableDefinition};
use std::path::Path;
use std::time::Instant;

/// Opens (or creates) a document database file.
pub fn open_document_db(path: impl AsRef<Path>) -> DbResult<Database> {
    let started_at = Instant::now();
    info!("event=db_open module=db store=document status=start mode=file");

    match Database::create(path) {
        Ok(db) => {
            info!(
                "event=db_open module=db store=document status=ok mode=file duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(db)
        }
        Err(err) => {
            error!(
                "event=db_open module=db store=document status=error mode=file duration_ms={} error_code=db_open_failed error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err.into())
        }
    }
}

/// Opens a fresh in-memory document database.
pub fn open_document_db_in_memory() -> DbResult<Database> {
    let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
    info!("event=db_open module=db store=document status=ok mode=memory");
    Ok(db)
}

/// Creates every missing collection in one write transaction.
pub fn ensure_collections(db: &Database, names: &[&str]) -> DbResult<()> {
    let txn = db.begin_write()?;
    for name in names {
        let definition: TableDefinition<'_, &'static str, &'static [u8]> =
            TableDefinition::new(name);
        txn.open_table(definition)?;
    }
    txn.commit()?;
    info!(
        "event=db_migrate module=db store=document status=ok collections={}",
        names.len()
    );
    Ok(())
}
