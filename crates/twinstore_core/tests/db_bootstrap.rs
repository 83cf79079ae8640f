use rusqlite::Connection;
use twinstore_core::db::migrations::latest_version;
use twinstore_core::db::{open_db, open_db_in_memory, DbError};
use twinstore_core::{Customer, ReadSource, StoreHandles, StoreKind};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "customers");
    assert_table_exists(&conn, "sessions");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("twinstore.sqlite3");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "customers");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn file_backed_stores_keep_records_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite_path = dir.path().join("twinstore.sqlite3");
    let document_path = dir.path().join("twinstore.redb");

    let mut ana = Customer::new("Ana", "ana@example.com", "555-123-4567");
    {
        let handles =
            StoreHandles::open(&sqlite_path, &document_path, StoreKind::Relational).unwrap();
        handles.customers().unwrap().create(&mut ana).unwrap();
    }

    let handles = StoreHandles::open(&sqlite_path, &document_path, StoreKind::Document).unwrap();
    let customers = handles.customers().unwrap();
    assert_eq!(customers.get_one(&ana.id, ReadSource::Primary).unwrap(), ana);
    assert_eq!(customers.get_one(&ana.id, ReadSource::Secondary).unwrap(), ana);
}

#[test]
fn session_orchestrator_uses_its_own_table_and_collection() {
    let handles = StoreHandles::open_in_memory(StoreKind::Relational).unwrap();
    let sessions = handles.sessions().unwrap();
    let customers = handles.customers().unwrap();

    let mut session = twinstore_core::Session::new("customer-1", "ana@example.com", "token-1");
    sessions.create(&mut session).unwrap();

    assert_eq!(sessions.get(ReadSource::Secondary).unwrap(), vec![session]);
    assert!(customers.get(ReadSource::Primary).unwrap().is_empty());
    assert!(customers.get(ReadSource::Secondary).unwrap().is_empty());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
