use rusqlite::Connection;
use tuneboxed_core::db::migrations::{latest_version, schema_version};
use tuneboxed_core::db::{open_db, open_db_in_memory, DbError};
use tuneboxed_core::{BackendError, RecordBackend, SignupRecord, SqliteBackend};

#[test]
fn fresh_store_is_created_at_schema_version_one() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(latest_version(), 1);
    assert_eq!(schema_version(&conn).unwrap(), 1);
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "pageviews");
}

#[test]
fn reopening_the_same_file_keeps_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuneboxed.sqlite3");
    let record = SignupRecord::new("a@x.com", "Ann", "2024-05-01T12:00:00.000Z");

    {
        let backend = SqliteBackend::file(&path);
        let handle = backend.open().unwrap();
        backend.put_signup(&handle, &record).unwrap();
    }

    let backend = SqliteBackend::file(&path);
    let handle = backend.open().unwrap();
    assert_eq!(backend.all_signups(&handle).unwrap(), vec![record]);
    assert_eq!(schema_version(&open_db(&path).unwrap()).unwrap(), 1);
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 7;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 7);
            assert_eq!(supported, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = SqliteBackend::file(&path).open().err().unwrap();
    assert!(matches!(err, BackendError::Unavailable { .. }));
}

#[test]
fn corrupt_file_reports_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.sqlite3");
    std::fs::write(&path, b"definitely not a sqlite database, just some bytes").unwrap();

    let err = SqliteBackend::file(&path).open().err().unwrap();
    assert_eq!(err.error_code(), "backend_unavailable");
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

#[test]
fn refused_newer_file_keeps_its_stamp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 3;")
        .unwrap();

    assert!(open_db(&path).is_err());
    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 3);
}
