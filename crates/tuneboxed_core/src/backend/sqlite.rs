//! Structured store backed by SQLite.
//!
//! # Responsibility
//! - Lazily open one connection per backend value and reuse it.
//! - Map signup/page-view records onto the `users` and `pageviews` tables.
//!
//! # Invariants
//! - `users` is keyed by `id`, `pageviews` by `timestamp`.
//! - A put for an existing key replaces the stored row (last write wins).
//! - Every SQL failure surfaces as a [`BackendError`], never a panic.

use super::{BackendError, BackendResult, RecordBackend};
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::page_view::PageViewRecord;
use crate::model::signup::SignupRecord;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const BACKEND_NAME: &str = "sqlite";

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite structured store.
pub struct SqliteBackend {
    location: Location,
    conn: Mutex<Option<Connection>>,
}

/// Exclusive access to the open connection for the handle's lifetime.
pub struct SqliteHandle<'a> {
    guard: MutexGuard<'a, Option<Connection>>,
}

impl SqliteHandle<'_> {
    fn conn(&self) -> BackendResult<&Connection> {
        self.guard
            .as_ref()
            .ok_or_else(|| BackendError::unavailable(BACKEND_NAME, "connection is not open"))
    }
}

impl SqliteBackend {
    /// Structured store persisted at `path`; nothing is touched until `open`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::File(path.into()))
    }

    /// Structured store living only as long as this value.
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    fn with_location(location: Location) -> Self {
        Self {
            location,
            conn: Mutex::new(None),
        }
    }

    /// Database file path, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path.as_path()),
            Location::Memory => None,
        }
    }

    fn connect(&self) -> DbResult<Connection> {
        match &self.location {
            Location::File(path) => open_db(path),
            Location::Memory => open_db_in_memory(),
        }
    }
}

impl RecordBackend for SqliteBackend {
    type Handle<'a> = SqliteHandle<'a>;

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn open(&self) -> BackendResult<SqliteHandle<'_>> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            let conn = self
                .connect()
                .map_err(|err| BackendError::unavailable(BACKEND_NAME, err))?;
            *guard = Some(conn);
        }
        Ok(SqliteHandle { guard })
    }

    fn put_signup(&self, handle: &SqliteHandle<'_>, record: &SignupRecord) -> BackendResult<()> {
        handle
            .conn()?
            .execute(
                "INSERT OR REPLACE INTO users (id, email, name, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    record.id.as_str(),
                    record.email.as_str(),
                    record.name.as_str(),
                    record.created_at.as_str(),
                ],
            )
            .map_err(|err| BackendError::write(BACKEND_NAME, err))?;
        Ok(())
    }

    fn put_page_view(
        &self,
        handle: &SqliteHandle<'_>,
        record: &PageViewRecord,
    ) -> BackendResult<()> {
        handle
            .conn()?
            .execute(
                "INSERT OR REPLACE INTO pageviews (timestamp, path, referrer, user_agent)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    record.timestamp.as_str(),
                    record.path.as_str(),
                    record.referrer.as_str(),
                    record.user_agent.as_str(),
                ],
            )
            .map_err(|err| BackendError::write(BACKEND_NAME, err))?;
        Ok(())
    }

    fn all_signups(&self, handle: &SqliteHandle<'_>) -> BackendResult<Vec<SignupRecord>> {
        query_all(
            handle.conn()?,
            "SELECT id, email, name, created_at FROM users ORDER BY created_at, id;",
            parse_signup_row,
        )
    }

    fn all_page_views(&self, handle: &SqliteHandle<'_>) -> BackendResult<Vec<PageViewRecord>> {
        query_all(
            handle.conn()?,
            "SELECT timestamp, path, referrer, user_agent FROM pageviews ORDER BY timestamp;",
            parse_page_view_row,
        )
    }
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    parse: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> BackendResult<Vec<T>> {
    let read_err = |err: rusqlite::Error| BackendError::read(BACKEND_NAME, err);
    let mut stmt = conn.prepare(sql).map_err(read_err)?;
    let rows = stmt.query_map([], parse).map_err(read_err)?;
    rows.collect::<rusqlite::Result<Vec<T>>>().map_err(read_err)
}

fn parse_signup_row(row: &Row<'_>) -> rusqlite::Result<SignupRecord> {
    Ok(SignupRecord {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_page_view_row(row: &Row<'_>) -> rusqlite::Result<PageViewRecord> {
    Ok(PageViewRecord {
        path: row.get("path")?,
        timestamp: row.get("timestamp")?,
        referrer: row.get("referrer")?,
        user_agent: row.get("user_agent")?,
    })
}

#[cfg(test)]
mod tests {
    use super::SqliteBackend;
    use crate::backend::{BackendError, RecordBackend};
    use crate::model::page_view::PageViewRecord;
    use crate::model::signup::SignupRecord;

    #[test]
    fn open_is_idempotent_and_reuses_connection() {
        let backend = SqliteBackend::in_memory();
        {
            let handle = backend.open().unwrap();
            let record = SignupRecord::new("a@x.com", "Ann", "2024-05-01T12:00:00.000Z");
            backend.put_signup(&handle, &record).unwrap();
        }
        let handle = backend.open().unwrap();
        assert_eq!(backend.all_signups(&handle).unwrap().len(), 1);
    }

    #[test]
    fn put_signup_with_same_id_replaces_row() {
        let backend = SqliteBackend::in_memory();
        let handle = backend.open().unwrap();
        let mut record = SignupRecord::new("a@x.com", "Old", "2024-05-01T12:00:00.000Z");
        backend.put_signup(&handle, &record).unwrap();
        record.name = "New".to_string();
        backend.put_signup(&handle, &record).unwrap();

        let all = backend.all_signups(&handle).unwrap();
        assert_eq!(all, vec![record]);
    }

    #[test]
    fn page_views_sharing_a_timestamp_keep_last_write() {
        let backend = SqliteBackend::in_memory();
        let handle = backend.open().unwrap();
        let at = "2024-05-01T12:00:00.000Z";
        backend
            .put_page_view(&handle, &PageViewRecord::new("/home", at, "", "a"))
            .unwrap();
        backend
            .put_page_view(&handle, &PageViewRecord::new("/about", at, "", "b"))
            .unwrap();

        let views = backend.all_page_views(&handle).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].path, "/about");
    }

    #[test]
    fn open_fails_as_unavailable_for_unreachable_path() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::file(dir.path().join("missing").join("store.sqlite3"));
        let err = backend.open().err().unwrap();
        assert!(matches!(err, BackendError::Unavailable { .. }));
    }
}
