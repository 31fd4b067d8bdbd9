//! Reconciling record store.
//!
//! # Responsibility
//! - Record signups and page views into both backends.
//! - Merge both backends into one view on read.
//!
//! # Invariants
//! - The simple store is the uniqueness gate for signups; the structured
//!   store is never consulted before that decision.
//! - Structured store failures never fail an operation. They are logged
//!   with `status=degraded` and an `error_code`.
//! - On a signup identity-key collision during merge, the simple store's
//!   record wins.
//! - A well-formed signup fails only on a duplicate or a simple-store write
//!   failure.

use crate::backend::simple::{Collection, InsertOutcome, SimpleBackend};
use crate::backend::sqlite::SqliteBackend;
use crate::backend::{BackendError, RecordBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::kv::{FileKeyValueStore, KeyValueStore, KvError, KvResult};
use crate::model::page_view::PageViewRecord;
use crate::model::signup::SignupRecord;
use crate::service::session::SessionPointer;
use log::{error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type SignupResult<T> = Result<T, SignupError>;

#[derive(Debug)]
pub enum SignupError {
    /// A signup with the same identity key is already recorded.
    DuplicateEmail(String),
    /// Both email and name were blank.
    InvalidInput(String),
    /// The simple store could not persist the record.
    Storage(KvError),
}

impl Display for SignupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEmail(_) => write!(f, "email already in use"),
            Self::InvalidInput(message) => write!(f, "invalid signup: {message}"),
            Self::Storage(err) => write!(f, "signup could not be stored: {err}"),
        }
    }
}

impl Error for SignupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::DuplicateEmail(_) | Self::InvalidInput(_) => None,
        }
    }
}

impl From<KvError> for SignupError {
    fn from(value: KvError) -> Self {
        Self::Storage(value)
    }
}

/// Composes a structured backend `S` with a simple store over `K`.
pub struct RecordStore<S, K> {
    structured: S,
    simple: SimpleBackend<K>,
    clock: Arc<dyn Clock>,
}

impl RecordStore<SqliteBackend, FileKeyValueStore> {
    /// Wires the on-disk SQLite store and key-value directory from `config`.
    pub fn open_default(config: &StoreConfig) -> KvResult<Self> {
        let kv = FileKeyValueStore::open(config.kv_dir())?;
        Ok(Self::new(
            SqliteBackend::file(config.structured_db_path()),
            SimpleBackend::new(kv),
        ))
    }
}

impl<S: RecordBackend, K: KeyValueStore> RecordStore<S, K> {
    pub fn new(structured: S, simple: SimpleBackend<K>) -> Self {
        Self::with_clock(structured, simple, Arc::new(SystemClock))
    }

    pub fn with_clock(structured: S, simple: SimpleBackend<K>, clock: Arc<dyn Clock>) -> Self {
        Self {
            structured,
            simple,
            clock,
        }
    }

    pub fn structured(&self) -> &S {
        &self.structured
    }

    pub fn simple(&self) -> &SimpleBackend<K> {
        &self.simple
    }

    pub fn session(&self) -> SessionPointer<'_, K> {
        SessionPointer::new(&self.simple)
    }

    /// Records a new signup and makes it the current session.
    ///
    /// # Errors
    /// - `DuplicateEmail` when the simple store already holds the identity key.
    /// - `InvalidInput` when email and name are both blank.
    /// - `Storage` when the simple store cannot be read or written.
    pub fn record_signup(&self, email: &str, name: &str) -> SignupResult<SignupRecord> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() && name.is_empty() {
            return Err(SignupError::InvalidInput(
                "email and name cannot both be empty".to_string(),
            ));
        }

        let record = SignupRecord::new(email, name, self.clock.now_timestamp());
        match self.simple.insert_signup_if_absent(&record) {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::Duplicate) => {
                info!("event=signup_record module=record_store status=rejected reason=duplicate");
                return Err(SignupError::DuplicateEmail(email.to_string()));
            }
            Err(err) => {
                error!(
                    "event=signup_record module=record_store status=error error_code=simple_write_failed error={err}"
                );
                return Err(err.into());
            }
        }

        if let Err(err) = self.session().set(&record) {
            warn!(
                "event=session_set module=record_store status=degraded error_code=simple_write_failed id={} error={err}",
                record.id
            );
        }

        let mirrored = self
            .structured
            .open()
            .and_then(|handle| self.structured.put_signup(&handle, &record));
        if let Err(err) = mirrored {
            report_degraded("signup_mirror", &err, Some(&record.id));
        }

        info!(
            "event=signup_record module=record_store status=ok id={}",
            record.id
        );
        Ok(record)
    }

    /// Records one page view. Never fails observably.
    pub fn record_page_view(&self, path: &str, referrer: &str, user_agent: &str) {
        let record = PageViewRecord::new(path, self.clock.now_timestamp(), referrer, user_agent);

        let mirrored = self
            .structured
            .open()
            .and_then(|handle| self.structured.put_page_view(&handle, &record));
        if let Err(err) = mirrored {
            report_degraded("page_view_mirror", &err, None);
        }

        if let Err(err) = self.simple.append(Collection::PageViews, record) {
            error!(
                "event=page_view_record module=record_store status=error error_code=simple_write_failed error={err}"
            );
            return;
        }
        info!("event=page_view_record module=record_store status=ok");
    }

    /// Returns every known signup, one per identity key.
    ///
    /// Also rewrites the simple store's `users` collection with the merged
    /// result, unless that value is unreadable. Ordering is unspecified.
    pub fn list_users(&self) -> Vec<SignupRecord> {
        let structured = self
            .structured
            .open()
            .and_then(|handle| self.structured.all_signups(&handle))
            .unwrap_or_else(|err| {
                report_degraded("users_list", &err, None);
                Vec::new()
            });
        let structured_count = structured.len();

        let mut simple_count = 0;
        let refreshed = self
            .simple
            .update_collection(Collection::Users, |simple: Vec<SignupRecord>| {
                simple_count = simple.len();
                merge_signups(structured.clone(), simple)
            });

        let merged = match refreshed {
            Ok(merged) => merged,
            Err(err) => {
                warn!(
                    "event=users_refresh module=record_store status=degraded error_code=simple_refresh_failed error={err}"
                );
                merge_signups(structured, self.simple.read_collection(Collection::Users))
            }
        };

        info!(
            "event=users_list module=record_store status=ok structured={structured_count} simple={simple_count} merged={}",
            merged.len()
        );
        merged
    }

    /// Returns page views from the structured store, falling back to the
    /// simple store when it cannot be opened or read. The two sources are
    /// not merged.
    pub fn list_page_views(&self) -> Vec<PageViewRecord> {
        let structured = self
            .structured
            .open()
            .and_then(|handle| self.structured.all_page_views(&handle));
        match structured {
            Ok(views) => views,
            Err(err) => {
                report_degraded("page_views_list", &err, None);
                self.simple.read_collection(Collection::PageViews)
            }
        }
    }

    pub fn session_pointer(&self) -> Option<SignupRecord> {
        self.session().current()
    }

    pub fn clear_session_pointer(&self) {
        if let Err(err) = self.session().clear() {
            warn!(
                "event=session_clear module=record_store status=degraded error_code=simple_write_failed error={err}"
            );
        }
    }

    /// Signs the current visitor out of this device.
    pub fn sign_out(&self) {
        self.clear_session_pointer();
        info!("event=sign_out module=record_store status=ok");
    }
}

fn report_degraded(event: &str, err: &BackendError, id: Option<&str>) {
    warn!(
        "event={event} module=record_store status=degraded error_code={} backend={} id={} error={err}",
        err.error_code(),
        err.backend(),
        id.unwrap_or("-")
    );
}

/// Unions both sources by identity key; `simple` wins collisions.
///
/// Structured records keep their relative order first, followed by records
/// only the simple store knows.
pub fn merge_signups(
    structured: Vec<SignupRecord>,
    simple: Vec<SignupRecord>,
) -> Vec<SignupRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<SignupRecord> = Vec::with_capacity(structured.len() + simple.len());

    for record in structured.into_iter().chain(simple) {
        let key = record.identity_key().into_owned();
        match slots.get(&key) {
            Some(&slot) => merged[slot] = record,
            None => {
                slots.insert(key, merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::merge_signups;
    use crate::model::signup::SignupRecord;

    fn signup(id: &str, email: &str, name: &str) -> SignupRecord {
        SignupRecord {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: "2024-05-01T12:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn merge_prefers_simple_record_on_collision() {
        let merged = merge_signups(
            vec![signup("s1", "a@x.com", "Old")],
            vec![signup("l1", "a@x.com", "New")],
        );
        assert_eq!(merged, vec![signup("l1", "a@x.com", "New")]);
    }

    #[test]
    fn merge_unions_distinct_keys() {
        let merged = merge_signups(
            vec![signup("s1", "a@x.com", "A")],
            vec![signup("l1", "b@x.com", "B")],
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_collapses_duplicates_within_one_source() {
        let merged = merge_signups(
            Vec::new(),
            vec![signup("l1", "a@x.com", "First"), signup("l2", "a@x.com", "Second")],
        );
        assert_eq!(merged, vec![signup("l2", "a@x.com", "Second")]);
    }

    #[test]
    fn merge_keys_blank_email_by_id() {
        let merged = merge_signups(
            vec![signup("same", "", "Structured")],
            vec![signup("same", "", "Simple"), signup("other", "", "Other")],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Simple");
    }
}
