//! Simple store: whole-collection JSON snapshots in a key-value store.
//!
//! # Responsibility
//! - Read and replace the `users` and `pageviews` collections.
//! - Hold the `current_user` session pointer.
//! - Provide the atomic insert-if-absent used as the signup uniqueness gate.
//!
//! # Invariants
//! - Plain reads never fail: an absent or unparseable value reads as empty.
//! - Read-modify-write sequences run under one lock, so concurrent appends
//!   through the same value are never lost.
//! - A stored value that cannot be read or parsed is never overwritten by a
//!   read-modify-write; the write is skipped and the error returned.

use super::{BackendError, BackendResult, RecordBackend};
use crate::kv::{KeyValueStore, KvResult};
use crate::model::page_view::PageViewRecord;
use crate::model::signup::SignupRecord;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

const BACKEND_NAME: &str = "simple";
const SESSION_KEY: &str = "current_user";

/// Collections persisted as whole JSON arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    PageViews,
}

impl Collection {
    pub fn key(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::PageViews => "pageviews",
        }
    }
}

/// Outcome of [`SimpleBackend::insert_signup_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same identity key already exists.
    Duplicate,
}

pub struct SimpleBackend<K> {
    kv: K,
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> SimpleBackend<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Returns the stored sequence, or empty when absent or malformed.
    pub fn read_collection<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        self.read_json(collection.key()).unwrap_or_default()
    }

    /// Replaces the whole stored sequence.
    pub fn write_collection<T: Serialize>(
        &self,
        collection: Collection,
        items: &[T],
    ) -> KvResult<()> {
        let _guard = self.lock();
        self.write_json(collection.key(), items)
    }

    /// Reads, transforms and writes back one collection under the write
    /// lock. Returns the value passed to the write.
    ///
    /// # Errors
    /// Fails without writing when the stored value is unreadable.
    pub fn update_collection<T, F>(&self, collection: Collection, update: F) -> KvResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Vec<T>) -> Vec<T>,
    {
        let _guard = self.lock();
        let updated = update(self.load_collection(collection)?);
        self.write_json(collection.key(), &updated)?;
        Ok(updated)
    }

    /// Appends `record` to `users` unless its identity key is already there.
    pub fn insert_signup_if_absent(&self, record: &SignupRecord) -> KvResult<InsertOutcome> {
        let _guard = self.lock();
        let mut users: Vec<SignupRecord> = self.load_collection(Collection::Users)?;
        if users
            .iter()
            .any(|existing| existing.identity_key() == record.identity_key())
        {
            return Ok(InsertOutcome::Duplicate);
        }
        users.push(record.clone());
        self.write_json(Collection::Users.key(), &users)?;
        Ok(InsertOutcome::Inserted)
    }

    pub fn append<T>(&self, collection: Collection, item: T) -> KvResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        self.update_collection(collection, |mut items| {
            items.push(item);
            items
        })
        .map(|_| ())
    }

    pub fn session_pointer(&self) -> Option<SignupRecord> {
        self.read_json(SESSION_KEY)
    }

    pub fn set_session_pointer(&self, record: &SignupRecord) -> KvResult<()> {
        self.write_json(SESSION_KEY, record)
    }

    pub fn clear_session_pointer(&self) -> KvResult<()> {
        self.kv.remove(SESSION_KEY)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Absent reads as empty; unreadable is an error.
    fn load_collection<T: DeserializeOwned>(&self, collection: Collection) -> KvResult<Vec<T>> {
        Ok(self.load_json(collection.key())?.unwrap_or_default())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load_json(key).ok().flatten()
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> KvResult<Option<T>> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(err) => {
                warn!(
                    "event=simple_read module=simple_store status=degraded error_code=kv_read_failed key={key} error={err}"
                );
                return Err(err);
            }
        };
        serde_json::from_str(&raw).map(Some).map_err(|err| {
            warn!(
                "event=simple_read module=simple_store status=degraded error_code=kv_parse_failed key={key} error={err}"
            );
            err.into()
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> KvResult<()> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, &raw)
    }
}

impl<K: KeyValueStore> RecordBackend for SimpleBackend<K> {
    type Handle<'a> = () where K: 'a;

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn open(&self) -> BackendResult<()> {
        Ok(())
    }

    fn put_signup(&self, _handle: &(), record: &SignupRecord) -> BackendResult<()> {
        self.append(Collection::Users, record.clone())
            .map_err(|err| BackendError::write(BACKEND_NAME, err))
    }

    fn put_page_view(&self, _handle: &(), record: &PageViewRecord) -> BackendResult<()> {
        self.append(Collection::PageViews, record.clone())
            .map_err(|err| BackendError::write(BACKEND_NAME, err))
    }

    fn all_signups(&self, _handle: &()) -> BackendResult<Vec<SignupRecord>> {
        Ok(self.read_collection(Collection::Users))
    }

    fn all_page_views(&self, _handle: &()) -> BackendResult<Vec<PageViewRecord>> {
        Ok(self.read_collection(Collection::PageViews))
    }
}
