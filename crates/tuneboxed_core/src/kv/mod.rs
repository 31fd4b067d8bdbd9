//! Flat key-value persistence used by the simple store.
//!
//! # Responsibility
//! - Store whole string values under short keys, synchronously.
//! - Hide whether values live on disk or in memory.
//!
//! # Invariants
//! - `set` replaces a value atomically: readers see the old or the new
//!   value, never a partial write.
//! - Keys are restricted to `[A-Za-z0-9_-]`.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod file;
mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

pub type KvResult<T> = Result<T, KvError>;

#[derive(Debug)]
pub enum KvError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    InvalidKey(String),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "key-value io error: {err}"),
            Self::Serialize(err) => write!(f, "key-value serialization error: {err}"),
            Self::InvalidKey(key) => write!(f, "invalid key-value key `{key}`"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::InvalidKey(_) => None,
        }
    }
}

impl From<std::io::Error> for KvError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for KvError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> KvResult<()>;
}

pub(crate) fn validate_key(key: &str) -> KvResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidKey(key.to_string()))
    }
}
