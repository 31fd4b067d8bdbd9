//! Backend interface shared by the structured and simple stores.
//!
//! # Responsibility
//! - Define the `{open, put_*, all_*}` contract both stores honor.
//! - Classify backend failures the way the reconciler degrades on them.
//!
//! # Invariants
//! - Each `put_*` call is its own atomicity boundary; a failed put never
//!   affects another record.
//! - `all_*` ordering is unspecified; callers sort when order matters.

use crate::model::page_view::PageViewRecord;
use crate::model::signup::SignupRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod simple;
pub mod sqlite;

pub type BackendResult<T> = Result<T, BackendError>;

/// Non-fatal backend failure. The reconciler logs these and falls back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Storage could not be opened or initialized.
    Unavailable {
        backend: &'static str,
        message: String,
    },
    /// A single-record put failed.
    Write {
        backend: &'static str,
        message: String,
    },
    /// A collection fetch failed.
    Read {
        backend: &'static str,
        message: String,
    },
}

impl BackendError {
    pub fn unavailable(backend: &'static str, err: impl Display) -> Self {
        Self::Unavailable {
            backend,
            message: err.to_string(),
        }
    }

    pub fn write(backend: &'static str, err: impl Display) -> Self {
        Self::Write {
            backend,
            message: err.to_string(),
        }
    }

    pub fn read(backend: &'static str, err: impl Display) -> Self {
        Self::Read {
            backend,
            message: err.to_string(),
        }
    }

    /// Stable code used in diagnostic log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "backend_unavailable",
            Self::Write { .. } => "backend_write_failed",
            Self::Read { .. } => "backend_read_failed",
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Unavailable { backend, .. }
            | Self::Write { backend, .. }
            | Self::Read { backend, .. } => backend,
        }
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { backend, message } => {
                write!(f, "{backend} backend unavailable: {message}")
            }
            Self::Write { backend, message } => write!(f, "{backend} backend write failed: {message}"),
            Self::Read { backend, message } => write!(f, "{backend} backend read failed: {message}"),
        }
    }
}

impl Error for BackendError {}

/// Record persistence contract implemented by every backend variant.
///
/// `open` is idempotent and returns a handle the remaining calls go through.
/// A handle may hold exclusive access to the underlying storage, so callers
/// drop it before opening again.
pub trait RecordBackend: Send + Sync {
    type Handle<'a>
    where
        Self: 'a;

    /// Short name used in diagnostics (`sqlite`, `simple`, ...).
    fn name(&self) -> &'static str;

    fn open(&self) -> BackendResult<Self::Handle<'_>>;

    fn put_signup(&self, handle: &Self::Handle<'_>, record: &SignupRecord) -> BackendResult<()>;

    fn put_page_view(
        &self,
        handle: &Self::Handle<'_>,
        record: &PageViewRecord,
    ) -> BackendResult<()>;

    fn all_signups(&self, handle: &Self::Handle<'_>) -> BackendResult<Vec<SignupRecord>>;

    fn all_page_views(&self, handle: &Self::Handle<'_>) -> BackendResult<Vec<PageViewRecord>>;
}

#[cfg(test)]
mod tests {
    use super::BackendError;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            BackendError::unavailable("sqlite", "denied").error_code(),
            "backend_unavailable"
        );
        assert_eq!(
            BackendError::write("sqlite", "full").error_code(),
            "backend_write_failed"
        );
        assert_eq!(
            BackendError::read("simple", "bad").to_string(),
            "simple backend read failed: bad"
        );
    }
}
