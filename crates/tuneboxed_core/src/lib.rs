//! Core data layer for the Tuneboxed site.
//! This crate owns signup/page-view persistence and the rules that reconcile
//! the structured and simple backends into one view.

pub mod analytics;
pub mod backend;
pub mod clock;
pub mod config;
pub mod db;
pub mod kv;
pub mod logging;
pub mod model;
pub mod service;

pub use analytics::dashboard::{classify_device, dashboard_summary, DashboardSummary};
pub use backend::simple::SimpleBackend;
pub use backend::sqlite::SqliteBackend;
pub use backend::{BackendError, BackendResult, RecordBackend};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, StoreConfig};
pub use kv::{FileKeyValueStore, KeyValueStore, KvError, KvResult, MemoryKeyValueStore};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::page_view::PageViewRecord;
pub use model::signup::{SignupId, SignupRecord};
pub use service::record_store::{RecordStore, SignupError, SignupResult};
pub use service::session::SessionPointer;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
