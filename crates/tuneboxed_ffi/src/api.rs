//! Use-case API for the Flutter host.
//!
//! # Responsibility
//! - Expose signup, page-view and operator-view calls to Dart via FRB.
//! - Own the one process-wide record store the host talks to.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - The store is built once, from `init_store` or on first use.

use log::warn;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tuneboxed_core::analytics::dashboard::DEFAULT_RECENT_LIMIT;
use tuneboxed_core::{
    classify_device, core_version as core_version_inner, dashboard_summary as summarize,
    init_logging as init_logging_inner, FileKeyValueStore, PageViewRecord, RecordStore,
    SignupError, SignupRecord, SqliteBackend, StoreConfig,
};

type Store = RecordStore<SqliteBackend, FileKeyValueStore>;

const DATA_DIR_ENV: &str = "TUNEBOXED_DATA_DIR";
const DEFAULT_DATA_DIR_NAME: &str = "tuneboxed";

static STORE: OnceCell<(StoreConfig, Store)> = OnceCell::new();

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Builds the record store under `data_dir`.
///
/// # FFI contract
/// - Call once at startup, before any record/list call.
/// - Repeating with the same directory is a no-op; a different directory
///   is rejected.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_store(data_dir: String) -> String {
    let config = match StoreConfig::new(&data_dir) {
        Ok(config) => config,
        Err(err) => return err.to_string(),
    };
    match store_for(config.clone()) {
        Ok((active, _)) if active.data_dir == config.data_dir => String::new(),
        Ok((active, _)) => format!(
            "store already initialized at `{}`; refusing to switch to `{}`",
            active.data_dir.display(),
            config.data_dir.display()
        ),
        Err(err) => err,
    }
}

/// Signup as presented to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

/// Page view as presented to the host, with a coarse device label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViewItem {
    pub path: String,
    pub timestamp: String,
    pub referrer: String,
    pub device: String,
}

/// Result envelope for the signup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupResponse {
    pub ok: bool,
    /// Set when the email is already registered.
    pub duplicate: bool,
    pub user: Option<UserItem>,
    pub message: String,
}

/// Operator view counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardResponse {
    pub total_signups: u64,
    pub total_page_views: u64,
    pub most_viewed_path: Option<String>,
    pub most_viewed_count: u64,
    pub recent_page_views: Vec<PageViewItem>,
    pub message: String,
}

/// Records a signup from the email-capture form.
///
/// # FFI contract
/// - Never panics; failures are reported in the envelope.
#[flutter_rust_bridge::frb(sync)]
pub fn record_signup(email: String, name: String) -> SignupResponse {
    let outcome = with_store(|store| store.record_signup(&email, &name));
    match outcome {
        Ok(Ok(record)) => SignupResponse {
            ok: true,
            duplicate: false,
            user: Some(to_user_item(record)),
            message: "Signed up.".to_string(),
        },
        Ok(Err(err)) => SignupResponse {
            ok: false,
            duplicate: matches!(err, SignupError::DuplicateEmail(_)),
            user: None,
            message: err.to_string(),
        },
        Err(err) => SignupResponse {
            ok: false,
            duplicate: false,
            user: None,
            message: err,
        },
    }
}

/// Records one page view; failures are only logged.
#[flutter_rust_bridge::frb(sync)]
pub fn record_page_view(path: String, referrer: String, user_agent: String) {
    if let Err(err) = with_store(|store| store.record_page_view(&path, &referrer, &user_agent)) {
        warn!("event=page_view_record module=ffi status=error error_code=store_unavailable error={err}");
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn list_users() -> Vec<UserItem> {
    with_store(Store::list_users)
        .map(|users| users.into_iter().map(to_user_item).collect())
        .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn list_page_views() -> Vec<PageViewItem> {
    with_store(Store::list_page_views)
        .map(|views| views.into_iter().map(to_page_view_item).collect())
        .unwrap_or_default()
}

/// Returns the signed-in visitor for display gating.
#[flutter_rust_bridge::frb(sync)]
pub fn current_user() -> Option<UserItem> {
    with_store(Store::session_pointer)
        .ok()
        .flatten()
        .map(to_user_item)
}

#[flutter_rust_bridge::frb(sync)]
pub fn sign_out() {
    if let Err(err) = with_store(Store::sign_out) {
        warn!("event=sign_out module=ffi status=error error_code=store_unavailable error={err}");
    }
}

/// Counters for the hidden operator view.
#[flutter_rust_bridge::frb(sync)]
pub fn dashboard_summary() -> DashboardResponse {
    let summary = with_store(|store| {
        summarize(
            &store.list_users(),
            &store.list_page_views(),
            DEFAULT_RECENT_LIMIT,
        )
    });
    match summary {
        Ok(summary) => DashboardResponse {
            total_signups: summary.total_signups as u64,
            total_page_views: summary.total_page_views as u64,
            most_viewed_path: summary.most_viewed_path,
            most_viewed_count: summary.most_viewed_count as u64,
            recent_page_views: summary
                .recent_page_views
                .into_iter()
                .map(to_page_view_item)
                .collect(),
            message: String::new(),
        },
        Err(err) => DashboardResponse {
            total_signups: 0,
            total_page_views: 0,
            most_viewed_path: None,
            most_viewed_count: 0,
            recent_page_views: Vec::new(),
            message: err,
        },
    }
}

fn with_store<T>(f: impl FnOnce(&Store) -> T) -> Result<T, String> {
    let (_, store) = store_for(default_config()?)?;
    Ok(f(store))
}

/// Returns the active store, building it from `config` on first call.
fn store_for(config: StoreConfig) -> Result<&'static (StoreConfig, Store), String> {
    STORE.get_or_try_init(|| {
        let store = RecordStore::open_default(&config)
            .map_err(|err| format!("store init failed: {err}"))?;
        Ok((config, store))
    })
}

fn default_config() -> Result<StoreConfig, String> {
    if let Some((active, _)) = STORE.get() {
        return Ok(active.clone());
    }
    let data_dir = std::env::var(DATA_DIR_ENV)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME));
    StoreConfig::new(&data_dir.to_string_lossy()).map_err(|err| err.to_string())
}

fn to_user_item(record: SignupRecord) -> UserItem {
    UserItem {
        id: record.id,
        email: record.email,
        name: record.name,
        created_at: record.created_at,
    }
}

fn to_page_view_item(record: PageViewRecord) -> PageViewItem {
    PageViewItem {
        device: classify_device(&record.user_agent).to_string(),
        path: record.path,
        timestamp: record.timestamp,
        referrer: record.referrer,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, current_user, dashboard_summary, init_logging, init_store, list_page_views,
        list_users, record_page_view, record_signup, sign_out,
    };
    use once_cell::sync::OnceCell;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    static TEST_DATA_DIR: OnceCell<TempDir> = OnceCell::new();

    /// Points the process store at a throwaway directory before first use.
    fn use_test_store() {
        let dir = TEST_DATA_DIR.get_or_init(|| tempfile::tempdir().unwrap());
        let message = init_store(dir.path().to_str().unwrap().to_string());
        assert!(message.is_empty(), "{message}");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn init_store_rejects_relative_dir() {
        assert!(init_store("relative/dir".to_string()).contains("absolute"));
    }

    #[test]
    fn init_store_refuses_to_switch_directories() {
        use_test_store();
        let other = tempfile::tempdir().unwrap();
        let message = init_store(other.path().to_str().unwrap().to_string());
        assert!(message.contains("refusing"), "{message}");
    }

    // The store is process-wide, so the whole flow runs in one test to keep
    // counts exact.
    #[test]
    fn signup_page_view_and_dashboard_flow() {
        use_test_store();

        let created = record_signup("a@x.com".to_string(), "Ann".to_string());
        assert!(created.ok, "{}", created.message);
        let user = created.user.unwrap();
        assert_eq!(user.email, "a@x.com");

        let again = record_signup("a@x.com".to_string(), "Ann".to_string());
        assert!(!again.ok);
        assert!(again.duplicate);

        assert_eq!(list_users(), vec![user.clone()]);
        assert_eq!(current_user(), Some(user));

        // Views are keyed by millisecond timestamp in the structured store.
        let views = [
            ("/home", "", "Mozilla/5.0 (Linux; Android 14)"),
            ("/home", "news", ""),
            ("/about", "", ""),
        ];
        for (path, referrer, user_agent) in views {
            record_page_view(path.to_string(), referrer.to_string(), user_agent.to_string());
            thread::sleep(Duration::from_millis(3));
        }

        let views = list_page_views();
        assert_eq!(views.len(), 3);
        let android = views
            .iter()
            .find(|view| view.device == "Android")
            .unwrap();
        assert_eq!(android.referrer, "direct");

        let summary = dashboard_summary();
        assert!(summary.message.is_empty(), "{}", summary.message);
        assert_eq!(summary.total_signups, 1);
        assert_eq!(summary.total_page_views, 3);
        assert_eq!(summary.most_viewed_path.as_deref(), Some("/home"));
        assert_eq!(summary.most_viewed_count, 2);
        assert_eq!(summary.recent_page_views.len(), 3);

        sign_out();
        assert_eq!(current_user(), None);
    }
}
