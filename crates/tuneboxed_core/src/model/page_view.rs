//! Page-view record model.
//!
//! # Invariants
//! - Identity key is `timestamp`; two views in the same millisecond collide.
//! - An empty referrer is stored as [`DIRECT_REFERRER`].

use serde::{Deserialize, Serialize};

/// Referrer recorded when the visitor arrived without one.
pub const DIRECT_REFERRER: &str = "direct";

/// One page view event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageViewRecord {
    pub path: String,
    /// RFC 3339 UTC timestamp, millisecond precision.
    pub timestamp: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
}

impl PageViewRecord {
    pub fn new(
        path: impl Into<String>,
        timestamp: impl Into<String>,
        referrer: &str,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            timestamp: timestamp.into(),
            referrer: normalize_referrer(referrer),
            user_agent: user_agent.into(),
        }
    }

    pub fn identity_key(&self) -> &str {
        &self.timestamp
    }
}

fn normalize_referrer(referrer: &str) -> String {
    let trimmed = referrer.trim();
    if trimmed.is_empty() {
        DIRECT_REFERRER.to_string()
    } else {
        trimmed.to_string()
    }
}
